//! Backend contract and transport-error classification.
//!
//! Two implementations answer the same [`ModulesBackend`] trait:
//! [`legacy::LegacyBackend`] over the binary RPC channel and
//! [`admin::AdminBackend`] over the admin REST API. Each classifies its own
//! [`TransportError`]s into [`ModulesError`] before returning.

pub mod admin;
pub mod legacy;

use app_modules_sdk::{BackendCode, ModulesError, ServingStatus};
use async_trait::async_trait;
use thiserror::Error;

/// Which backend answers requests. Chosen once, at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Legacy,
    Admin,
}

impl BackendMode {
    #[must_use]
    pub const fn from_flag(use_admin_api: bool) -> Self {
        if use_admin_api { Self::Admin } else { Self::Legacy }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Admin => "admin",
        }
    }
}

/// Version addressed by a hostname lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// Named by the caller; trusted without an existence check.
    Explicit(String),
    /// Taken from the execution identity, which may not know it.
    Current(Option<String>),
}

impl VersionSelector {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Explicit(name) => Some(name),
            Self::Current(name) => name.as_deref(),
        }
    }

    #[must_use]
    pub fn explicit(&self) -> Option<&str> {
        match self {
            Self::Explicit(name) => Some(name),
            Self::Current(_) => None,
        }
    }
}

/// Hostname lookup after identity defaulting and instance validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameQuery {
    pub module: String,
    pub version: VersionSelector,
    pub instance: Option<u32>,
}

/// Raw failure of a single transport call, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("application error {code}: {detail}")]
    Application { code: i32, detail: String },

    #[error("rpc failed with {code}: {detail}")]
    Rpc { code: tonic::Code, detail: String },

    #[error("transport failure: {0}")]
    Io(String),

    #[error("undecodable response: {0}")]
    Decode(String),

    /// The server broke the protocol in a way retrying will not fix.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The request could not be built locally.
    #[error("invalid request: {0}")]
    Request(String),
}

/// What a `404` means for the call that received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// The application itself is unknown; reported as a generic failure.
    Project,
    Module,
    Version,
}

impl TransportError {
    /// Maps the failure onto the error taxonomy.
    ///
    /// HTTP `400` is `InvalidInstances`, `404` follows `not_found`, `5xx` is
    /// `Transient`, anything else is `Generic` with the status preserved.
    /// Application codes reaching this point were not expected by the call
    /// and are reported as `Generic`.
    #[must_use]
    pub fn classify(self, not_found: NotFound) -> ModulesError {
        match self {
            Self::Http { status: 400, detail } => ModulesError::invalid_instances(detail),
            Self::Http { status: 404, detail } => match not_found {
                NotFound::Module => ModulesError::invalid_module(detail),
                NotFound::Version => ModulesError::invalid_version(detail),
                NotFound::Project => ModulesError::generic_with_code(
                    format!("project not found: {detail}"),
                    BackendCode::Http(404),
                ),
            },
            Self::Http { status, detail } if status >= 500 => ModulesError::transient(detail),
            Self::Http { status, detail } => {
                tracing::warn!(status, "unmapped HTTP status from modules backend");
                ModulesError::generic_with_code(detail, BackendCode::Http(status))
            }
            Self::Application { code, detail } => {
                tracing::warn!(code, "unexpected application error from modules backend");
                ModulesError::generic_with_code(detail, BackendCode::Application(code))
            }
            Self::Rpc { code, detail } => match code {
                tonic::Code::Unavailable
                | tonic::Code::DeadlineExceeded
                | tonic::Code::ResourceExhausted
                | tonic::Code::Aborted => ModulesError::transient(detail),
                other => ModulesError::generic_with_code(detail, BackendCode::Rpc(other as i32)),
            },
            Self::Io(detail) => ModulesError::transient(detail),
            Self::Decode(detail) | Self::Protocol(detail) | Self::Request(detail) => {
                ModulesError::generic(detail)
            }
        }
    }
}

/// Operations every backend implements. Arguments arrive already defaulted
/// from the execution identity.
#[async_trait]
pub trait ModulesBackend: Send + Sync {
    fn mode(&self) -> BackendMode;

    /// # Errors
    /// Classified backend failure.
    async fn list_modules(&self) -> Result<Vec<String>, ModulesError>;

    /// # Errors
    /// Classified backend failure.
    async fn list_versions(&self, module: &str) -> Result<Vec<String>, ModulesError>;

    /// # Errors
    /// Classified backend failure.
    async fn get_default_version(&self, module: &str) -> Result<String, ModulesError>;

    /// # Errors
    /// Classified backend failure.
    async fn get_instance_count(&self, module: &str, version: &str) -> Result<u32, ModulesError>;

    /// # Errors
    /// Classified backend failure.
    async fn set_instance_count(
        &self,
        module: &str,
        version: &str,
        count: u32,
    ) -> Result<(), ModulesError>;

    /// Moves a version to `status`. A version already in that state reports
    /// `UnexpectedState`; the facade decides whether that is an error.
    ///
    /// # Errors
    /// Classified backend failure.
    async fn set_serving_status(
        &self,
        module: &str,
        version: &str,
        status: ServingStatus,
    ) -> Result<(), ModulesError>;

    /// # Errors
    /// Classified backend failure.
    async fn get_hostname(&self, query: &HostnameQuery) -> Result<String, ModulesError>;
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use app_modules_sdk::ErrorKind;

    use super::*;

    fn http(status: u16) -> TransportError {
        TransportError::Http {
            status,
            detail: format!("status {status}"),
        }
    }

    #[test]
    fn http_statuses_follow_taxonomy() {
        assert_eq!(http(400).classify(NotFound::Module).kind(), ErrorKind::InvalidInstances);
        assert_eq!(http(404).classify(NotFound::Module).kind(), ErrorKind::InvalidModule);
        assert_eq!(http(404).classify(NotFound::Version).kind(), ErrorKind::InvalidVersion);
        assert_eq!(http(500).classify(NotFound::Module).kind(), ErrorKind::Transient);
        assert_eq!(http(503).classify(NotFound::Module).kind(), ErrorKind::Transient);

        let forbidden = http(403).classify(NotFound::Module);
        assert_eq!(forbidden.kind(), ErrorKind::Generic);
        assert_eq!(forbidden.code(), Some(BackendCode::Http(403)));
    }

    #[test]
    fn missing_project_keeps_status() {
        let err = http(404).classify(NotFound::Project);
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.code(), Some(BackendCode::Http(404)));
        assert!(err.message().starts_with("project not found"));
    }

    #[test]
    fn rpc_codes_split_transient_from_generic() {
        let unavailable = TransportError::Rpc {
            code: tonic::Code::Unavailable,
            detail: "connection refused".to_owned(),
        };
        assert!(unavailable.classify(NotFound::Module).is_retryable());

        let denied = TransportError::Rpc {
            code: tonic::Code::PermissionDenied,
            detail: "nope".to_owned(),
        }
        .classify(NotFound::Module);
        assert_eq!(denied.code(), Some(BackendCode::Rpc(tonic::Code::PermissionDenied as i32)));
    }

    #[test]
    fn decode_failures_are_generic() {
        let err = TransportError::Decode("bad json".to_owned()).classify(NotFound::Module);
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.code(), None);
    }

    #[test]
    fn local_request_failures_are_not_retried() {
        let err = TransportError::Request("bad header value".to_owned()).classify(NotFound::Module);
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(!err.is_retryable());

        let err = TransportError::Protocol("token repeated".to_owned()).classify(NotFound::Project);
        assert_eq!(err.kind(), ErrorKind::Generic);
    }

    #[test]
    fn selector_exposes_names() {
        let explicit = VersionSelector::Explicit("v2".to_owned());
        assert_eq!(explicit.name(), Some("v2"));
        assert_eq!(explicit.explicit(), Some("v2"));

        let current = VersionSelector::Current(None);
        assert_eq!(current.name(), None);
        assert_eq!(current.explicit(), None);
    }
}
