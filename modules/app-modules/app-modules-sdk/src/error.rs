//! Error taxonomy shared by every backend.

use std::fmt;

use thiserror::Error;

/// Raw backend code preserved on [`ModulesError::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCode {
    /// HTTP status returned by the admin REST surface.
    Http(u16),
    /// Application error code carried by a legacy RPC reply.
    Application(i32),
    /// gRPC status code of a failed legacy RPC.
    Rpc(i32),
}

impl fmt::Display for BackendCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(status) => write!(f, "http status {status}"),
            Self::Application(code) => write!(f, "application code {code}"),
            Self::Rpc(code) => write!(f, "rpc code {code}"),
        }
    }
}

/// Discriminant of [`ModulesError`], handy for matching without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidModule,
    InvalidVersion,
    InvalidInstances,
    UnexpectedState,
    Transient,
    Generic,
}

/// Errors reported by the modules client.
///
/// The set is closed: both backends classify every failure into exactly
/// one of these variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModulesError {
    /// The named module does not exist.
    #[error("invalid module: {message}")]
    InvalidModule { message: String },

    /// The named version does not exist or cannot serve the request.
    #[error("invalid version: {message}")]
    InvalidVersion { message: String },

    /// The instance argument is malformed or out of range.
    #[error("invalid instances: {message}")]
    InvalidInstances { message: String },

    /// The target is already in the requested state.
    #[error("unexpected state: {message}")]
    UnexpectedState { message: String },

    /// The backend failed in a way that may succeed on retry.
    #[error("transient error: {message}")]
    Transient { message: String },

    /// Any other failure; `code` keeps the raw backend code when known.
    #[error("modules error: {message}{}", .code.map(|c| format!(" ({c})")).unwrap_or_default())]
    Generic {
        message: String,
        code: Option<BackendCode>,
    },
}

impl ModulesError {
    #[must_use]
    pub fn invalid_module(message: impl Into<String>) -> Self {
        Self::InvalidModule {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_version(message: impl Into<String>) -> Self {
        Self::InvalidVersion {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_instances(message: impl Into<String>) -> Self {
        Self::InvalidInstances {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unexpected_state(message: impl Into<String>) -> Self {
        Self::UnexpectedState {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn generic_with_code(message: impl Into<String>, code: BackendCode) -> Self {
        Self::Generic {
            message: message.into(),
            code: Some(code),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidModule { .. } => ErrorKind::InvalidModule,
            Self::InvalidVersion { .. } => ErrorKind::InvalidVersion,
            Self::InvalidInstances { .. } => ErrorKind::InvalidInstances,
            Self::UnexpectedState { .. } => ErrorKind::UnexpectedState,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Generic { .. } => ErrorKind::Generic,
        }
    }

    /// Human-readable detail without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidModule { message }
            | Self::InvalidVersion { message }
            | Self::InvalidInstances { message }
            | Self::UnexpectedState { message }
            | Self::Transient { message }
            | Self::Generic { message, .. } => message,
        }
    }

    /// Raw backend code, only ever present on `Generic`.
    #[must_use]
    pub const fn code(&self) -> Option<BackendCode> {
        match self {
            Self::Generic { code, .. } => *code,
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        assert_eq!(
            ModulesError::invalid_module("m").kind(),
            ErrorKind::InvalidModule
        );
        assert_eq!(
            ModulesError::invalid_version("v").kind(),
            ErrorKind::InvalidVersion
        );
        assert_eq!(
            ModulesError::invalid_instances("i").kind(),
            ErrorKind::InvalidInstances
        );
        assert_eq!(
            ModulesError::unexpected_state("s").kind(),
            ErrorKind::UnexpectedState
        );
        assert_eq!(ModulesError::transient("t").kind(), ErrorKind::Transient);
        assert_eq!(ModulesError::generic("g").kind(), ErrorKind::Generic);
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(ModulesError::transient("backend busy").is_retryable());
        assert!(!ModulesError::generic("boom").is_retryable());
        assert!(!ModulesError::invalid_version("v9").is_retryable());
    }

    #[test]
    fn generic_display_carries_code() {
        let err = ModulesError::generic_with_code("forbidden", BackendCode::Http(403));
        assert_eq!(err.to_string(), "modules error: forbidden (http status 403)");
        assert_eq!(err.code(), Some(BackendCode::Http(403)));

        let bare = ModulesError::generic("boom");
        assert_eq!(bare.to_string(), "modules error: boom");
        assert_eq!(bare.code(), None);
    }

    #[test]
    fn message_strips_prefix() {
        let err = ModulesError::invalid_module("no module 'x'");
        assert_eq!(err.message(), "no module 'x'");
        assert_eq!(err.to_string(), "invalid module: no module 'x'");
    }
}
