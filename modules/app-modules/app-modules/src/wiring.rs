//! Builds a ready-to-use client from configuration.

use std::sync::Arc;

use crate::backend::admin::{AdminBackend, HttpAdminTransport};
use crate::backend::legacy::{GrpcChannel, LegacyBackend};
use crate::backend::{BackendMode, ModulesBackend};
use crate::config::{ConfigError, ModulesConfig};
use crate::domain::{ModulesLocalClient, ModulesService};
use crate::identity::{self, ExecutionIdentity};

/// Selects and constructs the backend named by `config`.
///
/// Must be called from within a tokio runtime: the legacy channel is
/// created lazily on the current runtime.
///
/// # Errors
///
/// [`ConfigError::MissingProjectId`] when the admin backend is selected and
/// no project id can be found; [`ConfigError::InvalidEndpoint`] or
/// [`ConfigError::Tls`] when a transport cannot be built.
pub fn build_backend(config: &ModulesConfig) -> Result<Arc<dyn ModulesBackend>, ConfigError> {
    match config.backend_mode() {
        BackendMode::Legacy => {
            let channel = GrpcChannel::connect_lazy(&config.legacy)?;
            Ok(Arc::new(LegacyBackend::new(Arc::new(channel))))
        }
        BackendMode::Admin => {
            let project_id = config
                .project_id
                .clone()
                .or_else(identity::project_id_from_env)
                .ok_or(ConfigError::MissingProjectId)?;
            let transport = HttpAdminTransport::new(&config.admin)?;
            Ok(Arc::new(AdminBackend::new(Arc::new(transport), project_id)))
        }
    }
}

/// # Errors
///
/// See [`build_backend`].
pub fn build_service(
    config: &ModulesConfig,
    identity: ExecutionIdentity,
) -> Result<ModulesService, ConfigError> {
    let backend = build_backend(config)?;
    tracing::info!(
        mode = backend.mode().as_str(),
        module = identity.module().unwrap_or("<unknown>"),
        version = identity.version().unwrap_or("<unknown>"),
        "app-modules client initialized"
    );
    Ok(ModulesService::new(backend, identity))
}

/// Convenience wrapper returning the [`ModulesClient`](app_modules_sdk::ModulesClient)
/// implementation for the current process.
///
/// # Errors
///
/// See [`build_backend`].
pub fn build_client(config: &ModulesConfig) -> Result<ModulesLocalClient, ConfigError> {
    let service = build_service(config, ExecutionIdentity::from_env())?;
    Ok(ModulesLocalClient::new(Arc::new(service)))
}
