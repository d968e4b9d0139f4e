//! Modules client configuration.

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::backend::BackendMode;

/// Environment variable that flips the client onto the admin REST backend.
pub const ADMIN_API_FLAG_VAR: &str = "MODULES_USE_ADMIN_API";

/// Prefix of nested environment overrides, e.g. `MODULES__ADMIN__BASE_URL`.
pub const ENV_PREFIX: &str = "MODULES__";

/// Modules client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModulesConfig {
    /// Route every operation through the admin REST backend.
    pub use_admin_api: bool,
    /// Overrides the project id derived from the environment.
    pub project_id: Option<String>,
    pub legacy: LegacyConfig,
    pub admin: AdminConfig,
}

/// Legacy binary RPC channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacyConfig {
    /// URI of the modules RPC service.
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    /// Deadline applied to every RPC.
    pub rpc_timeout_ms: u64,
}

/// Admin REST API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    /// API root, without a trailing `/apps`.
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Permit plain `http://` base URLs. Intended for local mock servers.
    pub allow_insecure_http: bool,
    /// Bearer credential sent as `Authorization`.
    pub access_token: Option<SecretString>,
    /// First segment of the `User-Agent` header; the operation name follows.
    pub user_agent_prefix: String,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:50051".to_owned(),
            connect_timeout_ms: 5_000,
            rpc_timeout_ms: 60_000,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_url: "https://appengine.googleapis.com/v1".to_owned(),
            request_timeout_ms: 60_000,
            allow_insecure_http: false,
            access_token: None,
            user_agent_prefix: "appengine-modules-api-rust-client".to_owned(),
        }
    }
}

impl LegacyConfig {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

impl AdminConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Errors raised while loading configuration or building a backend from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load modules configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("project id is not configured (set project_id, GAE_PROJECT, GOOGLE_CLOUD_PROJECT or GAE_APPLICATION)")]
    MissingProjectId,

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

impl ModulesConfig {
    /// Layered sources: defaults, then the optional YAML file, then
    /// `MODULES__*` environment overrides.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration from every layer and applies the admin API flag.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a source cannot be parsed or carries
    /// unknown keys.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = Self::figment(path).extract().map_err(Box::new)?;
        if let Ok(flag) = std::env::var(ADMIN_API_FLAG_VAR) {
            config.use_admin_api = flag.trim().eq_ignore_ascii_case("true");
        }
        Ok(config)
    }

    #[must_use]
    pub const fn backend_mode(&self) -> BackendMode {
        BackendMode::from_flag(self.use_admin_api)
    }
}
