//! Facade over the selected backend.

use std::sync::Arc;

use app_modules_sdk::{HostnameRequest, ModulesError, ServingStatus};

use super::hostname::parse_instance;
use crate::backend::{BackendMode, HostnameQuery, ModulesBackend, VersionSelector};
use crate::identity::ExecutionIdentity;

/// Routes each operation to one backend after defaulting its arguments
/// from the execution identity.
///
/// Starting a serving version, or stopping a stopped one, succeeds: the
/// backend's `UnexpectedState` is logged and absorbed here.
pub struct ModulesService {
    backend: Arc<dyn ModulesBackend>,
    identity: ExecutionIdentity,
}

impl ModulesService {
    #[must_use]
    pub fn new(backend: Arc<dyn ModulesBackend>, identity: ExecutionIdentity) -> Self {
        Self { backend, identity }
    }

    #[must_use]
    pub fn identity(&self) -> &ExecutionIdentity {
        &self.identity
    }

    #[must_use]
    pub fn mode(&self) -> BackendMode {
        self.backend.mode()
    }

    fn module_or_current<'a>(&'a self, module: Option<&'a str>) -> &'a str {
        module.unwrap_or_else(|| self.identity.module_or_default())
    }

    fn version_or_current<'a>(
        &'a self,
        module: &str,
        version: Option<&'a str>,
    ) -> Result<&'a str, ModulesError> {
        version.or_else(|| self.identity.version()).ok_or_else(|| {
            ModulesError::invalid_version(format!(
                "no version given for module '{module}' and the current version is unknown"
            ))
        })
    }

    /// # Errors
    /// Classified backend failure.
    #[tracing::instrument(skip_all, fields(mode = self.mode().as_str()))]
    pub async fn list_modules(&self) -> Result<Vec<String>, ModulesError> {
        self.backend.list_modules().await
    }

    /// # Errors
    /// `InvalidModule` or `Transient` from the backend.
    #[tracing::instrument(skip_all, fields(mode = self.mode().as_str(), module))]
    pub async fn list_versions(&self, module: Option<&str>) -> Result<Vec<String>, ModulesError> {
        let module = self.module_or_current(module);
        tracing::Span::current().record("module", module);
        self.backend.list_versions(module).await
    }

    /// # Errors
    /// `InvalidModule`, or `InvalidVersion` when no default can be chosen.
    #[tracing::instrument(skip_all, fields(mode = self.mode().as_str(), module))]
    pub async fn get_default_version(&self, module: Option<&str>) -> Result<String, ModulesError> {
        let module = self.module_or_current(module);
        tracing::Span::current().record("module", module);
        self.backend.get_default_version(module).await
    }

    /// # Errors
    /// `InvalidVersion` when no version is known or it is not manually scaled.
    #[tracing::instrument(skip_all, fields(mode = self.mode().as_str(), module, version))]
    pub async fn get_instance_count(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<u32, ModulesError> {
        let module = self.module_or_current(module);
        let version = self.version_or_current(module, version)?;
        record_target(module, version);
        self.backend.get_instance_count(module, version).await
    }

    /// # Errors
    /// `InvalidVersion` when no version is known, plus classified backend failures.
    #[tracing::instrument(skip_all, fields(mode = self.mode().as_str(), module, version, count))]
    pub async fn set_instance_count(
        &self,
        count: u32,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError> {
        let module = self.module_or_current(module);
        let version = self.version_or_current(module, version)?;
        record_target(module, version);
        tracing::Span::current().record("count", count);
        self.backend.set_instance_count(module, version, count).await
    }

    /// # Errors
    /// `InvalidVersion` or `Transient`; an already serving version is not an error.
    pub async fn start_version(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError> {
        self.change_serving_status(module, version, ServingStatus::Serving)
            .await
    }

    /// # Errors
    /// `InvalidVersion` or `Transient`; an already stopped version is not an error.
    pub async fn stop_version(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError> {
        self.change_serving_status(module, version, ServingStatus::Stopped)
            .await
    }

    #[tracing::instrument(skip_all, fields(mode = self.mode().as_str(), module, version, %status))]
    async fn change_serving_status(
        &self,
        module: Option<&str>,
        version: Option<&str>,
        status: ServingStatus,
    ) -> Result<(), ModulesError> {
        let module = self.module_or_current(module);
        let version = self.version_or_current(module, version)?;
        record_target(module, version);
        match self.backend.set_serving_status(module, version, status).await {
            Err(ModulesError::UnexpectedState { message }) => {
                let state = match status {
                    ServingStatus::Serving => "started",
                    ServingStatus::Stopped => "stopped",
                };
                tracing::info!(module, version, detail = %message, "version is already {state}");
                Ok(())
            }
            other => other,
        }
    }

    /// Instance validation runs before any backend call.
    ///
    /// # Errors
    /// `InvalidInstances` for a malformed instance, otherwise whatever the
    /// backend's hostname resolution reports.
    #[tracing::instrument(skip_all, fields(mode = self.mode().as_str(), module, version, instance))]
    pub async fn get_hostname(&self, request: &HostnameRequest) -> Result<String, ModulesError> {
        let instance = parse_instance(request.instance.as_deref())?;
        let module = self.module_or_current(request.module.as_deref());
        let version = match &request.version {
            Some(explicit) => VersionSelector::Explicit(explicit.clone()),
            None => VersionSelector::Current(self.identity.version().map(str::to_owned)),
        };

        let span = tracing::Span::current();
        span.record("module", module);
        if let Some(name) = version.name() {
            span.record("version", name);
        }
        if let Some(index) = instance {
            span.record("instance", index);
        }

        let query = HostnameQuery {
            module: module.to_owned(),
            version,
            instance,
        };
        self.backend.get_hostname(&query).await
    }
}

fn record_target(module: &str, version: &str) {
    let span = tracing::Span::current();
    span.record("module", module);
    span.record("version", version);
}
