//! Local client implementing the `ModulesClient` trait.

use std::sync::Arc;

use app_modules_sdk::{HostnameRequest, ModulesClient, ModulesError};
use async_trait::async_trait;

use super::pending::PendingCall;
use super::service::ModulesService;

/// Local client for the modules service.
///
/// Awaiting a trait method is the blocking form of an operation; the
/// `submit_*` methods are the fire-and-observe form and return a
/// [`PendingCall`] immediately.
#[derive(Clone)]
pub struct ModulesLocalClient {
    svc: Arc<ModulesService>,
}

impl ModulesLocalClient {
    #[must_use]
    pub fn new(svc: Arc<ModulesService>) -> Self {
        Self { svc }
    }

    #[must_use]
    pub fn service(&self) -> &Arc<ModulesService> {
        &self.svc
    }

    /// Background form of [`ModulesClient::list_modules`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_list_modules(&self) -> PendingCall<Vec<String>> {
        let client = self.clone();
        PendingCall::spawn("list_modules", async move { client.list_modules().await })
    }

    /// Background form of [`ModulesClient::list_versions`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_list_versions(&self, module: Option<&str>) -> PendingCall<Vec<String>> {
        let client = self.clone();
        let module = module.map(str::to_owned);
        PendingCall::spawn("list_versions", async move {
            client.list_versions(module.as_deref()).await
        })
    }

    /// Background form of [`ModulesClient::get_default_version`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_get_default_version(&self, module: Option<&str>) -> PendingCall<String> {
        let client = self.clone();
        let module = module.map(str::to_owned);
        PendingCall::spawn("get_default_version", async move {
            client.get_default_version(module.as_deref()).await
        })
    }

    /// Background form of [`ModulesClient::get_instance_count`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_get_instance_count(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> PendingCall<u32> {
        let client = self.clone();
        let (module, version) = owned_target(module, version);
        PendingCall::spawn("get_instance_count", async move {
            client
                .get_instance_count(module.as_deref(), version.as_deref())
                .await
        })
    }

    /// Background form of [`ModulesClient::set_instance_count`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_set_instance_count(
        &self,
        count: u32,
        module: Option<&str>,
        version: Option<&str>,
    ) -> PendingCall<()> {
        let client = self.clone();
        let (module, version) = owned_target(module, version);
        PendingCall::spawn("set_instance_count", async move {
            client
                .set_instance_count(count, module.as_deref(), version.as_deref())
                .await
        })
    }

    /// Background form of [`ModulesClient::start_version`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_start_version(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> PendingCall<()> {
        let client = self.clone();
        let (module, version) = owned_target(module, version);
        PendingCall::spawn("start_version", async move {
            client
                .start_version(module.as_deref(), version.as_deref())
                .await
        })
    }

    /// Background form of [`ModulesClient::stop_version`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_stop_version(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> PendingCall<()> {
        let client = self.clone();
        let (module, version) = owned_target(module, version);
        PendingCall::spawn("stop_version", async move {
            client
                .stop_version(module.as_deref(), version.as_deref())
                .await
        })
    }

    /// Background form of [`ModulesClient::get_hostname`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit_get_hostname(&self, request: HostnameRequest) -> PendingCall<String> {
        let client = self.clone();
        PendingCall::spawn("get_hostname", async move { client.get_hostname(&request).await })
    }
}

fn owned_target(module: Option<&str>, version: Option<&str>) -> (Option<String>, Option<String>) {
    (module.map(str::to_owned), version.map(str::to_owned))
}

fn log_and_convert(op: &str, e: ModulesError) -> ModulesError {
    tracing::error!(operation = op, error = %e, "modules call failed");
    e
}

#[async_trait]
impl ModulesClient for ModulesLocalClient {
    fn current_module_name(&self) -> Option<String> {
        self.svc.identity().module().map(str::to_owned)
    }

    fn current_version_name(&self) -> Option<String> {
        self.svc.identity().version().map(str::to_owned)
    }

    fn current_instance_id(&self) -> Option<String> {
        self.svc.identity().instance().map(str::to_owned)
    }

    async fn list_modules(&self) -> Result<Vec<String>, ModulesError> {
        self.svc
            .list_modules()
            .await
            .map_err(|e| log_and_convert("list_modules", e))
    }

    async fn list_versions(&self, module: Option<&str>) -> Result<Vec<String>, ModulesError> {
        self.svc
            .list_versions(module)
            .await
            .map_err(|e| log_and_convert("list_versions", e))
    }

    async fn get_default_version(&self, module: Option<&str>) -> Result<String, ModulesError> {
        self.svc
            .get_default_version(module)
            .await
            .map_err(|e| log_and_convert("get_default_version", e))
    }

    async fn get_instance_count(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<u32, ModulesError> {
        self.svc
            .get_instance_count(module, version)
            .await
            .map_err(|e| log_and_convert("get_instance_count", e))
    }

    async fn set_instance_count(
        &self,
        count: u32,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError> {
        self.svc
            .set_instance_count(count, module, version)
            .await
            .map_err(|e| log_and_convert("set_instance_count", e))
    }

    async fn start_version(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError> {
        self.svc
            .start_version(module, version)
            .await
            .map_err(|e| log_and_convert("start_version", e))
    }

    async fn stop_version(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError> {
        self.svc
            .stop_version(module, version)
            .await
            .map_err(|e| log_and_convert("stop_version", e))
    }

    async fn get_hostname(&self, request: &HostnameRequest) -> Result<String, ModulesError> {
        self.svc
            .get_hostname(request)
            .await
            .map_err(|e| log_and_convert("get_hostname", e))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use app_modules_sdk::{ErrorKind, ServingStatus};

    use super::*;
    use crate::backend::{BackendMode, HostnameQuery, ModulesBackend};
    use crate::identity::ExecutionIdentity;

    /// Counts instances set and refuses to start anything.
    #[derive(Default)]
    struct CountingBackend {
        instances: AtomicU32,
    }

    #[async_trait]
    impl ModulesBackend for CountingBackend {
        fn mode(&self) -> BackendMode {
            BackendMode::Legacy
        }

        async fn list_modules(&self) -> Result<Vec<String>, ModulesError> {
            Ok(vec!["default".to_owned(), "api".to_owned()])
        }

        async fn list_versions(&self, _module: &str) -> Result<Vec<String>, ModulesError> {
            Err(ModulesError::transient("try again"))
        }

        async fn get_default_version(&self, module: &str) -> Result<String, ModulesError> {
            Ok(format!("{module}-v1"))
        }

        async fn get_instance_count(&self, _: &str, _: &str) -> Result<u32, ModulesError> {
            Ok(self.instances.load(Ordering::SeqCst))
        }

        async fn set_instance_count(
            &self,
            _: &str,
            _: &str,
            count: u32,
        ) -> Result<(), ModulesError> {
            self.instances.store(count, Ordering::SeqCst);
            Ok(())
        }

        async fn set_serving_status(
            &self,
            _: &str,
            version: &str,
            _: ServingStatus,
        ) -> Result<(), ModulesError> {
            Err(ModulesError::invalid_version(version))
        }

        async fn get_hostname(&self, query: &HostnameQuery) -> Result<String, ModulesError> {
            Ok(format!("{}.example.com", query.module))
        }
    }

    fn client() -> ModulesLocalClient {
        let identity = ExecutionIdentity::new("api", "v1").with_instance("7");
        let svc = ModulesService::new(Arc::new(CountingBackend::default()), identity);
        ModulesLocalClient::new(Arc::new(svc))
    }

    #[test]
    fn identity_accessors() {
        let client = client();
        assert_eq!(client.current_module_name().as_deref(), Some("api"));
        assert_eq!(client.current_version_name().as_deref(), Some("v1"));
        assert_eq!(client.current_instance_id().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn blocking_form_delegates() {
        let client = client();
        assert_eq!(client.list_modules().await.unwrap(), vec!["default", "api"]);
        assert_eq!(client.get_default_version(None).await.unwrap(), "api-v1");
        let err = client.list_versions(None).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn submitted_calls_complete_independently() {
        let client = client();
        let set = client.submit_set_instance_count(4, None, None);
        set.result().await.unwrap();

        let count = client.submit_get_instance_count(Some("api"), Some("v1"));
        let host = client.submit_get_hostname(HostnameRequest::new().module("worker"));
        assert_eq!(count.result().await.unwrap(), 4);
        assert_eq!(host.result().await.unwrap(), "worker.example.com");
    }

    #[tokio::test]
    async fn submitted_error_surfaces_on_result() {
        let client = client();
        let mut start = client.submit_start_version(None, Some("v9"));
        start.wait().await;
        let err = start.result().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidVersion);

        let stop = client.submit_stop_version(None, None);
        assert_eq!(stop.result().await.unwrap_err().message(), "v1");
    }

    #[tokio::test]
    async fn submitted_reads() {
        let client = client();
        let modules = client.submit_list_modules();
        let versions = client.submit_list_versions(Some("api"));
        let default = client.submit_get_default_version(Some("worker"));
        assert_eq!(modules.result().await.unwrap().len(), 2);
        assert!(versions.result().await.is_err());
        assert_eq!(default.result().await.unwrap(), "worker-v1");
    }
}
