//! Public API trait for the modules client.
//!
//! Every argument left as `None` falls back to the caller's execution
//! identity: the current module (or `default`) and the current version.

use async_trait::async_trait;

use crate::error::ModulesError;
use crate::models::HostnameRequest;

/// Control-plane operations over an application's modules and versions.
///
/// Implementations hide which backend answers; callers observe the same
/// results and the same [`ModulesError`] taxonomy either way.
#[async_trait]
pub trait ModulesClient: Send + Sync {
    /// Module the caller is running in, if known.
    fn current_module_name(&self) -> Option<String>;

    /// Major version the caller is running in, if known.
    fn current_version_name(&self) -> Option<String>;

    /// Instance id of the caller, if known.
    fn current_instance_id(&self) -> Option<String>;

    /// Names of all modules of the application.
    ///
    /// # Errors
    ///
    /// Backend failures classified per the error taxonomy.
    async fn list_modules(&self) -> Result<Vec<String>, ModulesError>;

    /// Names of all versions of `module`.
    ///
    /// # Errors
    ///
    /// - `InvalidModule` if the module does not exist
    /// - `Transient` if the backend asks for a retry
    async fn list_versions(&self, module: Option<&str>) -> Result<Vec<String>, ModulesError>;

    /// Version receiving the module's traffic.
    ///
    /// # Errors
    ///
    /// - `InvalidModule` if the module does not exist
    /// - `InvalidVersion` if no default version can be determined
    async fn get_default_version(&self, module: Option<&str>) -> Result<String, ModulesError>;

    /// Configured instance count of a manually scaled version.
    ///
    /// # Errors
    ///
    /// - `InvalidVersion` if the version does not exist or is not manually scaled
    async fn get_instance_count(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<u32, ModulesError>;

    /// Sets the instance count of a manually scaled version.
    ///
    /// # Errors
    ///
    /// - `InvalidVersion` if the version does not exist
    /// - `Transient` if the backend asks for a retry
    async fn set_instance_count(
        &self,
        count: u32,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError>;

    /// Starts serving a version. Starting a version that already serves succeeds.
    ///
    /// # Errors
    ///
    /// - `InvalidVersion` if the version does not exist
    /// - `Transient` if the backend asks for a retry
    async fn start_version(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError>;

    /// Stops serving a version. Stopping a stopped version succeeds.
    ///
    /// # Errors
    ///
    /// - `InvalidVersion` if the version does not exist
    /// - `Transient` if the backend asks for a retry
    async fn stop_version(
        &self,
        module: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), ModulesError>;

    /// Hostname addressing a module, version, or single instance.
    ///
    /// # Errors
    ///
    /// - `InvalidInstances` if the instance is not a non-negative integer,
    ///   is out of range, or targets a version without manual scaling
    /// - `InvalidModule` if a topology lookup finds nothing
    async fn get_hostname(&self, request: &HostnameRequest) -> Result<String, ModulesError>;
}
