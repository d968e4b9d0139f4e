//! [`ModulesBackend`] over the admin REST API.

use std::collections::HashSet;
use std::sync::Arc;

use app_modules_sdk::{ModulesError, ServingStatus, VersionDetails};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use urlencoding::encode;

use super::dto::{
    ApplicationDto, ListServicesResponse, ListVersionsResponse, ServiceDto, VersionDto,
    VersionPatch,
};
use super::transport::AdminTransport;
use crate::backend::{BackendMode, HostnameQuery, ModulesBackend, NotFound, TransportError};
use crate::domain::default_version::resolve_default_version;
use crate::domain::hostname::{TopologySource, resolve_hostname};

const HOSTNAME_CALLER: &str = "get_hostname";

fn with_query(path: &str, key: &str, value: &str) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{key}={}", encode(value))
}

/// `nextPageToken`s already followed while walking one listing.
#[derive(Default)]
struct PageCursor {
    seen: HashSet<String>,
}

impl PageCursor {
    /// Next token to request, or `None` once the listing is exhausted. A
    /// token the server already handed out would loop forever.
    fn advance(
        &mut self,
        path: &str,
        next: Option<String>,
    ) -> Result<Option<String>, TransportError> {
        let Some(token) = next.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        if !self.seen.insert(token.clone()) {
            return Err(TransportError::Protocol(format!(
                "GET {path}: page token '{token}' returned twice"
            )));
        }
        Ok(Some(token))
    }
}

/// Admin backend bound to one project.
#[derive(Clone)]
pub struct AdminBackend {
    transport: Arc<dyn AdminTransport>,
    project_id: String,
}

impl AdminBackend {
    #[must_use]
    pub fn new(transport: Arc<dyn AdminTransport>, project_id: impl Into<String>) -> Self {
        Self {
            transport,
            project_id: project_id.into(),
        }
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn app_path(&self) -> String {
        format!("apps/{}", encode(&self.project_id))
    }

    fn service_path(&self, module: &str) -> String {
        format!("{}/services/{}", self.app_path(), encode(module))
    }

    fn version_path(&self, module: &str, version: &str) -> String {
        format!("{}/versions/{}", self.service_path(module), encode(version))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        caller: &'static str,
    ) -> Result<T, TransportError> {
        let body = self.transport.get(path, caller).await?;
        serde_json::from_slice(&body)
            .map_err(|e| TransportError::Decode(format!("GET {path}: {e}")))
    }

    async fn application(&self, caller: &'static str) -> Result<ApplicationDto, TransportError> {
        self.get_json(&self.app_path(), caller).await
    }

    /// All services, following `nextPageToken` until exhausted.
    async fn services(&self, caller: &'static str) -> Result<Vec<ServiceDto>, TransportError> {
        let base = format!("{}/services", self.app_path());
        let mut services = Vec::new();
        let mut page_token: Option<String> = None;
        let mut cursor = PageCursor::default();
        loop {
            let path = match &page_token {
                Some(token) => with_query(&base, "pageToken", token),
                None => base.clone(),
            };
            let page: ListServicesResponse = self.get_json(&path, caller).await?;
            services.extend(page.services);
            match cursor.advance(&base, page.next_page_token)? {
                Some(next) => page_token = Some(next),
                None => return Ok(services),
            }
        }
    }

    /// All versions of `module` with their full view.
    async fn versions(
        &self,
        module: &str,
        caller: &'static str,
    ) -> Result<Vec<VersionDto>, TransportError> {
        let base = with_query(&format!("{}/versions", self.service_path(module)), "view", "FULL");
        let mut versions = Vec::new();
        let mut page_token: Option<String> = None;
        let mut cursor = PageCursor::default();
        loop {
            let path = match &page_token {
                Some(token) => with_query(&base, "pageToken", token),
                None => base.clone(),
            };
            let page: ListVersionsResponse = self.get_json(&path, caller).await?;
            versions.extend(page.versions);
            match cursor.advance(&base, page.next_page_token)? {
                Some(next) => page_token = Some(next),
                None => return Ok(versions),
            }
        }
    }

    async fn version(
        &self,
        module: &str,
        version: &str,
        caller: &'static str,
    ) -> Result<VersionDto, TransportError> {
        let path = with_query(&self.version_path(module, version), "view", "FULL");
        self.get_json(&path, caller).await
    }

    async fn patch_version(
        &self,
        module: &str,
        version: &str,
        patch: &VersionPatch,
        caller: &'static str,
    ) -> Result<(), ModulesError> {
        let body = serde_json::to_vec(patch)
            .map_err(|e| ModulesError::generic(format!("encoding version patch: {e}")))?;
        let path = with_query(
            &self.version_path(module, version),
            "updateMask",
            patch.update_mask(),
        );
        self.transport
            .patch(&path, Bytes::from(body), caller)
            .await
            .map(drop)
            .map_err(|e| e.classify(NotFound::Version))
    }
}

#[async_trait]
impl ModulesBackend for AdminBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Admin
    }

    async fn list_modules(&self) -> Result<Vec<String>, ModulesError> {
        let services = self
            .services("get_modules")
            .await
            .map_err(|e| e.classify(NotFound::Project))?;
        Ok(services.into_iter().map(|s| s.id).collect())
    }

    async fn list_versions(&self, module: &str) -> Result<Vec<String>, ModulesError> {
        let versions = self
            .versions(module, "get_versions")
            .await
            .map_err(|e| e.classify(NotFound::Module))?;
        Ok(versions.into_iter().map(|v| v.id).collect())
    }

    async fn get_default_version(&self, module: &str) -> Result<String, ModulesError> {
        let service: ServiceDto = self
            .get_json(&self.service_path(module), "get_default_version")
            .await
            .map_err(|e| e.classify(NotFound::Module))?;
        resolve_default_version(module, &service.traffic_split())
    }

    async fn get_instance_count(&self, module: &str, version: &str) -> Result<u32, ModulesError> {
        let details = self
            .version(module, version, "get_num_instances")
            .await
            .map_err(|e| e.classify(NotFound::Module))?
            .into_details(module);
        details.scaling.manual_instances().ok_or_else(|| {
            ModulesError::invalid_version(format!(
                "version '{version}' of module '{module}' is not manually scaled"
            ))
        })
    }

    async fn set_instance_count(
        &self,
        module: &str,
        version: &str,
        count: u32,
    ) -> Result<(), ModulesError> {
        self.patch_version(module, version, &VersionPatch::instances(count), "set_num_instances")
            .await
    }

    async fn set_serving_status(
        &self,
        module: &str,
        version: &str,
        status: ServingStatus,
    ) -> Result<(), ModulesError> {
        let caller = match status {
            ServingStatus::Serving => "start_version",
            ServingStatus::Stopped => "stop_version",
        };
        self.patch_version(module, version, &VersionPatch::serving_status(status), caller)
            .await
    }

    async fn get_hostname(&self, query: &HostnameQuery) -> Result<String, ModulesError> {
        resolve_hostname(self, query).await
    }
}

#[async_trait]
impl TopologySource for AdminBackend {
    async fn default_hostname(&self) -> Result<String, TransportError> {
        self.application(HOSTNAME_CALLER)
            .await?
            .default_hostname
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                TransportError::Decode(format!(
                    "application '{}' reports no defaultHostname",
                    self.project_id
                ))
            })
    }

    async fn module_names(&self) -> Result<Vec<String>, TransportError> {
        let services = self.services(HOSTNAME_CALLER).await?;
        Ok(services.into_iter().map(|s| s.id).collect())
    }

    async fn version_names(&self, module: &str) -> Result<Vec<String>, TransportError> {
        let versions = self.versions(module, HOSTNAME_CALLER).await?;
        Ok(versions.into_iter().map(|v| v.id).collect())
    }

    async fn version_details(
        &self,
        module: &str,
        version: &str,
    ) -> Result<VersionDetails, TransportError> {
        let dto = self.version(module, version, HOSTNAME_CALLER).await?;
        Ok(dto.into_details(module))
    }
}
