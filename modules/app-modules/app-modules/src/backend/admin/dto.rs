//! JSON shapes of the App Engine admin API.

use app_modules_sdk::{Scaling, ServingStatus, TrafficSplit, VersionDetails};
use serde::{Deserialize, Serialize};

/// `apps.get`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDto {
    pub default_hostname: Option<String>,
}

/// `apps.services.list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListServicesResponse {
    #[serde(default)]
    pub services: Vec<ServiceDto>,
    pub next_page_token: Option<String>,
}

/// `apps.services.get`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDto {
    pub id: String,
    #[serde(default)]
    pub split: Option<SplitDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SplitDto {
    #[serde(default)]
    pub allocations: TrafficSplit,
}

impl ServiceDto {
    /// The service's allocations, empty when it has no split.
    #[must_use]
    pub fn traffic_split(&self) -> TrafficSplit {
        self.split
            .as_ref()
            .map(|split| split.allocations.clone())
            .unwrap_or_default()
    }
}

/// `apps.services.versions.list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVersionsResponse {
    #[serde(default)]
    pub versions: Vec<VersionDto>,
    pub next_page_token: Option<String>,
}

/// `apps.services.versions.get`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDto {
    pub id: String,
    pub manual_scaling: Option<ManualScalingDto>,
    pub basic_scaling: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ManualScalingDto {
    #[serde(default)]
    pub instances: u32,
}

impl VersionDto {
    #[must_use]
    pub fn scaling(&self) -> Scaling {
        match (&self.manual_scaling, &self.basic_scaling) {
            (Some(manual), _) => Scaling::Manual {
                instances: manual.instances,
            },
            (None, Some(_)) => Scaling::Basic,
            (None, None) => Scaling::Automatic,
        }
    }

    #[must_use]
    pub fn into_details(self, module: &str) -> VersionDetails {
        VersionDetails {
            module: module.to_owned(),
            scaling: self.scaling(),
            version: self.id,
        }
    }
}

/// Body of `apps.services.versions.patch`; only the masked field is set.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_scaling: Option<ManualScalingDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_status: Option<ServingStatus>,
}

impl VersionPatch {
    pub const INSTANCES_MASK: &'static str = "manualScaling.instances";
    pub const SERVING_STATUS_MASK: &'static str = "servingStatus";

    #[must_use]
    pub fn instances(count: u32) -> Self {
        Self {
            manual_scaling: Some(ManualScalingDto { instances: count }),
            serving_status: None,
        }
    }

    #[must_use]
    pub fn serving_status(status: ServingStatus) -> Self {
        Self {
            manual_scaling: None,
            serving_status: Some(status),
        }
    }

    /// Value of the `updateMask` query parameter for this patch.
    #[must_use]
    pub const fn update_mask(&self) -> &'static str {
        if self.manual_scaling.is_some() {
            Self::INSTANCES_MASK
        } else {
            Self::SERVING_STATUS_MASK
        }
    }
}
