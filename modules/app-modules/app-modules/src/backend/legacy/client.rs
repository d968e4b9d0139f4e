//! [`ModulesBackend`] over the legacy binary RPC channel.

use std::sync::Arc;

use app_modules_sdk::{ModulesError, ServingStatus};
use async_trait::async_trait;
use bytes::Bytes;
use prost::Message;

use super::channel::RpcChannel;
use super::codes::{ApplicationErrorCode as Code, CallPolicy};
use super::proto;
use crate::backend::{BackendMode, HostnameQuery, ModulesBackend, TransportError};

/// One RPC of the modules service: wire method, caller tag, error policy.
struct Rpc {
    method: &'static str,
    caller: &'static str,
    policy: CallPolicy,
}

const GET_MODULES: Rpc = Rpc {
    method: "GetModules",
    caller: "get_modules",
    policy: CallPolicy::expecting(&[]),
};

const GET_VERSIONS: Rpc = Rpc {
    method: "GetVersions",
    caller: "get_versions",
    policy: CallPolicy::expecting(&[Code::InvalidModule, Code::TransientError]),
};

const GET_DEFAULT_VERSION: Rpc = Rpc {
    method: "GetDefaultVersion",
    caller: "get_default_version",
    policy: CallPolicy::expecting(&[Code::InvalidModule, Code::InvalidVersion]),
};

const GET_NUM_INSTANCES: Rpc = Rpc {
    method: "GetNumInstances",
    caller: "get_num_instances",
    policy: CallPolicy::expecting(&[Code::InvalidVersion]),
};

const SET_NUM_INSTANCES: Rpc = Rpc {
    method: "SetNumInstances",
    caller: "set_num_instances",
    policy: CallPolicy::expecting(&[Code::InvalidVersion, Code::TransientError]),
};

const START_MODULE: Rpc = Rpc {
    method: "StartModule",
    caller: "start_version",
    policy: CallPolicy::expecting(&[Code::InvalidVersion, Code::TransientError])
        .ignoring(&[Code::UnexpectedState]),
};

const STOP_MODULE: Rpc = Rpc {
    method: "StopModule",
    caller: "stop_version",
    policy: CallPolicy::expecting(&[Code::InvalidVersion, Code::TransientError])
        .ignoring(&[Code::UnexpectedState]),
};

const GET_HOSTNAME: Rpc = Rpc {
    method: "GetHostname",
    caller: "get_hostname",
    policy: CallPolicy::expecting(&[Code::InvalidModule, Code::InvalidInstances]),
};

/// Legacy backend. Each operation is exactly one RPC.
#[derive(Clone)]
pub struct LegacyBackend {
    channel: Arc<dyn RpcChannel>,
}

impl LegacyBackend {
    #[must_use]
    pub fn new(channel: Arc<dyn RpcChannel>) -> Self {
        Self { channel }
    }

    async fn exchange<Req, Resp>(&self, rpc: &Rpc, request: &Req) -> Result<Resp, TransportError>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let reply = self
            .channel
            .invoke(rpc.method, rpc.caller, Bytes::from(request.encode_to_vec()))
            .await?;
        Resp::decode(reply).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn call<Req, Resp>(&self, rpc: &Rpc, request: &Req) -> Result<Resp, ModulesError>
    where
        Req: Message,
        Resp: Message + Default,
    {
        self.exchange(rpc, request)
            .await
            .map_err(|e| rpc.policy.classify(e))
    }
}

#[async_trait]
impl ModulesBackend for LegacyBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Legacy
    }

    async fn list_modules(&self) -> Result<Vec<String>, ModulesError> {
        let resp: proto::GetModulesResponse =
            self.call(&GET_MODULES, &proto::GetModulesRequest {}).await?;
        Ok(resp.module)
    }

    async fn list_versions(&self, module: &str) -> Result<Vec<String>, ModulesError> {
        let req = proto::GetVersionsRequest {
            module: Some(module.to_owned()),
        };
        let resp: proto::GetVersionsResponse = self.call(&GET_VERSIONS, &req).await?;
        Ok(resp.version)
    }

    async fn get_default_version(&self, module: &str) -> Result<String, ModulesError> {
        let req = proto::GetDefaultVersionRequest {
            module: Some(module.to_owned()),
        };
        let resp: proto::GetDefaultVersionResponse =
            self.call(&GET_DEFAULT_VERSION, &req).await?;
        Ok(resp.version)
    }

    async fn get_instance_count(&self, module: &str, version: &str) -> Result<u32, ModulesError> {
        let req = proto::GetNumInstancesRequest {
            module: Some(module.to_owned()),
            version: Some(version.to_owned()),
        };
        let resp: proto::GetNumInstancesResponse = self.call(&GET_NUM_INSTANCES, &req).await?;
        u32::try_from(resp.instances).map_err(|_| {
            ModulesError::generic(format!(
                "instance count {} out of range for {module}/{version}",
                resp.instances
            ))
        })
    }

    async fn set_instance_count(
        &self,
        module: &str,
        version: &str,
        count: u32,
    ) -> Result<(), ModulesError> {
        let req = proto::SetNumInstancesRequest {
            module: Some(module.to_owned()),
            version: Some(version.to_owned()),
            instances: i64::from(count),
        };
        let _: proto::SetNumInstancesResponse = self.call(&SET_NUM_INSTANCES, &req).await?;
        Ok(())
    }

    async fn set_serving_status(
        &self,
        module: &str,
        version: &str,
        status: ServingStatus,
    ) -> Result<(), ModulesError> {
        match status {
            ServingStatus::Serving => {
                let req = proto::StartModuleRequest {
                    module: module.to_owned(),
                    version: version.to_owned(),
                };
                let _: proto::StartModuleResponse = self.call(&START_MODULE, &req).await?;
                Ok(())
            }
            ServingStatus::Stopped => {
                let req = proto::StopModuleRequest {
                    module: Some(module.to_owned()),
                    version: Some(version.to_owned()),
                };
                let _: proto::StopModuleResponse = self.call(&STOP_MODULE, &req).await?;
                Ok(())
            }
        }
    }

    async fn get_hostname(&self, query: &HostnameQuery) -> Result<String, ModulesError> {
        let req = proto::GetHostnameRequest {
            module: Some(query.module.clone()),
            version: query.version.explicit().map(str::to_owned),
            instance: query.instance.map(|i| i.to_string()),
        };
        let resp: proto::GetHostnameResponse = self.call(&GET_HOSTNAME, &req).await?;
        Ok(resp.hostname)
    }
}
