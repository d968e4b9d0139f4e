//! Messages of the `appengine.modules.v1.ModulesService` RPC surface.
#![allow(clippy::empty_structs_with_brackets)]

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetModulesRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetModulesResponse {
    #[prost(string, repeated, tag = "1")]
    pub module: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetVersionsRequest {
    #[prost(string, optional, tag = "1")]
    pub module: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetVersionsResponse {
    #[prost(string, repeated, tag = "1")]
    pub version: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetDefaultVersionRequest {
    #[prost(string, optional, tag = "1")]
    pub module: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetDefaultVersionResponse {
    #[prost(string, tag = "1")]
    pub version: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetNumInstancesRequest {
    #[prost(string, optional, tag = "1")]
    pub module: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub version: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetNumInstancesResponse {
    #[prost(int64, tag = "1")]
    pub instances: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetNumInstancesRequest {
    #[prost(string, optional, tag = "1")]
    pub module: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub version: Option<String>,
    #[prost(int64, tag = "3")]
    pub instances: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetNumInstancesResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StartModuleRequest {
    #[prost(string, tag = "1")]
    pub module: String,
    #[prost(string, tag = "2")]
    pub version: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StartModuleResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StopModuleRequest {
    #[prost(string, optional, tag = "1")]
    pub module: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub version: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StopModuleResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetHostnameRequest {
    #[prost(string, optional, tag = "1")]
    pub module: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub version: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub instance: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetHostnameResponse {
    #[prost(string, tag = "1")]
    pub hostname: String,
}
