#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Admin REST backend against a mock API server.

use std::sync::Arc;
use std::time::Duration;

use app_modules::backend::ModulesBackend;
use app_modules::backend::admin::{AdminBackend, HttpAdminTransport};
use app_modules::config::AdminConfig;
use app_modules::{ExecutionIdentity, ModulesLocalClient, ModulesService};
use app_modules_sdk::{BackendCode, ErrorKind, HostnameRequest, ModulesClient};
use httpmock::prelude::*;
use secrecy::SecretString;
use serde_json::json;

const UA_PREFIX: &str = "appengine-modules-api-rust-client";

fn backend(server: &MockServer) -> AdminBackend {
    let cfg = AdminConfig {
        base_url: format!("{}/v1", server.base_url()),
        allow_insecure_http: true,
        access_token: Some(SecretString::from("test-token".to_owned())),
        ..AdminConfig::default()
    };
    let transport = HttpAdminTransport::new(&cfg).unwrap();
    AdminBackend::new(Arc::new(transport), "demo")
}

fn client(server: &MockServer, identity: ExecutionIdentity) -> ModulesLocalClient {
    let service = ModulesService::new(Arc::new(backend(server)), identity);
    ModulesLocalClient::new(Arc::new(service))
}

fn mock_topology(server: &MockServer, services: &[&str]) {
    let _app = server.mock(|when, then| {
        when.method(GET).path("/v1/apps/demo");
        then.status(200)
            .json_body(json!({"id": "demo", "defaultHostname": "demo.appspot.com"}));
    });
    let services: Vec<_> = services.iter().map(|id| json!({"id": id})).collect();
    let _services = server.mock(|when, then| {
        when.method(GET).path("/v1/apps/demo/services");
        then.status(200).json_body(json!({"services": services}));
    });
}

#[tokio::test]
async fn list_modules_follows_pagination() {
    let server = MockServer::start();
    let second = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps/demo/services")
            .query_param("pageToken", "p2");
        then.status(200).json_body(json!({"services": [{"id": "worker"}]}));
    });
    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps/demo/services")
            .header("user-agent", format!("{UA_PREFIX}/get_modules"))
            .header("authorization", "Bearer test-token");
        then.status(200).json_body(json!({
            "services": [{"id": "default"}, {"id": "api"}],
            "nextPageToken": "p2"
        }));
    });

    let modules = backend(&server).list_modules().await.unwrap();

    assert_eq!(modules, vec!["default", "api", "worker"]);
    first.assert();
    second.assert();
}

#[tokio::test]
async fn repeated_page_token_ends_the_listing_with_an_error() {
    let server = MockServer::start();
    let looping = server.mock(|when, then| {
        when.method(GET).path("/v1/apps/demo/services");
        then.status(200).json_body(json!({
            "services": [{"id": "default"}],
            "nextPageToken": "same"
        }));
    });

    let err = tokio::time::timeout(Duration::from_secs(5), backend(&server).list_modules())
        .await
        .expect("listing must terminate")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Generic);
    assert!(!err.is_retryable());
    assert!(err.message().contains("same"));
    looping.assert_hits(2);
}

#[tokio::test]
async fn slow_responses_time_out_as_transient() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/v1/apps/demo/services/api");
        then.status(200)
            .delay(Duration::from_millis(500))
            .json_body(json!({"id": "api"}));
    });
    let cfg = AdminConfig {
        base_url: format!("{}/v1", server.base_url()),
        allow_insecure_http: true,
        request_timeout_ms: 50,
        ..AdminConfig::default()
    };
    let transport = HttpAdminTransport::new(&cfg).unwrap();
    let backend = AdminBackend::new(Arc::new(transport), "demo");

    let err = backend.get_default_version("api").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(err.message().contains("timed out"));
}

#[tokio::test]
async fn unknown_project_keeps_http_status() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/v1/apps/demo/services");
        then.status(404)
            .json_body(json!({"error": {"code": 404, "message": "App does not exist."}}));
    });

    let err = backend(&server).list_modules().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Generic);
    assert_eq!(err.code(), Some(BackendCode::Http(404)));
    assert!(err.message().contains("App does not exist."));
}

#[tokio::test]
async fn list_versions_of_unknown_module_is_invalid_module() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps/demo/services/ghost/versions")
            .query_param("view", "FULL");
        then.status(404).body("not here");
    });

    let err = backend(&server).list_versions("ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidModule);
}

#[tokio::test]
async fn default_version_prefers_largest_allocation_then_name() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/v1/apps/demo/services/api");
        then.status(200).json_body(json!({
            "id": "api",
            "split": {"allocations": {"v3": 0.2, "v2": 0.4, "v1": 0.4}}
        }));
    });

    let version = backend(&server).get_default_version("api").await.unwrap();
    assert_eq!(version, "v1");
}

#[tokio::test]
async fn empty_traffic_split_has_no_default() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/v1/apps/demo/services/api");
        then.status(200).json_body(json!({"id": "api", "split": {"allocations": {}}}));
    });

    let err = backend(&server).get_default_version("api").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidVersion);
}

#[tokio::test]
async fn instance_count_requires_manual_scaling() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps/demo/services/api/versions/v1")
            .query_param("view", "FULL");
        then.status(200)
            .json_body(json!({"id": "v1", "manualScaling": {"instances": 3}}));
    });
    let _m = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps/demo/services/api/versions/v2")
            .query_param("view", "FULL");
        then.status(200)
            .json_body(json!({"id": "v2", "automaticScaling": {"maxConcurrentRequests": 10}}));
    });

    let backend = backend(&server);
    assert_eq!(backend.get_instance_count("api", "v1").await.unwrap(), 3);
    let err = backend.get_instance_count("api", "v2").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidVersion);
}

#[tokio::test]
async fn set_instance_count_patches_manual_scaling() {
    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/v1/apps/demo/services/api/versions/v1")
            .query_param("updateMask", "manualScaling.instances")
            .header("user-agent", format!("{UA_PREFIX}/set_num_instances"))
            .header("content-type", "application/json")
            .json_body(json!({"manualScaling": {"instances": 5}}));
        then.status(200).json_body(json!({"name": "apps/demo/operations/1"}));
    });

    let client = client(&server, ExecutionIdentity::new("api", "v1"));
    client.set_instance_count(5, None, None).await.unwrap();
    patch.assert();
}

#[tokio::test]
async fn start_and_stop_patch_serving_status() {
    let server = MockServer::start();
    let start = server.mock(|when, then| {
        when.method(PATCH)
            .path("/v1/apps/demo/services/api/versions/v2")
            .query_param("updateMask", "servingStatus")
            .header("user-agent", format!("{UA_PREFIX}/start_version"))
            .json_body(json!({"servingStatus": "SERVING"}));
        then.status(200).json_body(json!({}));
    });
    let stop = server.mock(|when, then| {
        when.method(PATCH)
            .path("/v1/apps/demo/services/api/versions/v2")
            .query_param("updateMask", "servingStatus")
            .header("user-agent", format!("{UA_PREFIX}/stop_version"))
            .json_body(json!({"servingStatus": "STOPPED"}));
        then.status(200).json_body(json!({}));
    });

    let client = client(&server, ExecutionIdentity::new("api", "v1"));
    client.start_version(None, Some("v2")).await.unwrap();
    client
        .submit_stop_version(Some("api"), Some("v2"))
        .result()
        .await
        .unwrap();

    start.assert();
    stop.assert();
}

#[tokio::test]
async fn serving_status_errors_are_classified() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(PATCH).path("/v1/apps/demo/services/api/versions/gone");
        then.status(404).body("");
    });
    let _m = server.mock(|when, then| {
        when.method(PATCH).path("/v1/apps/demo/services/api/versions/busy");
        then.status(503)
            .json_body(json!({"error": {"message": "backend unavailable"}}));
    });

    let backend = Arc::new(backend(&server));
    let client = ModulesLocalClient::new(Arc::new(ModulesService::new(
        backend,
        ExecutionIdentity::new("api", "v1"),
    )));

    let err = client.start_version(None, Some("gone")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidVersion);

    let err = client.stop_version(None, Some("busy")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(err.is_retryable());
    assert_eq!(err.message(), "backend unavailable");
}

#[tokio::test]
async fn hostname_for_single_default_module() {
    let server = MockServer::start();
    mock_topology(&server, &["default"]);

    let client = client(&server, ExecutionIdentity::new("default", "v7"));
    let host = client.get_hostname(&HostnameRequest::new()).await.unwrap();
    assert_eq!(host, "v7.demo.appspot.com");

    let host = client
        .get_hostname(&HostnameRequest::new().instance(2))
        .await
        .unwrap();
    assert_eq!(host, "2.v7.demo.appspot.com");
}

#[tokio::test]
async fn hostname_for_manual_instance() {
    let server = MockServer::start();
    mock_topology(&server, &["default", "api"]);
    let _m = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps/demo/services/api/versions/v1")
            .query_param("view", "FULL");
        then.status(200)
            .json_body(json!({"id": "v1", "manualScaling": {"instances": 2}}));
    });

    let client = client(&server, ExecutionIdentity::new("default", "v1"));
    let request = HostnameRequest::new().module("api").version("v1");

    let host = client.get_hostname(&request.clone().instance(1)).await.unwrap();
    assert_eq!(host, "1.v1.api.demo.appspot.com");

    let err = client.get_hostname(&request.instance(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInstances);
}

#[tokio::test]
async fn hostname_falls_back_to_module_when_current_version_absent() {
    let server = MockServer::start();
    mock_topology(&server, &["default", "api"]);
    let _m = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps/demo/services/api/versions")
            .query_param("view", "FULL");
        then.status(200).json_body(json!({"versions": [{"id": "v2"}]}));
    });

    let client = client(&server, ExecutionIdentity::new("api", "v1"));
    let host = client.get_hostname(&HostnameRequest::new()).await.unwrap();
    assert_eq!(host, "api.demo.appspot.com");

    let host = client
        .get_hostname(&HostnameRequest::new().version("v9"))
        .await
        .unwrap();
    assert_eq!(host, "v9.api.demo.appspot.com");
}

#[tokio::test]
async fn hostname_rejects_unknown_module_and_bad_instance() {
    let server = MockServer::start();
    mock_topology(&server, &["default", "api"]);

    let client = client(&server, ExecutionIdentity::new("api", "v1"));

    let err = client
        .get_hostname(&HostnameRequest::new().module("ghost"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidModule);

    let err = client
        .get_hostname(&HostnameRequest::new().instance("abc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInstances);
}

#[tokio::test]
async fn hostname_for_module_without_version_listing_is_invalid_module() {
    let server = MockServer::start();
    mock_topology(&server, &["default", "api"]);
    let versions = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/apps/demo/services/api/versions")
            .query_param("view", "FULL");
        then.status(404)
            .json_body(json!({"error": {"code": 404, "message": "Service not found."}}));
    });

    let client = client(&server, ExecutionIdentity::new("api", "v1"));
    let err = client.get_hostname(&HostnameRequest::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidModule);
    assert_eq!(err.message(), "Service not found.");
    versions.assert();
}
