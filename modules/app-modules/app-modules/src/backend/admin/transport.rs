//! HTTPS transport to the admin REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::{Method, Request};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::backend::TransportError;
use crate::config::{AdminConfig, ConfigError};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Request/response exchange with the admin API, one attempt per call.
///
/// `path` is relative to the API root and may carry a query string.
/// `caller` names the client operation and ends up in the `User-Agent`.
#[async_trait]
pub trait AdminTransport: Send + Sync {
    /// # Errors
    /// [`TransportError::Http`] for non-2xx replies, `Io` for connection failures.
    async fn get(&self, path: &str, caller: &'static str) -> Result<Bytes, TransportError>;

    /// # Errors
    /// [`TransportError::Http`] for non-2xx replies, `Io` for connection failures.
    async fn patch(
        &self,
        path: &str,
        body: Bytes,
        caller: &'static str,
    ) -> Result<Bytes, TransportError>;
}

/// [`AdminTransport`] over hyper with rustls.
#[derive(Clone)]
pub struct HttpAdminTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    base_url: String,
    timeout: Duration,
    user_agent_prefix: String,
    access_token: Option<SecretString>,
}

fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn build_https_connector(
    allow_insecure_http: bool,
) -> Result<HttpsConnector<HttpConnector>, ConfigError> {
    let builder = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(crypto_provider())
        .map_err(|e| ConfigError::Tls(e.to_string()))?;
    let connector = if allow_insecure_http {
        builder.https_or_http().enable_all_versions().build()
    } else {
        builder.https_only().enable_all_versions().build()
    };
    Ok(connector)
}

impl HttpAdminTransport {
    /// # Errors
    ///
    /// - [`ConfigError::InvalidEndpoint`] if `base_url` is not an absolute
    ///   URL, or is plain `http` without `allow_insecure_http`
    /// - [`ConfigError::Tls`] if the TLS stack cannot be initialised
    pub fn new(cfg: &AdminConfig) -> Result<Self, ConfigError> {
        let base_url = cfg.base_url.trim_end_matches('/').to_owned();
        let uri: http::Uri = base_url.parse().map_err(|e: http::uri::InvalidUri| {
            ConfigError::InvalidEndpoint {
                endpoint: cfg.base_url.clone(),
                reason: e.to_string(),
            }
        })?;
        match uri.scheme_str() {
            Some("https") => {}
            Some("http") if cfg.allow_insecure_http => {}
            _ => {
                return Err(ConfigError::InvalidEndpoint {
                    endpoint: cfg.base_url.clone(),
                    reason: "expected an https:// URL".to_owned(),
                });
            }
        }

        let https = build_https_connector(cfg.allow_insecure_http)?;
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .build::<_, Full<Bytes>>(https);

        Ok(Self {
            client,
            base_url,
            timeout: cfg.request_timeout(),
            user_agent_prefix: cfg.user_agent_prefix.clone(),
            access_token: cfg.access_token.clone(),
        })
    }

    fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Bytes>,
        caller: &'static str,
    ) -> Result<Request<Full<Bytes>>, TransportError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_AGENT, format!("{}/{caller}", self.user_agent_prefix))
            .header(ACCEPT, "application/json");
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(token) = &self.access_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }
        builder
            .body(Full::new(body.unwrap_or_default()))
            .map_err(|e| TransportError::Request(format!("{uri}: {e}")))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
        caller: &'static str,
    ) -> Result<Bytes, TransportError> {
        let uri = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let request = self.request(method.clone(), &uri, body, caller)?;

        tracing::debug!(%method, %uri, caller, "admin API request");

        // The deadline covers reading the body too.
        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| TransportError::Io(format!("{method} {uri} failed: {e}")))?;
            let status = response.status();
            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::Io(format!("reading {uri} body failed: {e}")))?
                .to_bytes();
            Ok::<_, TransportError>((status, bytes))
        };
        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                TransportError::Io(format!(
                    "{method} {uri} timed out after {} ms",
                    self.timeout.as_millis()
                ))
            })??;

        if status.is_success() {
            Ok(bytes)
        } else {
            Err(TransportError::Http {
                status: status.as_u16(),
                detail: error_detail(&bytes),
            })
        }
    }
}

#[async_trait]
impl AdminTransport for HttpAdminTransport {
    async fn get(&self, path: &str, caller: &'static str) -> Result<Bytes, TransportError> {
        self.send(Method::GET, path, None, caller).await
    }

    async fn patch(
        &self,
        path: &str,
        body: Bytes,
        caller: &'static str,
    ) -> Result<Bytes, TransportError> {
        self.send(Method::PATCH, path, Some(body), caller).await
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Google-style `{"error": {"message": ...}}` if present, else a body preview.
fn error_detail(body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn error_detail_prefers_google_envelope() {
        let body = br#"{"error": {"code": 404, "message": "App does not exist.", "status": "NOT_FOUND"}}"#;
        assert_eq!(error_detail(body), "App does not exist.");
    }

    #[test]
    fn error_detail_truncates_plain_bodies() {
        let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
        let detail = error_detail(long.as_bytes());
        assert_eq!(detail.len(), BODY_PREVIEW_LIMIT + 3);
        assert!(detail.ends_with("..."));
        assert_eq!(error_detail(b"bad gateway"), "bad gateway");
    }

    #[test]
    fn malformed_headers_fail_before_sending() {
        let cfg = AdminConfig {
            base_url: "https://admin.example.test/v1".to_owned(),
            user_agent_prefix: "bad\nagent".to_owned(),
            ..AdminConfig::default()
        };
        let transport = HttpAdminTransport::new(&cfg).unwrap();

        let err = transport
            .request(Method::GET, "https://admin.example.test/v1/apps/p", None, "get_modules")
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[test]
    fn plain_http_requires_opt_in() {
        let cfg = AdminConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            ..AdminConfig::default()
        };
        assert!(matches!(
            HttpAdminTransport::new(&cfg),
            Err(ConfigError::InvalidEndpoint { .. })
        ));

        let cfg = AdminConfig {
            allow_insecure_http: true,
            ..cfg
        };
        assert!(HttpAdminTransport::new(&cfg).is_ok());
    }
}
