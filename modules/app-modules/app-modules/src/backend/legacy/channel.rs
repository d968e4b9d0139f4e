//! Binary RPC channel to the modules service.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes};
use http::uri::PathAndQuery;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

use crate::backend::TransportError;
use crate::config::{ConfigError, LegacyConfig};

/// Fully qualified name of the RPC service.
pub const SERVICE_NAME: &str = "appengine.modules.v1.ModulesService";

/// Metadata key carrying the numeric application error code on a failed call.
pub const APPLICATION_ERROR_KEY: &str = "x-modules-application-error";

/// Metadata key naming the client operation that issued the call.
pub const CALLER_KEY: &str = "x-modules-caller";

/// Unary request/response exchange of encoded messages.
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Invokes `method` once with an encoded request.
    ///
    /// # Errors
    ///
    /// A [`TransportError`] describing the failed call.
    async fn invoke(
        &self,
        method: &'static str,
        caller: &'static str,
        request: Bytes,
    ) -> Result<Bytes, TransportError>;
}

/// [`RpcChannel`] over a tonic HTTP/2 channel.
#[derive(Debug, Clone)]
pub struct GrpcChannel {
    channel: Channel,
}

fn build_endpoint(cfg: &LegacyConfig) -> Result<Endpoint, ConfigError> {
    let endpoint = Endpoint::from_shared(cfg.endpoint.clone())
        .map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: cfg.endpoint.clone(),
            reason: e.to_string(),
        })?
        .connect_timeout(cfg.connect_timeout())
        .timeout(cfg.rpc_timeout())
        .tcp_keepalive(Some(Duration::from_secs(30)))
        .http2_keep_alive_interval(Duration::from_secs(30))
        .keep_alive_timeout(Duration::from_secs(10));
    Ok(endpoint)
}

impl GrpcChannel {
    /// Builds a channel that connects on first use. Must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEndpoint`] if the endpoint is not a valid URI.
    pub fn connect_lazy(cfg: &LegacyConfig) -> Result<Self, ConfigError> {
        let channel = build_endpoint(cfg)?.connect_lazy();
        tracing::debug!(
            endpoint = %cfg.endpoint,
            connect_timeout_ms = cfg.connect_timeout_ms,
            rpc_timeout_ms = cfg.rpc_timeout_ms,
            "modules RPC channel configured"
        );
        Ok(Self { channel })
    }
}

#[async_trait]
impl RpcChannel for GrpcChannel {
    async fn invoke(
        &self,
        method: &'static str,
        caller: &'static str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        let path = PathAndQuery::try_from(format!("/{SERVICE_NAME}/{method}"))
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| TransportError::Rpc {
                code: tonic::Code::Unavailable,
                detail: e.to_string(),
            })?;

        let mut request = Request::new(request);
        request
            .metadata_mut()
            .insert(CALLER_KEY, MetadataValue::from_static(caller));

        grpc.unary(request, path, RawCodec)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| status_to_transport_error(&status))
    }
}

/// Application code in metadata wins over the gRPC status code.
fn status_to_transport_error(status: &Status) -> TransportError {
    let application_code = status
        .metadata()
        .get(APPLICATION_ERROR_KEY)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i32>().ok());

    match application_code {
        Some(code) => TransportError::Application {
            code,
            detail: status.message().to_owned(),
        },
        None => TransportError::Rpc {
            code: status.code(),
            detail: status.message().to_owned(),
        },
    }
}

/// Passes already-encoded protobuf bytes through tonic unchanged.
#[derive(Debug, Clone, Copy, Default)]
struct RawCodec;

#[derive(Debug, Clone, Copy, Default)]
struct RawEncoder;

#[derive(Debug, Clone, Copy, Default)]
struct RawDecoder;

impl Codec for RawCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawEncoder;
    type Decoder = RawDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        RawEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawDecoder
    }
}

impl Encoder for RawEncoder {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put_slice(&item);
        Ok(())
    }
}

impl Decoder for RawDecoder {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let len = src.remaining();
        Ok(Some(src.copy_to_bytes(len)))
    }
}
