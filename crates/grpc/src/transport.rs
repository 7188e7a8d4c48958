//! [`GrpcTransport`]: unary calls over a lazily connected tonic channel.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gax::call::Metadata;
use gax::descriptor::RpcDescriptor;
use gax::errors::{ConfigError, ErrorKind, RpcError};
use gax::options::with_default_port;
use gax::transport::{
    InboundReply, OutboundCall, Transport, TransportConfig, TransportFactory, TransportKind,
    TransportRegistry,
};
use tokio_util::sync::CancellationToken;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, BinaryMetadataKey, BinaryMetadataValue};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint, Identity};
use tracing::{debug, instrument};

use crate::codec::RawCodec;
use crate::status::status_to_error;

/// Headers the HTTP/2 layer owns; values in call metadata are not forwarded.
const RESERVED_HEADERS: &[&str] = &["user-agent", "te", "content-type", "grpc-timeout"];

/// Binary-framed transport over one shared channel.
///
/// The channel multiplexes every RPC of a client. It connects on first use
/// and is dropped by [`Transport::close`].
pub struct GrpcTransport {
    kind: TransportKind,
    host: String,
    channel: Mutex<Option<Channel>>,
    shutdown: CancellationToken,
}

impl GrpcTransport {
    /// Builds the channel. Must be called from within a tokio runtime.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let uri = channel_uri(&config.endpoint.host, config.service.default_port);
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: uri.clone(),
            reason,
        };

        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| invalid(e.to_string()))?
            .user_agent(config.user_agent.clone())
            .map_err(|e| invalid(e.to_string()))?
            .tcp_nodelay(true);

        if uri.starts_with("https://") {
            let mut tls = ClientTlsConfig::new().with_native_roots();
            if let Some(cert) = &config.endpoint.client_certificate {
                tls = tls.identity(Identity::from_pem(&cert.cert_pem, &cert.key_pem));
            }
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|e| ConfigError::ClientCertificate {
                    reason: e.to_string(),
                })?;
        }

        debug!(
            uri = %uri,
            kind = ?config.kind,
            mtls = config.endpoint.mtls,
            "created lazy channel"
        );

        Ok(Self {
            kind: config.kind,
            host: uri.trim_start_matches("https://").trim_start_matches("http://").to_string(),
            channel: Mutex::new(Some(endpoint.connect_lazy())),
            shutdown: CancellationToken::new(),
        })
    }

    fn channel(&self) -> Result<Channel, RpcError> {
        self.channel
            .lock()
            .map_err(|_| RpcError::new(ErrorKind::Internal, "channel lock poisoned"))?
            .clone()
            .ok_or_else(|| RpcError::cancelled("transport is closed"))
    }

    async fn send(
        &self,
        rpc: &'static RpcDescriptor,
        call: OutboundCall<'_>,
    ) -> Result<InboundReply, RpcError> {
        let channel = self.channel()?;
        let path = PathAndQuery::from_str(&rpc.grpc_path())
            .map_err(|e| RpcError::invalid_argument(format!("bad method path: {e}")))?;

        let mut request = tonic::Request::new(call.request.encode_proto());
        request.set_timeout(call.deadline.remaining());
        copy_metadata(call.metadata, request.metadata_mut())?;

        let mut client = tonic::client::Grpc::new(channel);
        client.ready().await.map_err(|e| {
            RpcError::new(ErrorKind::Unavailable, format!("channel not ready: {e}"))
        })?;

        let response = client
            .unary(request, path, RawCodec)
            .await
            .map_err(|status| status_to_error(&status))?;
        Ok(InboundReply::Proto(response.into_inner()))
    }
}

impl fmt::Debug for GrpcTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcTransport")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("closed", &self.shutdown.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn host(&self) -> &str {
        &self.host
    }

    #[instrument(level = "debug", skip_all, fields(rpc = rpc.method))]
    async fn call(
        &self,
        rpc: &'static RpcDescriptor,
        call: OutboundCall<'_>,
    ) -> Result<InboundReply, RpcError> {
        if self.shutdown.is_cancelled() {
            return Err(RpcError::cancelled("transport is closed"));
        }
        if call.deadline.is_expired() {
            return Err(RpcError::deadline_exceeded("deadline passed before sending"));
        }

        tokio::select! {
            _ = self.shutdown.cancelled() => Err(RpcError::cancelled("transport closed during call")),
            outcome = tokio::time::timeout_at(call.deadline.instant(), self.send(rpc, call)) => {
                outcome.unwrap_or_else(|_| {
                    Err(RpcError::deadline_exceeded(format!(
                        "{} timed out",
                        rpc.full_name()
                    )))
                })
            }
        }
    }

    async fn close(&self) {
        self.shutdown.cancel();
        if let Ok(mut channel) = self.channel.lock() {
            channel.take();
        }
        debug!(host = %self.host, "closed channel");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `https://host:port`, or the explicit scheme when the host carries one.
fn channel_uri(host: &str, default_port: u16) -> String {
    let authority = with_default_port(host, default_port);
    if host.starts_with("http://") {
        format!("http://{authority}")
    } else {
        format!("https://{authority}")
    }
}

/// Copies call metadata onto a tonic request; keys ending in `-bin` carry
/// binary values.
fn copy_metadata(
    metadata: &Metadata,
    target: &mut tonic::metadata::MetadataMap,
) -> Result<(), RpcError> {
    for (key, value) in metadata.iter() {
        if RESERVED_HEADERS.contains(&key) {
            continue;
        }
        if key.ends_with("-bin") {
            let key = BinaryMetadataKey::from_bytes(key.as_bytes())
                .map_err(|e| RpcError::invalid_argument(format!("metadata key {key:?}: {e}")))?;
            target.append_bin(key, BinaryMetadataValue::from_bytes(value.as_bytes()));
        } else {
            let parsed_key = AsciiMetadataKey::from_bytes(key.as_bytes())
                .map_err(|e| RpcError::invalid_argument(format!("metadata key {key:?}: {e}")))?;
            let parsed_value = AsciiMetadataValue::try_from(value).map_err(|e| {
                RpcError::invalid_argument(format!("metadata value for {key:?}: {e}"))
            })?;
            target.append(parsed_key, parsed_value);
        }
    }
    Ok(())
}

/// Factory for the transport registry.
pub fn factory() -> TransportFactory {
    Arc::new(|config: TransportConfig| {
        Ok(Arc::new(GrpcTransport::new(config)?) as Arc<dyn Transport>)
    })
}

/// Registers `grpc` (blocking) and `grpc_asyncio` (async).
pub fn register(registry: &mut TransportRegistry) {
    registry.register("grpc", TransportKind::Grpc, factory());
    registry.register("grpc_asyncio", TransportKind::GrpcAsyncio, factory());
}
