//! [`RestTransport`]: unary calls as HTTP/JSON requests.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gax::call::Metadata;
use gax::descriptor::{HttpVerb, RpcDescriptor};
use gax::errors::{ConfigError, ErrorKind, RpcError};
use gax::transport::{
    InboundReply, OutboundCall, Transport, TransportConfig, TransportFactory, TransportKind,
    TransportRegistry,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{error_from_client, error_from_response, parse_retry_after};
use crate::transcode::transcode;

/// Idle connections kept per host.
const POOL_IDLE_PER_HOST: usize = 16;

/// HTTP/JSON transport.
///
/// One pooled HTTP client serves every call; [`Transport::close`] drops it
/// along with its idle connections.
pub struct RestTransport {
    kind: TransportKind,
    base: Url,
    host: String,
    client: Mutex<Option<reqwest::Client>>,
    shutdown: CancellationToken,
}

impl RestTransport {
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let base = base_url(&config.endpoint.host)?;

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(POOL_IDLE_PER_HOST);
        if let Some(cert) = &config.endpoint.client_certificate {
            let mut pem = cert.cert_pem.clone();
            pem.push(b'\n');
            pem.extend_from_slice(&cert.key_pem);
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                ConfigError::ClientCertificate {
                    reason: e.to_string(),
                }
            })?;
            builder = builder.identity(identity);
        }
        let client = builder.build().map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: base.to_string(),
            reason: e.to_string(),
        })?;

        debug!(base = %base, mtls = config.endpoint.mtls, "created HTTP client");

        Ok(Self {
            kind: config.kind,
            host: base.host_str().unwrap_or_default().to_string(),
            base,
            client: Mutex::new(Some(client)),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn client(&self) -> Result<reqwest::Client, RpcError> {
        self.client
            .lock()
            .map_err(|_| RpcError::new(ErrorKind::Internal, "client lock poisoned"))?
            .clone()
            .ok_or_else(|| RpcError::cancelled("transport is closed"))
    }

    async fn send(
        &self,
        rpc: &'static RpcDescriptor,
        call: OutboundCall<'_>,
    ) -> Result<InboundReply, RpcError> {
        let http = transcode(&rpc.http, call.request.to_json()?)?;

        let mut url = self.base.clone();
        url.set_path(&http.path);
        if !http.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&http.query);
        }

        let mut request = self
            .client()?
            .request(method(http.verb), url)
            .headers(header_map(call.metadata)?)
            .timeout(call.deadline.remaining());
        if let Some(body) = &http.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| error_from_client(&e))?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.bytes().await.map_err(|e| error_from_client(&e))?;

        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), &body, retry_after));
        }
        if body.is_empty() {
            return Ok(InboundReply::Json(Value::Object(serde_json::Map::new())));
        }
        serde_json::from_slice(&body)
            .map(InboundReply::Json)
            .map_err(|e| RpcError::serialization(format!("response is not JSON: {e}")))
    }
}

impl fmt::Debug for RestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestTransport")
            .field("kind", &self.kind)
            .field("base", &self.base.as_str())
            .field("closed", &self.shutdown.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl Transport for RestTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn host(&self) -> &str {
        &self.host
    }

    #[instrument(level = "debug", skip_all, fields(rpc = rpc.method, verb = rpc.http.verb.as_str()))]
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
            outcome = self.send(rpc, call) => outcome,
        }
    }

    async fn close(&self) {
        self.shutdown.cancel();
        if let Ok(mut client) = self.client.lock() {
            client.take();
        }
        debug!(base = %self.base, "closed HTTP transport");
    }
}

/// `https://host`, keeping an explicit scheme or port.
pub fn base_url(host: &str) -> Result<Url, ConfigError> {
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEndpoint {
        endpoint: host.to_string(),
        reason: e.to_string(),
    })
}

fn method(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::Get => Method::GET,
        HttpVerb::Post => Method::POST,
        HttpVerb::Put => Method::PUT,
        HttpVerb::Patch => Method::PATCH,
        HttpVerb::Delete => Method::DELETE,
    }
}

/// Call metadata as HTTP headers; `user-agent` is owned by the client.
fn header_map(metadata: &Metadata) -> Result<HeaderMap, RpcError> {
    let mut headers = HeaderMap::with_capacity(metadata.len());
    for (key, value) in metadata.iter() {
        if key == "user-agent" {
            continue;
        }
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| RpcError::invalid_argument(format!("header name {key:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RpcError::invalid_argument(format!("header value for {key:?}: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

/// Factory for the transport registry.
pub fn factory() -> TransportFactory {
    Arc::new(|config: TransportConfig| {
        Ok(Arc::new(RestTransport::new(config)?) as Arc<dyn Transport>)
    })
}

/// Registers `rest`, usable from both regimes.
pub fn register(registry: &mut TransportRegistry) {
    registry.register("rest", TransportKind::Rest, factory());
}
