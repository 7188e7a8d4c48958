//! The transport port and the registry transports are selected from.
//!
//! A [`Transport`] moves one already-prepared call over the wire: it gets a
//! type-erased request, the final metadata and an absolute deadline, and
//! hands back the raw reply. Everything else (retries, routing, interceptors,
//! decoding) happens in [`crate::executor`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::call::{Deadline, Metadata};
use crate::descriptor::{RpcDescriptor, ServiceDescriptor};
use crate::errors::{ConfigError, RpcError};
use crate::fields;
use crate::options::ResolvedEndpoint;

// ---------------------------------------------------------------------------
// Messages on the wire
// ---------------------------------------------------------------------------

/// A request message in both of its wire encodings.
pub trait WireMessage: Send + Sync {
    /// Protobuf encoding.
    fn encode_proto(&self) -> Bytes;

    /// Canonical JSON encoding, with default-valued fields omitted.
    fn to_json(&self) -> Result<Value, RpcError>;
}

impl<T> WireMessage for T
where
    T: prost::Message + Serialize + Send + Sync,
{
    fn encode_proto(&self) -> Bytes {
        Bytes::from(self.encode_to_vec())
    }

    fn to_json(&self) -> Result<Value, RpcError> {
        serde_json::to_value(self)
            .map(fields::prune_defaults)
            .map_err(|e| RpcError::serialization(format!("encoding request as JSON: {e}")))
    }
}

/// Raw reply, in the encoding of the transport that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundReply {
    Proto(Bytes),
    Json(Value),
}

impl InboundReply {
    /// Decodes into the declared response type.
    pub fn decode<T>(self) -> Result<T, RpcError>
    where
        T: prost::Message + Default + DeserializeOwned,
    {
        match self {
            Self::Proto(bytes) => T::decode(bytes)
                .map_err(|e| RpcError::serialization(format!("decoding protobuf response: {e}"))),
            Self::Json(value) => serde_json::from_value(value)
                .map_err(|e| RpcError::serialization(format!("decoding JSON response: {e}"))),
        }
    }
}

/// One prepared attempt.
#[derive(Clone, Copy)]
pub struct OutboundCall<'a> {
    pub request: &'a dyn WireMessage,
    /// Final metadata, routing and auth headers included.
    pub metadata: &'a Metadata,
    pub deadline: Deadline,
}

// ---------------------------------------------------------------------------
// Transport port
// ---------------------------------------------------------------------------

/// Which registry entry a transport was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Binary framing, driven from blocking clients.
    Grpc,
    /// Binary framing, driven from async clients.
    GrpcAsyncio,
    /// HTTP/JSON; usable from both.
    Rest,
}

impl TransportKind {
    pub fn supports(self, regime: Regime) -> bool {
        match self {
            Self::Grpc => regime == Regime::Blocking,
            Self::GrpcAsyncio => regime == Regime::Cooperative,
            Self::Rest => true,
        }
    }
}

/// Concurrency regime of the client using a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Each call blocks the calling thread.
    Blocking,
    /// Calls are awaited.
    Cooperative,
}

impl Regime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Cooperative => "async",
        }
    }
}

/// Moves prepared calls over the wire.
///
/// Implementations must be cheap to share: one instance serves every RPC of
/// a client concurrently.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    fn kind(&self) -> TransportKind;

    /// Host the transport is connected to.
    fn host(&self) -> &str;

    /// Issues a single attempt. Must give up once `call.deadline` passes.
    async fn call(
        &self,
        rpc: &'static RpcDescriptor,
        call: OutboundCall<'_>,
    ) -> Result<InboundReply, RpcError>;

    /// Releases connections. Calls issued afterwards fail.
    async fn close(&self);
}

/// Everything a factory needs to build a transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub service: &'static ServiceDescriptor,
    pub endpoint: ResolvedEndpoint,
    pub kind: TransportKind,
    pub user_agent: String,
}

pub type TransportFactory =
    Arc<dyn Fn(TransportConfig) -> Result<Arc<dyn Transport>, ConfigError> + Send + Sync>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Registration {
    kind: TransportKind,
    factory: TransportFactory,
}

/// Name → transport factory map consulted at client construction.
#[derive(Clone, Default)]
pub struct TransportRegistry {
    entries: BTreeMap<String, Registration>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a transport under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: TransportKind,
        factory: TransportFactory,
    ) {
        self.entries
            .insert(name.into(), Registration { kind, factory });
    }

    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<String>,
        kind: TransportKind,
        factory: TransportFactory,
    ) -> Self {
        self.register(name, kind, factory);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Looks up `name` for a client of the given regime.
    pub fn resolve(
        &self,
        name: &str,
        regime: Regime,
    ) -> Result<(TransportKind, TransportFactory), ConfigError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTransport {
                name: name.to_string(),
            })?;
        if !entry.kind.supports(regime) {
            return Err(ConfigError::UnsupportedTransport {
                name: name.to_string(),
                regime: regime.as_str(),
            });
        }
        Ok((entry.kind, entry.factory.clone()))
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, r)| (name, r.kind)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wkt::Status;

    #[derive(Debug)]
    struct Null;

    #[async_trait]
    impl Transport for Null {
        fn kind(&self) -> TransportKind {
            TransportKind::Rest
        }
        fn host(&self) -> &str {
            "localhost"
        }
        async fn call(
            &self,
            _rpc: &'static RpcDescriptor,
            _call: OutboundCall<'_>,
        ) -> Result<InboundReply, RpcError> {
            Ok(InboundReply::Json(Value::Null))
        }
        async fn close(&self) {}
    }

    fn factory() -> TransportFactory {
        Arc::new(|_config: TransportConfig| Ok(Arc::new(Null) as Arc<dyn Transport>))
    }

    #[test]
    fn test_registry_checks_regime() {
        let registry = TransportRegistry::new()
            .with("grpc", TransportKind::Grpc, factory())
            .with("grpc_asyncio", TransportKind::GrpcAsyncio, factory())
            .with("rest", TransportKind::Rest, factory());

        assert!(registry.resolve("grpc", Regime::Blocking).is_ok());
        assert!(registry.resolve("rest", Regime::Cooperative).is_ok());
        assert!(matches!(
            registry.resolve("grpc_asyncio", Regime::Blocking),
            Err(ConfigError::UnsupportedTransport { .. })
        ));
        assert!(matches!(
            registry.resolve("grpc", Regime::Cooperative),
            Err(ConfigError::UnsupportedTransport { .. })
        ));
        assert!(matches!(
            registry.resolve("carrier-pigeon", Regime::Cooperative),
            Err(ConfigError::UnknownTransport { .. })
        ));
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["grpc", "grpc_asyncio", "rest"]
        );
    }

    #[test]
    fn test_reply_decodes_both_encodings() {
        let status = Status {
            code: 5,
            message: "missing".into(),
            details: vec![],
        };
        let proto = InboundReply::Proto(status.encode_proto());
        assert_eq!(proto.decode::<Status>().unwrap(), status);

        let json = InboundReply::Json(status.to_json().unwrap());
        assert_eq!(json.decode::<Status>().unwrap(), status);

        let err = InboundReply::Json(serde_json::json!({"code": "nope"}))
            .decode::<Status>()
            .unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Serialization);
    }

    #[test]
    fn test_json_omits_defaults() {
        let status = Status {
            code: 0,
            message: "m".into(),
            details: vec![],
        };
        assert_eq!(status.to_json().unwrap(), serde_json::json!({"message": "m"}));
    }
}
