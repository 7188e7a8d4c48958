//! Shared fixtures: a scripted transport and a builder wired to it.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aiplatform::ClientBuilder;
use async_trait::async_trait;
use gax::call::{Deadline, Metadata};
use gax::credentials::AccessTokenCredentials;
use gax::descriptor::RpcDescriptor;
use gax::errors::{ErrorKind, RpcError};
use gax::longrunning::Operation;
use gax::lro::PollPolicy;
use gax::options::ClientOptions;
use gax::transport::{
    InboundReply, OutboundCall, Transport, TransportConfig, TransportKind, TransportRegistry,
    WireMessage,
};
use gax::wkt::{Any, Status};
use prost::Name;
use serde_json::Value;

/// One attempt as the transport saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// `service/method`.
    pub rpc: String,
    pub metadata: Metadata,
    pub request: Value,
    pub deadline: Deadline,
}

/// Replays queued replies in order and records every attempt.
#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Result<InboundReply, RpcError>>>,
    calls: Mutex<Vec<Recorded>>,
    closed: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply<M: WireMessage>(&self, message: &M) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(InboundReply::Proto(message.encode_proto())));
    }

    pub fn fail(&self, err: RpcError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rpcs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.rpc).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Rest
    }

    fn host(&self) -> &str {
        "aiplatform.googleapis.com"
    }

    async fn call(
        &self,
        rpc: &'static RpcDescriptor,
        call: OutboundCall<'_>,
    ) -> Result<InboundReply, RpcError> {
        self.calls.lock().unwrap().push(Recorded {
            rpc: rpc.full_name(),
            metadata: call.metadata.clone(),
            request: call.request.to_json().unwrap_or(Value::Null),
            deadline: call.deadline,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RpcError::new(ErrorKind::Internal, "no scripted reply")))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Registry whose only entry, `fake`, hands out `transport`.
pub fn registry(transport: Arc<FakeTransport>) -> TransportRegistry {
    TransportRegistry::new().with(
        "fake",
        TransportKind::Rest,
        Arc::new(move |_config: TransportConfig| Ok(transport.clone() as Arc<dyn Transport>)),
    )
}

pub fn fast_polls() -> PollPolicy {
    PollPolicy {
        initial_delay: Duration::from_millis(10),
        multiplier: 1.0,
        max_delay: Duration::from_millis(10),
        timeout: Some(Duration::from_secs(60)),
    }
}

/// Builder using `transport`, a static token and an empty environment.
pub fn builder(transport: Arc<FakeTransport>) -> ClientBuilder {
    let options = ClientOptions::default()
        .with_credentials(Arc::new(AccessTokenCredentials::new("t")));
    ClientBuilder::new(options)
        .with_environment(HashMap::new())
        .with_registry(registry(transport))
        .with_transport("fake")
        .with_poll_policy(fast_polls())
}

pub fn pending_operation(name: &str) -> Operation {
    Operation {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn finished_operation<R: prost::Message + Name>(name: &str, response: &R) -> Operation {
    Operation {
        name: name.to_string(),
        done: true,
        response: Some(Any::pack(response)),
        ..Default::default()
    }
}

pub fn failed_operation(name: &str, code: i32, message: &str) -> Operation {
    Operation {
        name: name.to_string(),
        done: true,
        error: Some(Status {
            code,
            message: message.to_string(),
            details: vec![],
        }),
        ..Default::default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
