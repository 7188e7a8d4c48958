//! Pre- and post-call hooks.
//!
//! Interceptors see every call before the routing header is computed and
//! every successful response after it is decoded. Requests and responses are
//! passed as `dyn Any`; a hook that cares about one message type downcasts
//! and ignores the rest.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::call::Metadata;
use crate::errors::RpcError;

/// An outgoing call, as seen by [`Interceptor::pre_call`].
pub struct OutgoingCall<'a> {
    /// `service/method`.
    pub rpc: &'a str,
    pub request: &'a mut (dyn Any + Send),
    pub metadata: &'a mut Metadata,
}

impl OutgoingCall<'_> {
    /// The request, when it is a `T`.
    pub fn request_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.request.downcast_mut::<T>()
    }
}

/// A decoded response, as seen by [`Interceptor::post_call`].
pub struct IncomingReply<'a> {
    pub rpc: &'a str,
    pub response: &'a mut (dyn Any + Send),
}

impl IncomingReply<'_> {
    pub fn response_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.response.downcast_mut::<T>()
    }
}

/// A hook pair; both halves default to no-ops.
pub trait Interceptor: Send + Sync {
    /// May rewrite the request and metadata, or abort the call.
    fn pre_call(&self, _call: &mut OutgoingCall<'_>) -> Result<(), RpcError> {
        Ok(())
    }

    /// May rewrite the response, or turn it into an error.
    fn post_call(&self, _reply: &mut IncomingReply<'_>) -> Result<(), RpcError> {
        Ok(())
    }
}

struct Entry {
    /// Method name the entry is restricted to; `None` for every RPC.
    method: Option<String>,
    interceptor: Arc<dyn Interceptor>,
}

impl Entry {
    fn applies_to(&self, rpc: &str) -> bool {
        match &self.method {
            None => true,
            Some(method) => rpc == method || rpc.rsplit('/').next() == Some(method.as_str()),
        }
    }
}

/// Ordered interceptors. Pre hooks run in insertion order, post hooks in
/// reverse.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    entries: Vec<Arc<Entry>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an interceptor for every RPC.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.entries.push(Arc::new(Entry {
            method: None,
            interceptor,
        }));
    }

    /// Adds an interceptor for one RPC, named either `Method` or `service/Method`.
    pub fn push_for(&mut self, method: impl Into<String>, interceptor: Arc<dyn Interceptor>) {
        self.entries.push(Arc::new(Entry {
            method: Some(method.into()),
            interceptor,
        }));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn run_pre(&self, call: &mut OutgoingCall<'_>) -> Result<(), RpcError> {
        for entry in self.entries.iter().filter(|e| e.applies_to(call.rpc)) {
            entry.interceptor.pre_call(call)?;
        }
        Ok(())
    }

    pub fn run_post(&self, reply: &mut IncomingReply<'_>) -> Result<(), RpcError> {
        for entry in self.entries.iter().rev().filter(|e| e.applies_to(reply.rpc)) {
            entry.interceptor.post_call(reply)?;
        }
        Ok(())
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.method.as_deref().unwrap_or("*")))
            .finish()
    }
}

/// Logs every call and its outcome at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn pre_call(&self, call: &mut OutgoingCall<'_>) -> Result<(), RpcError> {
        info!(rpc = call.rpc, metadata_entries = call.metadata.len(), "sending request");
        Ok(())
    }

    fn post_call(&self, reply: &mut IncomingReply<'_>) -> Result<(), RpcError> {
        info!(rpc = reply.rpc, "received response");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Interceptor for Recorder {
        fn pre_call(&self, call: &mut OutgoingCall<'_>) -> Result<(), RpcError> {
            self.log.lock().unwrap().push(format!("pre:{}", self.name));
            call.metadata.push("x-seen-by", self.name);
            Ok(())
        }

        fn post_call(&self, _reply: &mut IncomingReply<'_>) -> Result<(), RpcError> {
            self.log.lock().unwrap().push(format!("post:{}", self.name));
            Ok(())
        }
    }

    struct Uppercase;

    impl Interceptor for Uppercase {
        fn pre_call(&self, call: &mut OutgoingCall<'_>) -> Result<(), RpcError> {
            if let Some(name) = call.request_mut::<String>() {
                *name = name.to_uppercase();
            }
            Ok(())
        }
    }

    #[test]
    fn test_order_and_method_filter() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = InterceptorChain::new();
        chain.push(Arc::new(Recorder { name: "a", log: log.clone() }));
        chain.push_for("GetThing", Arc::new(Recorder { name: "b", log: log.clone() }));
        chain.push_for("ListThings", Arc::new(Recorder { name: "c", log: log.clone() }));

        let mut request = String::from("x");
        let mut metadata = Metadata::new();
        chain
            .run_pre(&mut OutgoingCall {
                rpc: "test.v1.Things/GetThing",
                request: &mut request,
                metadata: &mut metadata,
            })
            .unwrap();
        let mut response = 1u32;
        chain
            .run_post(&mut IncomingReply {
                rpc: "test.v1.Things/GetThing",
                response: &mut response,
            })
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["pre:a", "pre:b", "post:b", "post:a"]
        );
        assert_eq!(metadata.get_all("x-seen-by").collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_pre_call_rewrites_request() {
        let mut chain = InterceptorChain::new();
        chain.push(Arc::new(Uppercase));

        let mut request = String::from("dataset");
        let mut metadata = Metadata::new();
        chain
            .run_pre(&mut OutgoingCall {
                rpc: "svc/M",
                request: &mut request,
                metadata: &mut metadata,
            })
            .unwrap();
        assert_eq!(request, "DATASET");
    }
}
