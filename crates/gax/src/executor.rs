//! The call executor: the single path every RPC takes.
//!
//! For each call, in order:
//!
//! 1. refuse if the client is closed;
//! 2. compute the absolute deadline and retry policy;
//! 3. validate the universe domain (once, before any I/O);
//! 4. run interceptor pre hooks;
//! 5. append the routing header;
//! 6. per attempt, add static and credential headers and hand the call to
//!    the transport, retrying per policy;
//! 7. decode the reply and run interceptor post hooks.
//!
//! Closing the executor cancels every in-flight call with
//! [`ErrorKind::Cancelled`](crate::errors::ErrorKind::Cancelled).

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::call::{CallOptions, Deadline, Metadata, RequestEnvelope};
use crate::credentials::{AuthContext, Credentials, UniverseCheck};
use crate::descriptor::{RpcDescriptor, ServiceDescriptor};
use crate::errors::{ErrorKind, RpcError};
use crate::identifiers::InvocationId;
use crate::interceptor::{IncomingReply, InterceptorChain, OutgoingCall};
use crate::options::ClientInfo;
use crate::pager::{PageFetcher, PagedRequest, PagedResponse, Pager};
use crate::retry::retry_call;
use crate::routing::{routing_header, REQUEST_PARAMS_HEADER};
use crate::transport::{OutboundCall, Transport, WireMessage};

/// Response types the executor can decode.
pub trait ResponseMessage: prost::Message + Default + DeserializeOwned + Send + 'static {}

impl<T> ResponseMessage for T where T: prost::Message + Default + DeserializeOwned + Send + 'static {}

/// Request types the executor can dispatch.
pub trait RequestMessage: WireMessage + Any + Send + Sync + 'static {}

impl<T> RequestMessage for T where T: WireMessage + Any + Send + Sync + 'static {}

/// Inputs to [`Executor::new`].
pub struct ExecutorConfig {
    pub service: &'static ServiceDescriptor,
    pub transport: Arc<dyn Transport>,
    pub credentials: Arc<dyn Credentials>,
    /// Universe domain the client was configured for.
    pub universe_domain: String,
    pub auth: AuthContext,
    pub interceptors: InterceptorChain,
    pub client_info: ClientInfo,
    /// Overrides the credentials' own quota project.
    pub quota_project_id: Option<String>,
}

struct Inner {
    service: &'static ServiceDescriptor,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn Credentials>,
    universe: UniverseCheck,
    auth: AuthContext,
    interceptors: InterceptorChain,
    static_headers: Metadata,
    shutdown: CancellationToken,
}

/// Dispatches RPCs through a transport. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("service", &self.inner.service.name)
            .field("transport", &self.inner.transport)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        let mut static_headers = Metadata::new();
        static_headers.push("x-goog-api-client", config.client_info.api_client_header());
        let quota_project = config
            .quota_project_id
            .or_else(|| config.credentials.quota_project_id().map(str::to_string));
        if let Some(project) = quota_project {
            static_headers.push("x-goog-user-project", project);
        }

        Self {
            inner: Arc::new(Inner {
                service: config.service,
                transport: config.transport,
                credentials: config.credentials,
                universe: UniverseCheck::new(config.universe_domain),
                auth: config.auth,
                interceptors: config.interceptors,
                static_headers,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// An executor for another service reached over the same transport.
    ///
    /// Shares credentials, interceptors and headers. Closing `self` also
    /// closes the sibling.
    pub fn sibling(&self, service: &'static ServiceDescriptor) -> Self {
        let inner = &*self.inner;
        Self {
            inner: Arc::new(Inner {
                service,
                transport: inner.transport.clone(),
                credentials: inner.credentials.clone(),
                universe: UniverseCheck::new(inner.universe.client_universe()),
                auth: inner.auth.clone(),
                interceptors: inner.interceptors.clone(),
                static_headers: inner.static_headers.clone(),
                shutdown: inner.shutdown.child_token(),
            }),
        }
    }

    pub fn service(&self) -> &'static ServiceDescriptor {
        self.inner.service
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn credentials(&self) -> &Arc<dyn Credentials> {
        &self.inner.credentials
    }

    pub fn universe_domain(&self) -> &str {
        self.inner.universe.client_universe()
    }

    /// Whether the universe domain has been validated by a call.
    pub fn universe_validated(&self) -> bool {
        self.inner.universe.is_validated()
    }

    /// Builds the envelope for one logical call.
    pub fn envelope<M>(
        &self,
        rpc: &'static RpcDescriptor,
        message: M,
        options: CallOptions,
    ) -> RequestEnvelope<M> {
        let retry = options.retry.unwrap_or_else(|| rpc.retry.policy());
        let timeout = match options.timeout {
            Some(timeout) => timeout,
            None => retry
                .total_timeout
                .map_or(rpc.default_timeout, |total| total.min(rpc.default_timeout)),
        };
        RequestEnvelope {
            message,
            metadata: options.metadata,
            deadline: Deadline::after(timeout),
            retry,
        }
    }

    /// Issues a unary call and decodes the response.
    pub async fn unary<Req, Resp>(
        &self,
        rpc: &'static RpcDescriptor,
        request: Req,
        options: CallOptions,
    ) -> Result<Resp, RpcError>
    where
        Req: RequestMessage,
        Resp: ResponseMessage,
    {
        let name = rpc.full_name();
        if self.is_closed() {
            return Err(RpcError::cancelled("the client has been closed").with_rpc(name));
        }
        let envelope = self.envelope(rpc, request, options);
        self.dispatch(rpc, envelope)
            .await
            .map_err(|err| err.with_rpc(name))
    }

    async fn dispatch<Req, Resp>(
        &self,
        rpc: &'static RpcDescriptor,
        envelope: RequestEnvelope<Req>,
    ) -> Result<Resp, RpcError>
    where
        Req: RequestMessage,
        Resp: ResponseMessage,
    {
        let inner = &*self.inner;
        let name = rpc.full_name();
        let RequestEnvelope {
            message: mut request,
            mut metadata,
            deadline,
            retry,
        } = envelope;

        inner.universe.validate(inner.credentials.as_ref())?;

        inner.interceptors.run_pre(&mut OutgoingCall {
            rpc: &name,
            request: &mut request,
            metadata: &mut metadata,
        })?;

        let routing = routing_header(rpc, &request.to_json()?)?;
        if let Some(value) = &routing {
            metadata.push(REQUEST_PARAMS_HEADER, value.clone());
        }

        let span = info_span!(
            "rpc",
            rpc = %name,
            routing = routing.as_deref().unwrap_or(""),
            invocation_id = %InvocationId::new_random(),
        );

        let request_ref: &Req = &request;
        let metadata_ref = &metadata;
        let send_attempt = move |attempt: u32| async move {
            let mut md = metadata_ref.clone();
            md.extend(&inner.static_headers);
            md.extend(&inner.credentials.headers(&inner.auth).await?);
            debug!(attempt, remaining_ms = deadline.remaining().as_millis() as u64, "dispatching");
            inner
                .transport
                .call(
                    rpc,
                    OutboundCall {
                        request: request_ref,
                        metadata: &md,
                        deadline,
                    },
                )
                .await
        };

        let outcome = async {
            tokio::select! {
                reply = retry_call(&retry, deadline, &name, send_attempt) => reply,
                _ = inner.shutdown.cancelled() => {
                    Err(RpcError::cancelled("the client was closed during the call"))
                }
            }
        }
        .instrument(span.clone())
        .await;

        let reply = match outcome {
            Ok(reply) => reply,
            Err(err) => {
                let _entered = span.enter();
                if err.kind == ErrorKind::Cancelled {
                    debug!(kind = %err.kind, attempts = err.attempts, "call cancelled");
                } else {
                    warn!(kind = %err.kind, attempts = err.attempts, error = %err.message, "call failed");
                }
                return Err(err);
            }
        };

        let mut response: Resp = reply.decode()?;
        inner.interceptors.run_post(&mut IncomingReply {
            rpc: &name,
            response: &mut response,
        })?;
        Ok(response)
    }

    /// Spawns a unary call on the current runtime; the returned handle can
    /// cancel it.
    pub fn spawn_unary<Req, Resp>(
        &self,
        rpc: &'static RpcDescriptor,
        request: Req,
        options: CallOptions,
    ) -> CallHandle<Resp>
    where
        Req: RequestMessage,
        Resp: ResponseMessage,
    {
        let token = self.inner.shutdown.child_token();
        let cancelled = token.clone();
        let executor = self.clone();
        let join = tokio::spawn(async move {
            tokio::select! {
                result = executor.unary(rpc, request, options) => result,
                _ = cancelled.cancelled() => {
                    Err(RpcError::cancelled("the call was cancelled").with_rpc(rpc.full_name()))
                }
            }
        });
        CallHandle { token, join }
    }

    /// Binds a list RPC into a [`PageFetcher`] for follow-up pages.
    pub fn page_fetcher<Req, Resp>(
        &self,
        rpc: &'static RpcDescriptor,
        options: CallOptions,
    ) -> PageFetcher<Req, Resp>
    where
        Req: RequestMessage,
        Resp: ResponseMessage,
    {
        let executor = self.clone();
        Arc::new(move |request: Req, metadata: Metadata| {
            let executor = executor.clone();
            let options = CallOptions {
                metadata,
                ..options.clone()
            };
            async move { executor.unary(rpc, request, options).await }.boxed()
        })
    }

    /// Issues the first call of a list RPC and wraps it in a [`Pager`].
    pub async fn paged<Req, Resp>(
        &self,
        rpc: &'static RpcDescriptor,
        request: Req,
        options: CallOptions,
    ) -> Result<Pager<Req, Resp>, RpcError>
    where
        Req: RequestMessage + PagedRequest + Clone,
        Resp: ResponseMessage + PagedResponse,
        Resp::Item: Clone + Send + 'static,
    {
        let first = self.unary(rpc, request.clone(), options.clone()).await?;
        let metadata = options.metadata.clone();
        Ok(Pager::new(
            self.page_fetcher(rpc, options),
            request,
            first,
            metadata,
        ))
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Cancels in-flight calls and closes the transport. Idempotent.
    pub async fn close(&self) {
        if self.is_closed() {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.transport.close().await;
        debug!(service = self.inner.service.name, "executor closed");
    }
}

/// Handle to a call started with [`Executor::spawn_unary`].
#[derive(Debug)]
pub struct CallHandle<T> {
    token: CancellationToken,
    join: JoinHandle<Result<T, RpcError>>,
}

impl<T> CallHandle<T> {
    /// Aborts the call; [`CallHandle::join`] then yields `Cancelled`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn join(self) -> Result<T, RpcError> {
        match self.join.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(RpcError::cancelled("the call task was aborted")),
            Err(err) => Err(RpcError::new(
                ErrorKind::Internal,
                format!("the call task panicked: {err}"),
            )),
        }
    }
}
