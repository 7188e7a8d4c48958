//! Adapters for the blocking regime.
//!
//! Blocking clients drive the same executor, pager and operation handle as
//! async clients, on a multi-thread runtime owned by the client. Each call
//! parks the calling thread until the runtime finishes it, so many threads
//! can share one client.
//!
//! Blocking methods must not be called from inside an async context.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{EnterGuard, Handle, Runtime};

use crate::errors::{ConfigError, RpcError};
use crate::identifiers::OperationName;
use crate::longrunning::Operation;
use crate::lro::{OperationFuture, OperationPayload};
use crate::pager::{PagedRequest, PagedResponse, Pager};

/// Shared multi-thread runtime backing blocking clients.
#[derive(Debug, Clone)]
pub struct BlockingRuntime {
    runtime: Arc<Runtime>,
}

impl BlockingRuntime {
    pub fn new() -> Result<Self, ConfigError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("gax-blocking")
            .enable_all()
            .build()
            .map_err(|e| ConfigError::Runtime {
                reason: e.to_string(),
            })?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Runs `future` to completion on the runtime, parking the caller.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Enters the runtime context, e.g. to build transports that spawn.
    pub fn enter(&self) -> EnterGuard<'_> {
        self.runtime.enter()
    }

    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }
}

// ---------------------------------------------------------------------------
// Pager
// ---------------------------------------------------------------------------

/// Blocking view of a [`Pager`]; iterates over items.
///
/// Shares the pager's state machine: after a failed fetch every further
/// pull yields the same error again, so `for` loops should stop on `Err`.
pub struct BlockingPager<Req, Resp: PagedResponse> {
    pager: Pager<Req, Resp>,
    runtime: BlockingRuntime,
}

impl<Req, Resp> BlockingPager<Req, Resp>
where
    Req: PagedRequest + Clone + Send + 'static,
    Resp: PagedResponse + Send + 'static,
    Resp::Item: Clone + Send + 'static,
{
    pub fn new(pager: Pager<Req, Resp>, runtime: BlockingRuntime) -> Self {
        Self { pager, runtime }
    }

    pub fn next_page(&mut self) -> Result<Option<&Resp>, RpcError> {
        let runtime = self.runtime.clone();
        runtime.block_on(self.pager.next_page())
    }

    /// Iterator over whole pages; a failed fetch is re-raised on every pull.
    pub fn pages(mut self) -> impl Iterator<Item = Result<Resp, RpcError>>
    where
        Resp: Clone,
    {
        std::iter::from_fn(move || self.next_page().map(|page| page.cloned()).transpose())
    }

    pub fn into_inner(self) -> Pager<Req, Resp> {
        self.pager
    }
}

impl<Req, Resp> Iterator for BlockingPager<Req, Resp>
where
    Req: PagedRequest + Clone + Send + 'static,
    Resp: PagedResponse + Send + 'static,
    Resp::Item: Clone + Send + 'static,
{
    type Item = Result<Resp::Item, RpcError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.pager.next_item()).transpose()
    }
}

impl<Req, Resp: PagedResponse> Deref for BlockingPager<Req, Resp> {
    type Target = Resp;

    fn deref(&self) -> &Resp {
        &self.pager
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Blocking view of an [`OperationFuture`].
pub struct BlockingOperation<R, M> {
    inner: OperationFuture<R, M>,
    runtime: BlockingRuntime,
}

impl<R: OperationPayload, M: OperationPayload> BlockingOperation<R, M> {
    pub fn new(inner: OperationFuture<R, M>, runtime: BlockingRuntime) -> Self {
        Self { inner, runtime }
    }

    pub fn operation_name(&self) -> &OperationName {
        self.inner.operation_name()
    }

    pub fn done(&self) -> bool {
        self.inner.done()
    }

    pub fn latest(&self) -> &Operation {
        self.inner.latest()
    }

    pub fn metadata(&self) -> Option<&M> {
        self.inner.metadata()
    }

    /// Callbacks receive the underlying handle.
    pub fn add_done_callback(
        &mut self,
        callback: impl FnOnce(&OperationFuture<R, M>) + Send + 'static,
    ) {
        self.inner.add_done_callback(callback);
    }

    pub fn poll(&mut self) -> Result<&Operation, RpcError> {
        let runtime = self.runtime.clone();
        runtime.block_on(self.inner.poll())
    }

    pub fn result(&mut self, timeout: Option<Duration>) -> Result<R, RpcError> {
        self.runtime.block_on(self.inner.result(timeout))
    }

    pub fn cancel(&mut self) -> Result<(), RpcError> {
        self.runtime.block_on(self.inner.cancel())
    }

    pub fn into_inner(self) -> OperationFuture<R, M> {
        self.inner
    }
}

impl<R, M> std::fmt::Debug for BlockingOperation<R, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BlockingOperation").field(&self.inner).finish()
    }
}
