//! Client for `google.longrunning.Operations`.
//!
//! Each service client owns one, created on first use and shared with every
//! [`OperationFuture`](gax::OperationFuture) it hands out. It dispatches
//! through a sibling of the owning client's executor, so it uses the same
//! transport and credentials and is closed together with its owner.

use std::time::Duration;

use async_trait::async_trait;
use gax::call::CallOptions;
use gax::errors::RpcError;
use gax::executor::Executor;
use gax::longrunning::{
    CancelOperationRequest, DeleteOperationRequest, GetOperationRequest, ListOperationsRequest,
    ListOperationsResponse, Operation, WaitOperationRequest,
};
use gax::lro::OperationsClient;
use gax::pager::Pager;
use gax::wkt::Empty;

use crate::descriptors::{
    CANCEL_OPERATION, DELETE_OPERATION, GET_OPERATION, LIST_OPERATIONS, OPERATIONS_SERVICE,
    WAIT_OPERATION,
};

/// Headroom on top of a server-side wait before the call itself times out.
const WAIT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OperationsServiceClient {
    executor: Executor,
}

impl OperationsServiceClient {
    /// Builds the client over a sibling of `parent`.
    pub fn new(parent: &Executor) -> Self {
        Self {
            executor: parent.sibling(&OPERATIONS_SERVICE),
        }
    }

    pub async fn get(&self, name: &str, options: CallOptions) -> Result<Operation, RpcError> {
        let request = GetOperationRequest {
            name: name.to_string(),
        };
        self.executor.unary(&GET_OPERATION, request, options).await
    }

    /// Lists operations under `request.name`, paging lazily.
    pub async fn list(
        &self,
        request: ListOperationsRequest,
        options: CallOptions,
    ) -> Result<Pager<ListOperationsRequest, ListOperationsResponse>, RpcError> {
        self.executor.paged(&LIST_OPERATIONS, request, options).await
    }

    pub async fn cancel(&self, name: &str, options: CallOptions) -> Result<(), RpcError> {
        let request = CancelOperationRequest {
            name: name.to_string(),
        };
        let _: Empty = self.executor.unary(&CANCEL_OPERATION, request, options).await?;
        Ok(())
    }

    pub async fn delete(&self, name: &str, options: CallOptions) -> Result<(), RpcError> {
        let request = DeleteOperationRequest {
            name: name.to_string(),
        };
        let _: Empty = self.executor.unary(&DELETE_OPERATION, request, options).await?;
        Ok(())
    }

    /// Waits server-side until the operation is done or `timeout` elapses,
    /// then returns its latest state.
    ///
    /// Without an explicit call timeout, the call is allowed to run a little
    /// past `timeout`.
    pub async fn wait(
        &self,
        name: &str,
        timeout: Option<Duration>,
        options: CallOptions,
    ) -> Result<Operation, RpcError> {
        let options = match (timeout, options.timeout) {
            (Some(wait), None) => options.with_timeout(wait + WAIT_GRACE),
            _ => options,
        };
        let request = WaitOperationRequest {
            name: name.to_string(),
            timeout: timeout.map(Into::into),
        };
        self.executor.unary(&WAIT_OPERATION, request, options).await
    }

    pub fn is_closed(&self) -> bool {
        self.executor.is_closed()
    }
}

#[async_trait]
impl OperationsClient for OperationsServiceClient {
    async fn get_operation(&self, name: &str) -> Result<Operation, RpcError> {
        self.get(name, CallOptions::default()).await
    }

    async fn cancel_operation(&self, name: &str) -> Result<(), RpcError> {
        self.cancel(name, CallOptions::default()).await
    }

    async fn delete_operation(&self, name: &str) -> Result<(), RpcError> {
        self.delete(name, CallOptions::default()).await
    }

    /// One page; use [`OperationsServiceClient::list`] to iterate.
    async fn list_operations(
        &self,
        request: ListOperationsRequest,
    ) -> Result<ListOperationsResponse, RpcError> {
        self.executor
            .unary(&LIST_OPERATIONS, request, CallOptions::default())
            .await
    }

    async fn wait_operation(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<Operation, RpcError> {
        self.wait(name, timeout, CallOptions::default()).await
    }
}
