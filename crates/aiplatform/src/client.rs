//! State shared by the service clients.

use std::sync::{Arc, OnceLock};

use gax::errors::RpcError;
use gax::executor::Executor;
use gax::longrunning::Operation;
use gax::lro::{OperationFuture, OperationPayload, PollPolicy};
use gax::transport::TransportKind;
use tracing::debug;

use crate::operations::OperationsServiceClient;

/// Owns the executor of one service client.
///
/// The transport holds no reference back; dropping the last client handle
/// releases everything except operation handles still in use.
#[derive(Debug)]
pub(crate) struct ClientCore {
    executor: Executor,
    poll_policy: PollPolicy,
    operations: OnceLock<Arc<OperationsServiceClient>>,
}

impl ClientCore {
    pub(crate) fn new(executor: Executor, poll_policy: PollPolicy) -> Self {
        Self {
            executor,
            poll_policy,
            operations: OnceLock::new(),
        }
    }

    pub(crate) fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The operations sub-client; the same instance on every call.
    pub(crate) fn operations_client(&self) -> Arc<OperationsServiceClient> {
        self.operations
            .get_or_init(|| {
                debug!(service = self.executor.service().name, "creating operations client");
                Arc::new(OperationsServiceClient::new(&self.executor))
            })
            .clone()
    }

    /// Wraps the record an LRO-starting RPC returned.
    pub(crate) fn operation<R, M>(
        &self,
        operation: Operation,
    ) -> Result<OperationFuture<R, M>, RpcError>
    where
        R: OperationPayload,
        M: OperationPayload,
    {
        OperationFuture::new(
            self.operations_client(),
            operation,
            self.poll_policy.clone(),
        )
    }

    pub(crate) fn transport_kind(&self) -> TransportKind {
        self.executor.transport().kind()
    }

    pub(crate) fn host(&self) -> &str {
        self.executor.transport().host()
    }

    pub(crate) async fn close(&self) {
        self.executor.close().await;
    }
}

/// Operations methods shared by every service client. Expands inside an
/// `impl` block of a type with a `core: Arc<ClientCore>` field.
macro_rules! operations_methods {
    () => {
        /// The operations sub-client. Repeated calls return the same
        /// instance.
        pub fn operations_client(&self) -> std::sync::Arc<$crate::operations::OperationsServiceClient> {
            self.core.operations_client()
        }

        pub async fn get_operation(
            &self,
            name: &str,
            options: gax::call::CallOptions,
        ) -> Result<gax::longrunning::Operation, gax::errors::RpcError> {
            self.core.operations_client().get(name, options).await
        }

        pub async fn list_operations(
            &self,
            request: gax::longrunning::ListOperationsRequest,
            options: gax::call::CallOptions,
        ) -> Result<
            gax::pager::Pager<
                gax::longrunning::ListOperationsRequest,
                gax::longrunning::ListOperationsResponse,
            >,
            gax::errors::RpcError,
        > {
            self.core.operations_client().list(request, options).await
        }

        pub async fn cancel_operation(
            &self,
            name: &str,
            options: gax::call::CallOptions,
        ) -> Result<(), gax::errors::RpcError> {
            self.core.operations_client().cancel(name, options).await
        }

        pub async fn delete_operation(
            &self,
            name: &str,
            options: gax::call::CallOptions,
        ) -> Result<(), gax::errors::RpcError> {
            self.core.operations_client().delete(name, options).await
        }

        pub async fn wait_operation(
            &self,
            name: &str,
            timeout: Option<std::time::Duration>,
            options: gax::call::CallOptions,
        ) -> Result<gax::longrunning::Operation, gax::errors::RpcError> {
            self.core.operations_client().wait(name, timeout, options).await
        }

        /// Kind of transport the client was built with.
        pub fn transport_kind(&self) -> gax::transport::TransportKind {
            self.core.transport_kind()
        }

        /// Host the transport talks to.
        pub fn api_endpoint(&self) -> &str {
            self.core.host()
        }

        pub fn universe_domain(&self) -> &str {
            self.core.executor().universe_domain()
        }

        /// Cancels in-flight calls and releases the transport.
        ///
        /// Operation handles created by this client observe `Cancelled` on
        /// their next poll. Idempotent.
        pub async fn close(&self) {
            self.core.close().await;
        }

        pub fn is_closed(&self) -> bool {
            self.core.executor().is_closed()
        }
    };
}

pub(crate) use operations_methods;
