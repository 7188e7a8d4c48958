//! Blocking service clients.
//!
//! Each wraps the async client and the [`BlockingRuntime`] it was built on.
//! Pagers and operation handles come back as their blocking views.

use std::sync::Arc;
use std::time::Duration;

use gax::blocking::{BlockingOperation, BlockingPager, BlockingRuntime};
use gax::call::CallOptions;
use gax::errors::RpcError;
use gax::longrunning::{ListOperationsRequest, ListOperationsResponse, Operation};
use gax::transport::TransportKind;
use gax::wkt::Empty;

use crate::args::{
    CancelTrainingPipelineArgs, CreateDatasetArgs, CreateDatasetVersionArgs,
    CreateTrainingPipelineArgs, DeleteDatasetArgs, DeleteDatasetVersionArgs,
    DeleteTrainingPipelineArgs, GetDatasetArgs, GetDatasetVersionArgs, GetTrainingPipelineArgs,
    ListDatasetVersionsArgs, ListDatasetsArgs, ListTrainingPipelinesArgs, UpdateDatasetArgs,
};
use crate::dataset_service::DatasetServiceClient;
use crate::model::{
    CreateDatasetOperationMetadata, CreateDatasetVersionOperationMetadata, Dataset,
    DatasetVersion, DeleteOperationMetadata, ListDatasetVersionsRequest,
    ListDatasetVersionsResponse, ListDatasetsRequest, ListDatasetsResponse,
    ListTrainingPipelinesRequest, ListTrainingPipelinesResponse, TrainingPipeline,
};
use crate::operations::OperationsServiceClient;
use crate::pipeline_service::PipelineServiceClient;

/// Blocking forms of the operations methods. Expands inside an `impl` block
/// of a type with `inner` and `runtime` fields.
macro_rules! blocking_operations_methods {
    () => {
        pub fn operations_client(&self) -> Arc<OperationsServiceClient> {
            self.inner.operations_client()
        }

        pub fn get_operation(
            &self,
            name: &str,
            options: CallOptions,
        ) -> Result<Operation, RpcError> {
            self.runtime.block_on(self.inner.get_operation(name, options))
        }

        pub fn list_operations(
            &self,
            request: ListOperationsRequest,
            options: CallOptions,
        ) -> Result<BlockingPager<ListOperationsRequest, ListOperationsResponse>, RpcError> {
            let pager = self
                .runtime
                .block_on(self.inner.list_operations(request, options))?;
            Ok(BlockingPager::new(pager, self.runtime.clone()))
        }

        pub fn cancel_operation(&self, name: &str, options: CallOptions) -> Result<(), RpcError> {
            self.runtime
                .block_on(self.inner.cancel_operation(name, options))
        }

        pub fn delete_operation(&self, name: &str, options: CallOptions) -> Result<(), RpcError> {
            self.runtime
                .block_on(self.inner.delete_operation(name, options))
        }

        pub fn wait_operation(
            &self,
            name: &str,
            timeout: Option<Duration>,
            options: CallOptions,
        ) -> Result<Operation, RpcError> {
            self.runtime
                .block_on(self.inner.wait_operation(name, timeout, options))
        }

        pub fn transport_kind(&self) -> TransportKind {
            self.inner.transport_kind()
        }

        pub fn api_endpoint(&self) -> &str {
            self.inner.api_endpoint()
        }

        pub fn universe_domain(&self) -> &str {
            self.inner.universe_domain()
        }

        pub fn close(&self) {
            self.runtime.block_on(self.inner.close());
        }

        pub fn is_closed(&self) -> bool {
            self.inner.is_closed()
        }
    };
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// Blocking client for the dataset service.
#[derive(Debug, Clone)]
pub struct BlockingDatasetServiceClient {
    inner: DatasetServiceClient,
    runtime: BlockingRuntime,
}

impl BlockingDatasetServiceClient {
    pub(crate) fn new(inner: DatasetServiceClient, runtime: BlockingRuntime) -> Self {
        Self { inner, runtime }
    }

    /// The async client underneath.
    pub fn as_async(&self) -> &DatasetServiceClient {
        &self.inner
    }

    pub fn create_dataset(
        &self,
        args: impl Into<CreateDatasetArgs>,
        options: CallOptions,
    ) -> Result<BlockingOperation<Dataset, CreateDatasetOperationMetadata>, RpcError> {
        let fut = self
            .runtime
            .block_on(self.inner.create_dataset(args, options))?;
        Ok(BlockingOperation::new(fut, self.runtime.clone()))
    }

    pub fn get_dataset(
        &self,
        args: impl Into<GetDatasetArgs>,
        options: CallOptions,
    ) -> Result<Dataset, RpcError> {
        self.runtime.block_on(self.inner.get_dataset(args, options))
    }

    pub fn update_dataset(
        &self,
        args: impl Into<UpdateDatasetArgs>,
        options: CallOptions,
    ) -> Result<Dataset, RpcError> {
        self.runtime
            .block_on(self.inner.update_dataset(args, options))
    }

    pub fn list_datasets(
        &self,
        args: impl Into<ListDatasetsArgs>,
        options: CallOptions,
    ) -> Result<BlockingPager<ListDatasetsRequest, ListDatasetsResponse>, RpcError> {
        let pager = self
            .runtime
            .block_on(self.inner.list_datasets(args, options))?;
        Ok(BlockingPager::new(pager, self.runtime.clone()))
    }

    pub fn delete_dataset(
        &self,
        args: impl Into<DeleteDatasetArgs>,
        options: CallOptions,
    ) -> Result<BlockingOperation<Empty, DeleteOperationMetadata>, RpcError> {
        let fut = self
            .runtime
            .block_on(self.inner.delete_dataset(args, options))?;
        Ok(BlockingOperation::new(fut, self.runtime.clone()))
    }

    pub fn create_dataset_version(
        &self,
        args: impl Into<CreateDatasetVersionArgs>,
        options: CallOptions,
    ) -> Result<BlockingOperation<DatasetVersion, CreateDatasetVersionOperationMetadata>, RpcError>
    {
        let fut = self
            .runtime
            .block_on(self.inner.create_dataset_version(args, options))?;
        Ok(BlockingOperation::new(fut, self.runtime.clone()))
    }

    pub fn get_dataset_version(
        &self,
        args: impl Into<GetDatasetVersionArgs>,
        options: CallOptions,
    ) -> Result<DatasetVersion, RpcError> {
        self.runtime
            .block_on(self.inner.get_dataset_version(args, options))
    }

    pub fn list_dataset_versions(
        &self,
        args: impl Into<ListDatasetVersionsArgs>,
        options: CallOptions,
    ) -> Result<BlockingPager<ListDatasetVersionsRequest, ListDatasetVersionsResponse>, RpcError>
    {
        let pager = self
            .runtime
            .block_on(self.inner.list_dataset_versions(args, options))?;
        Ok(BlockingPager::new(pager, self.runtime.clone()))
    }

    pub fn delete_dataset_version(
        &self,
        args: impl Into<DeleteDatasetVersionArgs>,
        options: CallOptions,
    ) -> Result<BlockingOperation<Empty, DeleteOperationMetadata>, RpcError> {
        let fut = self
            .runtime
            .block_on(self.inner.delete_dataset_version(args, options))?;
        Ok(BlockingOperation::new(fut, self.runtime.clone()))
    }

    blocking_operations_methods!();
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// Blocking client for the pipeline service.
#[derive(Debug, Clone)]
pub struct BlockingPipelineServiceClient {
    inner: PipelineServiceClient,
    runtime: BlockingRuntime,
}

impl BlockingPipelineServiceClient {
    pub(crate) fn new(inner: PipelineServiceClient, runtime: BlockingRuntime) -> Self {
        Self { inner, runtime }
    }

    pub fn as_async(&self) -> &PipelineServiceClient {
        &self.inner
    }

    pub fn create_training_pipeline(
        &self,
        args: impl Into<CreateTrainingPipelineArgs>,
        options: CallOptions,
    ) -> Result<TrainingPipeline, RpcError> {
        self.runtime
            .block_on(self.inner.create_training_pipeline(args, options))
    }

    pub fn get_training_pipeline(
        &self,
        args: impl Into<GetTrainingPipelineArgs>,
        options: CallOptions,
    ) -> Result<TrainingPipeline, RpcError> {
        self.runtime
            .block_on(self.inner.get_training_pipeline(args, options))
    }

    pub fn list_training_pipelines(
        &self,
        args: impl Into<ListTrainingPipelinesArgs>,
        options: CallOptions,
    ) -> Result<BlockingPager<ListTrainingPipelinesRequest, ListTrainingPipelinesResponse>, RpcError>
    {
        let pager = self
            .runtime
            .block_on(self.inner.list_training_pipelines(args, options))?;
        Ok(BlockingPager::new(pager, self.runtime.clone()))
    }

    pub fn delete_training_pipeline(
        &self,
        args: impl Into<DeleteTrainingPipelineArgs>,
        options: CallOptions,
    ) -> Result<BlockingOperation<Empty, DeleteOperationMetadata>, RpcError> {
        let fut = self
            .runtime
            .block_on(self.inner.delete_training_pipeline(args, options))?;
        Ok(BlockingOperation::new(fut, self.runtime.clone()))
    }

    pub fn cancel_training_pipeline(
        &self,
        args: impl Into<CancelTrainingPipelineArgs>,
        options: CallOptions,
    ) -> Result<(), RpcError> {
        self.runtime
            .block_on(self.inner.cancel_training_pipeline(args, options))
    }

    blocking_operations_methods!();
}
