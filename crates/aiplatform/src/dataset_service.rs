//! [`DatasetServiceClient`]: datasets and dataset versions.

use std::sync::Arc;

use gax::call::CallOptions;
use gax::errors::RpcError;
use gax::longrunning::Operation;
use gax::lro::OperationFuture;
use gax::pager::Pager;
use gax::wkt::Empty;

use crate::args::{
    CreateDatasetArgs, CreateDatasetVersionArgs, DeleteDatasetArgs, DeleteDatasetVersionArgs,
    GetDatasetArgs, GetDatasetVersionArgs, ListDatasetVersionsArgs, ListDatasetsArgs,
    UpdateDatasetArgs,
};
use crate::client::{operations_methods, ClientCore};
use crate::descriptors::{
    CREATE_DATASET, CREATE_DATASET_VERSION, DELETE_DATASET, DELETE_DATASET_VERSION, GET_DATASET,
    GET_DATASET_VERSION, LIST_DATASETS, LIST_DATASET_VERSIONS, UPDATE_DATASET,
};
use crate::model::{
    CreateDatasetOperationMetadata, CreateDatasetVersionOperationMetadata, Dataset,
    DatasetVersion, DeleteOperationMetadata, ListDatasetVersionsRequest,
    ListDatasetVersionsResponse, ListDatasetsRequest, ListDatasetsResponse,
};

/// Async client for the dataset service. Cheap to clone; clones share one
/// transport.
#[derive(Debug, Clone)]
pub struct DatasetServiceClient {
    core: Arc<ClientCore>,
}

impl DatasetServiceClient {
    pub(crate) fn from_core(core: ClientCore) -> Self {
        Self {
            core: Arc::new(core),
        }
    }

    /// Starts creating a dataset.
    pub async fn create_dataset(
        &self,
        args: impl Into<CreateDatasetArgs>,
        options: CallOptions,
    ) -> Result<OperationFuture<Dataset, CreateDatasetOperationMetadata>, RpcError> {
        let request = args.into().into_request();
        let operation: Operation = self
            .core
            .executor()
            .unary(&CREATE_DATASET, request, options)
            .await?;
        self.core.operation(operation)
    }

    pub async fn get_dataset(
        &self,
        args: impl Into<GetDatasetArgs>,
        options: CallOptions,
    ) -> Result<Dataset, RpcError> {
        let request = args.into().into_request();
        self.core
            .executor()
            .unary(&GET_DATASET, request, options)
            .await
    }

    /// Updates the fields of `dataset` named by the update mask.
    pub async fn update_dataset(
        &self,
        args: impl Into<UpdateDatasetArgs>,
        options: CallOptions,
    ) -> Result<Dataset, RpcError> {
        let request = args.into().into_request();
        self.core
            .executor()
            .unary(&UPDATE_DATASET, request, options)
            .await
    }

    pub async fn list_datasets(
        &self,
        args: impl Into<ListDatasetsArgs>,
        options: CallOptions,
    ) -> Result<Pager<ListDatasetsRequest, ListDatasetsResponse>, RpcError> {
        let request = args.into().into_request();
        self.core
            .executor()
            .paged(&LIST_DATASETS, request, options)
            .await
    }

    pub async fn delete_dataset(
        &self,
        args: impl Into<DeleteDatasetArgs>,
        options: CallOptions,
    ) -> Result<OperationFuture<Empty, DeleteOperationMetadata>, RpcError> {
        let request = args.into().into_request();
        let operation: Operation = self
            .core
            .executor()
            .unary(&DELETE_DATASET, request, options)
            .await?;
        self.core.operation(operation)
    }

    pub async fn create_dataset_version(
        &self,
        args: impl Into<CreateDatasetVersionArgs>,
        options: CallOptions,
    ) -> Result<OperationFuture<DatasetVersion, CreateDatasetVersionOperationMetadata>, RpcError>
    {
        let request = args.into().into_request();
        let operation: Operation = self
            .core
            .executor()
            .unary(&CREATE_DATASET_VERSION, request, options)
            .await?;
        self.core.operation(operation)
    }

    pub async fn get_dataset_version(
        &self,
        args: impl Into<GetDatasetVersionArgs>,
        options: CallOptions,
    ) -> Result<DatasetVersion, RpcError> {
        let request = args.into().into_request();
        self.core
            .executor()
            .unary(&GET_DATASET_VERSION, request, options)
            .await
    }

    pub async fn list_dataset_versions(
        &self,
        args: impl Into<ListDatasetVersionsArgs>,
        options: CallOptions,
    ) -> Result<Pager<ListDatasetVersionsRequest, ListDatasetVersionsResponse>, RpcError> {
        let request = args.into().into_request();
        self.core
            .executor()
            .paged(&LIST_DATASET_VERSIONS, request, options)
            .await
    }

    pub async fn delete_dataset_version(
        &self,
        args: impl Into<DeleteDatasetVersionArgs>,
        options: CallOptions,
    ) -> Result<OperationFuture<Empty, DeleteOperationMetadata>, RpcError> {
        let request = args.into().into_request();
        let operation: Operation = self
            .core
            .executor()
            .unary(&DELETE_DATASET_VERSION, request, options)
            .await?;
        self.core.operation(operation)
    }

    operations_methods!();
}
