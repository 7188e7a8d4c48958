//! [`PipelineServiceClient`]: training pipelines.

use std::sync::Arc;

use gax::call::CallOptions;
use gax::errors::RpcError;
use gax::longrunning::Operation;
use gax::lro::OperationFuture;
use gax::pager::Pager;
use gax::wkt::Empty;

use crate::args::{
    CancelTrainingPipelineArgs, CreateTrainingPipelineArgs, DeleteTrainingPipelineArgs,
    GetTrainingPipelineArgs, ListTrainingPipelinesArgs,
};
use crate::client::{operations_methods, ClientCore};
use crate::descriptors::{
    CANCEL_TRAINING_PIPELINE, CREATE_TRAINING_PIPELINE, DELETE_TRAINING_PIPELINE,
    GET_TRAINING_PIPELINE, LIST_TRAINING_PIPELINES,
};
use crate::model::{
    DeleteOperationMetadata, ListTrainingPipelinesRequest, ListTrainingPipelinesResponse,
    TrainingPipeline,
};

/// Async client for the pipeline service.
#[derive(Debug, Clone)]
pub struct PipelineServiceClient {
    core: Arc<ClientCore>,
}

impl PipelineServiceClient {
    pub(crate) fn from_core(core: ClientCore) -> Self {
        Self {
            core: Arc::new(core),
        }
    }

    /// Creates a pipeline; the server starts it immediately.
    pub async fn create_training_pipeline(
        &self,
        args: impl Into<CreateTrainingPipelineArgs>,
        options: CallOptions,
    ) -> Result<TrainingPipeline, RpcError> {
        let request = args.into().into_request();
        self.core
            .executor()
            .unary(&CREATE_TRAINING_PIPELINE, request, options)
            .await
    }

    pub async fn get_training_pipeline(
        &self,
        args: impl Into<GetTrainingPipelineArgs>,
        options: CallOptions,
    ) -> Result<TrainingPipeline, RpcError> {
        let request = args.into().into_request();
        self.core
            .executor()
            .unary(&GET_TRAINING_PIPELINE, request, options)
            .await
    }

    pub async fn list_training_pipelines(
        &self,
        args: impl Into<ListTrainingPipelinesArgs>,
        options: CallOptions,
    ) -> Result<Pager<ListTrainingPipelinesRequest, ListTrainingPipelinesResponse>, RpcError> {
        let request = args.into().into_request();
        self.core
            .executor()
            .paged(&LIST_TRAINING_PIPELINES, request, options)
            .await
    }

    pub async fn delete_training_pipeline(
        &self,
        args: impl Into<DeleteTrainingPipelineArgs>,
        options: CallOptions,
    ) -> Result<OperationFuture<Empty, DeleteOperationMetadata>, RpcError> {
        let request = args.into().into_request();
        let operation: Operation = self
            .core
            .executor()
            .unary(&DELETE_TRAINING_PIPELINE, request, options)
            .await?;
        self.core.operation(operation)
    }

    /// Requests cancellation. The pipeline moves to
    /// [`PipelineState::Cancelled`](crate::model::PipelineState::Cancelled)
    /// asynchronously; poll it with `get_training_pipeline`.
    pub async fn cancel_training_pipeline(
        &self,
        args: impl Into<CancelTrainingPipelineArgs>,
        options: CallOptions,
    ) -> Result<(), RpcError> {
        let request = args.into().into_request();
        let _: Empty = self
            .core
            .executor()
            .unary(&CANCEL_TRAINING_PIPELINE, request, options)
            .await?;
        Ok(())
    }

    operations_methods!();
}
