//! Messages of the dataset and training-pipeline services.
//!
//! Every message carries both encodings: prost for the binary transport and
//! serde (lowerCamel JSON names) for HTTP/JSON. Unset optional messages are
//! left out of the JSON form.

use std::collections::HashMap;

use gax::pager::{PagedRequest, PagedResponse};
use gax::wkt::{FieldMask, Status, Timestamp, TYPE_URL_PREFIX};
use prost::{Message, Name};
use serde::{Deserialize, Serialize};

const PACKAGE: &str = "google.cloud.aiplatform.v1";

macro_rules! aiplatform_name {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl Name for $ty {
                const NAME: &'static str = stringify!($ty);
                const PACKAGE: &'static str = PACKAGE;

                fn type_url() -> String {
                    format!("{TYPE_URL_PREFIX}{}", Self::full_name())
                }
            }
        )+
    };
}

macro_rules! paged {
    ($req:ty => $resp:ty, $items:ident: $item:ty) => {
        impl PagedRequest for $req {
            fn page_token(&self) -> &str {
                &self.page_token
            }

            fn set_page_token(&mut self, token: String) {
                self.page_token = token;
            }
        }

        impl PagedResponse for $resp {
            type Item = $item;

            fn next_page_token(&self) -> &str {
                &self.next_page_token
            }

            fn items(&self) -> &[$item] {
                &self.$items
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// A collection of data items used to train models.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dataset {
    /// `projects/{project}/locations/{location}/datasets/{dataset}`; output only.
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub display_name: String,
    #[prost(string, tag = "16")]
    pub description: String,
    /// Schema of the dataset's metadata, as a Cloud Storage URI.
    #[prost(string, tag = "3")]
    pub metadata_schema_uri: String,
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Timestamp>,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<Timestamp>,
    /// Used for optimistic concurrency on update.
    #[prost(string, tag = "6")]
    pub etag: String,
    #[prost(map = "string, string", tag = "7")]
    pub labels: HashMap<String, String>,
}

/// A point-in-time snapshot of a dataset.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatasetVersion {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Timestamp>,
    #[prost(string, tag = "3")]
    pub etag: String,
    #[prost(string, tag = "4")]
    pub big_query_dataset_name: String,
    #[prost(message, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<Timestamp>,
    #[prost(string, tag = "7")]
    pub display_name: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateDatasetRequest {
    /// `projects/{project}/locations/{location}`
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Dataset>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetDatasetRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_mask: Option<FieldMask>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateDatasetRequest {
    /// The dataset to update; `dataset.name` selects it.
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Dataset>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<FieldMask>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListDatasetsRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(string, tag = "2")]
    pub filter: String,
    #[prost(int32, tag = "3")]
    pub page_size: i32,
    #[prost(string, tag = "4")]
    pub page_token: String,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_mask: Option<FieldMask>,
    #[prost(string, tag = "6")]
    pub order_by: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListDatasetsResponse {
    #[prost(message, repeated, tag = "1")]
    pub datasets: Vec<Dataset>,
    #[prost(string, tag = "2")]
    pub next_page_token: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteDatasetRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Dataset versions
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateDatasetVersionRequest {
    /// The dataset the version belongs to.
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_version: Option<DatasetVersion>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetDatasetVersionRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_mask: Option<FieldMask>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListDatasetVersionsRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(string, tag = "2")]
    pub filter: String,
    #[prost(int32, tag = "3")]
    pub page_size: i32,
    #[prost(string, tag = "4")]
    pub page_token: String,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_mask: Option<FieldMask>,
    #[prost(string, tag = "6")]
    pub order_by: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListDatasetVersionsResponse {
    #[prost(message, repeated, tag = "1")]
    pub dataset_versions: Vec<DatasetVersion>,
    #[prost(string, tag = "2")]
    pub next_page_token: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteDatasetVersionRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Operation metadata
// ---------------------------------------------------------------------------

/// Progress shared by every operation the services start.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenericOperationMetadata {
    /// Per-item failures of a partially successful batch.
    #[prost(message, repeated, tag = "1")]
    pub partial_failures: Vec<Status>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Timestamp>,
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<Timestamp>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateDatasetOperationMetadata {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_metadata: Option<GenericOperationMetadata>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateDatasetVersionOperationMetadata {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_metadata: Option<GenericOperationMetadata>,
}

/// Metadata of every delete operation.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteOperationMetadata {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_metadata: Option<GenericOperationMetadata>,
}

// ---------------------------------------------------------------------------
// Training pipelines
// ---------------------------------------------------------------------------

/// Lifecycle state of a training pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PipelineState {
    Unspecified = 0,
    Queued = 1,
    Pending = 2,
    Running = 3,
    Succeeded = 4,
    Failed = 5,
    Cancelling = 6,
    Cancelled = 7,
    Paused = 8,
}

impl PipelineState {
    /// Name used in the JSON encoding.
    pub fn as_str_name(self) -> &'static str {
        match self {
            Self::Unspecified => "PIPELINE_STATE_UNSPECIFIED",
            Self::Queued => "PIPELINE_STATE_QUEUED",
            Self::Pending => "PIPELINE_STATE_PENDING",
            Self::Running => "PIPELINE_STATE_RUNNING",
            Self::Succeeded => "PIPELINE_STATE_SUCCEEDED",
            Self::Failed => "PIPELINE_STATE_FAILED",
            Self::Cancelling => "PIPELINE_STATE_CANCELLING",
            Self::Cancelled => "PIPELINE_STATE_CANCELLED",
            Self::Paused => "PIPELINE_STATE_PAUSED",
        }
    }

    pub fn from_str_name(name: &str) -> Option<Self> {
        let state = match name {
            "PIPELINE_STATE_UNSPECIFIED" => Self::Unspecified,
            "PIPELINE_STATE_QUEUED" => Self::Queued,
            "PIPELINE_STATE_PENDING" => Self::Pending,
            "PIPELINE_STATE_RUNNING" => Self::Running,
            "PIPELINE_STATE_SUCCEEDED" => Self::Succeeded,
            "PIPELINE_STATE_FAILED" => Self::Failed,
            "PIPELINE_STATE_CANCELLING" => Self::Cancelling,
            "PIPELINE_STATE_CANCELLED" => Self::Cancelled,
            "PIPELINE_STATE_PAUSED" => Self::Paused,
            _ => return None,
        };
        Some(state)
    }

    /// No further transitions happen from this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// JSON form of the `state` field: the enum name, or the raw number when
/// the value is not a known state.
mod pipeline_state_json {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::PipelineState;

    pub fn serialize<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        match PipelineState::try_from(*value) {
            Ok(state) => serializer.serialize_str(state.as_str_name()),
            Err(_) => serializer.serialize_i32(*value),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i32),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(value),
            Raw::Name(name) => PipelineState::from_str_name(&name)
                .map(i32::from)
                .ok_or_else(|| D::Error::custom(format!("unknown pipeline state '{name}'"))),
        }
    }

    pub fn is_unspecified(value: &i32) -> bool {
        *value == PipelineState::Unspecified as i32
    }
}

/// Orchestrates the training of a model.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrainingPipeline {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub display_name: String,
    /// Schema URI of the training task.
    #[prost(string, tag = "4")]
    pub training_task_definition: String,
    #[prost(enumeration = "PipelineState", tag = "9")]
    #[serde(
        with = "pipeline_state_json",
        skip_serializing_if = "pipeline_state_json::is_unspecified"
    )]
    pub state: i32,
    /// Set once the pipeline has failed or been cancelled.
    #[prost(message, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[prost(message, optional, tag = "11")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Timestamp>,
    #[prost(message, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    #[prost(message, optional, tag = "13")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[prost(message, optional, tag = "14")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<Timestamp>,
    #[prost(map = "string, string", tag = "15")]
    pub labels: HashMap<String, String>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateTrainingPipelineRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_pipeline: Option<TrainingPipeline>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetTrainingPipelineRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListTrainingPipelinesRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(string, tag = "2")]
    pub filter: String,
    #[prost(int32, tag = "3")]
    pub page_size: i32,
    #[prost(string, tag = "4")]
    pub page_token: String,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_mask: Option<FieldMask>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListTrainingPipelinesResponse {
    #[prost(message, repeated, tag = "1")]
    pub training_pipelines: Vec<TrainingPipeline>,
    #[prost(string, tag = "2")]
    pub next_page_token: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteTrainingPipelineRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CancelTrainingPipelineRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

aiplatform_name!(
    Dataset,
    DatasetVersion,
    CreateDatasetRequest,
    GetDatasetRequest,
    UpdateDatasetRequest,
    ListDatasetsRequest,
    ListDatasetsResponse,
    DeleteDatasetRequest,
    CreateDatasetVersionRequest,
    GetDatasetVersionRequest,
    ListDatasetVersionsRequest,
    ListDatasetVersionsResponse,
    DeleteDatasetVersionRequest,
    GenericOperationMetadata,
    CreateDatasetOperationMetadata,
    CreateDatasetVersionOperationMetadata,
    DeleteOperationMetadata,
    TrainingPipeline,
    CreateTrainingPipelineRequest,
    GetTrainingPipelineRequest,
    ListTrainingPipelinesRequest,
    ListTrainingPipelinesResponse,
    DeleteTrainingPipelineRequest,
    CancelTrainingPipelineRequest,
);

paged!(ListDatasetsRequest => ListDatasetsResponse, datasets: Dataset);
paged!(ListDatasetVersionsRequest => ListDatasetVersionsResponse, dataset_versions: DatasetVersion);
paged!(ListTrainingPipelinesRequest => ListTrainingPipelinesResponse, training_pipelines: TrainingPipeline);
