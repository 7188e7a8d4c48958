//! Call arguments: a composed request or the method's flattened fields.
//!
//! Every client method takes `impl Into<XArgs>`, so callers pass either the
//! full request message or the small flattened struct for that method, never
//! both:
//!
//! ```compile_fail
//! use aiplatform::args::{ByName, GetDatasetArgs};
//! use aiplatform::model::GetDatasetRequest;
//!
//! let both: GetDatasetArgs = (GetDatasetRequest::default(), ByName::new("d")).into();
//! ```

use gax::wkt::FieldMask;

use crate::model::{
    CancelTrainingPipelineRequest, CreateDatasetRequest, CreateDatasetVersionRequest,
    CreateTrainingPipelineRequest, Dataset, DatasetVersion, DeleteDatasetRequest,
    DeleteDatasetVersionRequest, DeleteTrainingPipelineRequest, GetDatasetRequest,
    GetDatasetVersionRequest, GetTrainingPipelineRequest, ListDatasetVersionsRequest,
    ListDatasetsRequest, ListTrainingPipelinesRequest, TrainingPipeline, UpdateDatasetRequest,
};

/// Builds a request of type `R` from flattened fields.
pub trait FlattenedFields<R> {
    fn into_request(self) -> R;
}

/// Exactly one of the two argument shapes a method accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Args<R, F> {
    Request(R),
    Fields(F),
}

impl<R, F: FlattenedFields<R>> Args<R, F> {
    pub fn into_request(self) -> R {
        match self {
            Self::Request(request) => request,
            Self::Fields(fields) => fields.into_request(),
        }
    }
}

// ---------------------------------------------------------------------------
// Flattened field sets
// ---------------------------------------------------------------------------

/// The resource name, for methods flattened to `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByName(pub String);

impl ByName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// The parent resource name, for list methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByParent(pub String);

impl ByParent {
    pub fn new(parent: impl Into<String>) -> Self {
        Self(parent.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatasetFields {
    pub parent: String,
    pub dataset: Dataset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDatasetFields {
    pub dataset: Dataset,
    pub update_mask: FieldMask,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatasetVersionFields {
    pub parent: String,
    pub dataset_version: DatasetVersion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTrainingPipelineFields {
    pub parent: String,
    pub training_pipeline: TrainingPipeline,
}

macro_rules! by_name {
    ($($req:ident),+) => {
        $(
            impl FlattenedFields<$req> for ByName {
                fn into_request(self) -> $req {
                    $req {
                        name: self.0,
                        ..Default::default()
                    }
                }
            }
        )+
    };
}

macro_rules! by_parent {
    ($($req:ident),+) => {
        $(
            impl FlattenedFields<$req> for ByParent {
                fn into_request(self) -> $req {
                    $req {
                        parent: self.0,
                        ..Default::default()
                    }
                }
            }
        )+
    };
}

by_name!(
    GetDatasetRequest,
    DeleteDatasetRequest,
    GetDatasetVersionRequest,
    DeleteDatasetVersionRequest,
    GetTrainingPipelineRequest,
    DeleteTrainingPipelineRequest,
    CancelTrainingPipelineRequest
);

by_parent!(
    ListDatasetsRequest,
    ListDatasetVersionsRequest,
    ListTrainingPipelinesRequest
);

impl FlattenedFields<CreateDatasetRequest> for CreateDatasetFields {
    fn into_request(self) -> CreateDatasetRequest {
        CreateDatasetRequest {
            parent: self.parent,
            dataset: Some(self.dataset),
        }
    }
}

impl FlattenedFields<UpdateDatasetRequest> for UpdateDatasetFields {
    fn into_request(self) -> UpdateDatasetRequest {
        UpdateDatasetRequest {
            dataset: Some(self.dataset),
            update_mask: Some(self.update_mask),
        }
    }
}

impl FlattenedFields<CreateDatasetVersionRequest> for CreateDatasetVersionFields {
    fn into_request(self) -> CreateDatasetVersionRequest {
        CreateDatasetVersionRequest {
            parent: self.parent,
            dataset_version: Some(self.dataset_version),
        }
    }
}

impl FlattenedFields<CreateTrainingPipelineRequest> for CreateTrainingPipelineFields {
    fn into_request(self) -> CreateTrainingPipelineRequest {
        CreateTrainingPipelineRequest {
            parent: self.parent,
            training_pipeline: Some(self.training_pipeline),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-method argument types
// ---------------------------------------------------------------------------

// A blanket `From<F> for Args<R, F>` would overlap with `From<R>`, so the
// conversions are generated per method.
macro_rules! call_args {
    ($($alias:ident = $req:ty, $fields:ty;)+) => {
        $(
            pub type $alias = Args<$req, $fields>;

            impl From<$req> for Args<$req, $fields> {
                fn from(request: $req) -> Self {
                    Self::Request(request)
                }
            }

            impl From<$fields> for Args<$req, $fields> {
                fn from(fields: $fields) -> Self {
                    Self::Fields(fields)
                }
            }
        )+
    };
}

call_args! {
    CreateDatasetArgs = CreateDatasetRequest, CreateDatasetFields;
    GetDatasetArgs = GetDatasetRequest, ByName;
    UpdateDatasetArgs = UpdateDatasetRequest, UpdateDatasetFields;
    ListDatasetsArgs = ListDatasetsRequest, ByParent;
    DeleteDatasetArgs = DeleteDatasetRequest, ByName;
    CreateDatasetVersionArgs = CreateDatasetVersionRequest, CreateDatasetVersionFields;
    GetDatasetVersionArgs = GetDatasetVersionRequest, ByName;
    ListDatasetVersionsArgs = ListDatasetVersionsRequest, ByParent;
    DeleteDatasetVersionArgs = DeleteDatasetVersionRequest, ByName;
    CreateTrainingPipelineArgs = CreateTrainingPipelineRequest, CreateTrainingPipelineFields;
    GetTrainingPipelineArgs = GetTrainingPipelineRequest, ByName;
    ListTrainingPipelinesArgs = ListTrainingPipelinesRequest, ByParent;
    DeleteTrainingPipelineArgs = DeleteTrainingPipelineRequest, ByName;
    CancelTrainingPipelineArgs = CancelTrainingPipelineRequest, ByName;
}
