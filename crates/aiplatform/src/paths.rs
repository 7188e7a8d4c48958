//! Resource-name helpers.
//!
//! Each `*_path` function formats a resource name from its parts; the
//! matching `parse_*` function recovers the parts. Formatting does not
//! validate: a part containing `/` yields a name its parser rejects.

use std::fmt;

use gax::path_template::{PathTemplate, TemplateError};
use thiserror::Error;

pub const PROJECT_TEMPLATE: &str = "projects/{project}";
pub const LOCATION_TEMPLATE: &str = "projects/{project}/locations/{location}";
pub const DATASET_TEMPLATE: &str = "projects/{project}/locations/{location}/datasets/{dataset}";
pub const DATASET_VERSION_TEMPLATE: &str =
    "projects/{project}/locations/{location}/datasets/{dataset}/datasetVersions/{dataset_version}";
pub const OPERATION_TEMPLATE: &str =
    "projects/{project}/locations/{location}/operations/{operation}";
pub const TRAINING_PIPELINE_TEMPLATE: &str =
    "projects/{project}/locations/{location}/trainingPipelines/{training_pipeline}";

/// A resource name that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceNameError {
    #[error("'{name}' does not match '{template}'")]
    Mismatch { name: String, template: &'static str },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Captures the variables of `template` from `name`, in template order.
fn capture(template: &'static str, name: &str) -> Result<Vec<String>, ResourceNameError> {
    let parsed = PathTemplate::parse(template)?;
    parsed
        .captures(name)
        .map(|pairs| pairs.into_iter().map(|(_, value)| value).collect())
        .ok_or_else(|| ResourceNameError::Mismatch {
            name: name.to_string(),
            template,
        })
}

// Generates the parsed-name struct, its Display, and its `parse_*` function.
macro_rules! resource_name {
    (
        $(#[$attr:meta])*
        $name:ident, $template:ident, $parse:ident { $($field:ident),+ }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            $(pub $field: String,)+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut rendered = $template.to_string();
                $(
                    rendered = rendered.replace(
                        concat!("{", stringify!($field), "}"),
                        &self.$field,
                    );
                )+
                f.write_str(&rendered)
            }
        }

        #[doc = concat!("Parses a [`", stringify!($name), "`].")]
        pub fn $parse(name: &str) -> Result<$name, ResourceNameError> {
            let mut parts = capture($template, name)?.into_iter();
            Ok($name {
                $($field: parts.next().unwrap_or_default(),)+
            })
        }
    };
}

resource_name! {
    /// `projects/{project}`
    ProjectName, PROJECT_TEMPLATE, parse_project_path { project }
}

resource_name! {
    /// `projects/{project}/locations/{location}`
    LocationName, LOCATION_TEMPLATE, parse_location_path { project, location }
}

resource_name! {
    /// `projects/{project}/locations/{location}/datasets/{dataset}`
    DatasetName, DATASET_TEMPLATE, parse_dataset_path { project, location, dataset }
}

resource_name! {
    /// `.../datasets/{dataset}/datasetVersions/{dataset_version}`
    DatasetVersionName, DATASET_VERSION_TEMPLATE, parse_dataset_version_path {
        project, location, dataset, dataset_version
    }
}

resource_name! {
    /// `projects/{project}/locations/{location}/operations/{operation}`
    OperationResourceName, OPERATION_TEMPLATE, parse_operation_path {
        project, location, operation
    }
}

resource_name! {
    /// `projects/{project}/locations/{location}/trainingPipelines/{training_pipeline}`
    TrainingPipelineName, TRAINING_PIPELINE_TEMPLATE, parse_training_pipeline_path {
        project, location, training_pipeline
    }
}

pub fn project_path(project: &str) -> String {
    format!("projects/{project}")
}

pub fn location_path(project: &str, location: &str) -> String {
    format!("projects/{project}/locations/{location}")
}

pub fn dataset_path(project: &str, location: &str, dataset: &str) -> String {
    format!("projects/{project}/locations/{location}/datasets/{dataset}")
}

pub fn dataset_version_path(
    project: &str,
    location: &str,
    dataset: &str,
    dataset_version: &str,
) -> String {
    format!(
        "projects/{project}/locations/{location}/datasets/{dataset}/datasetVersions/{dataset_version}"
    )
}

pub fn operation_path(project: &str, location: &str, operation: &str) -> String {
    format!("projects/{project}/locations/{location}/operations/{operation}")
}

pub fn training_pipeline_path(project: &str, location: &str, training_pipeline: &str) -> String {
    format!("projects/{project}/locations/{location}/trainingPipelines/{training_pipeline}")
}
