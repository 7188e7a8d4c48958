//! Static descriptors of the dataset, pipeline and operations services.
//!
//! Reads and deletes are idempotent and retried on transient failures;
//! creates, updates and cancels are not retried.

use std::time::Duration;

use gax::descriptor::{HttpRule, HttpVerb, RetryClass, RoutingParam, RpcDescriptor, ServiceDescriptor};

const DATASET: &str = "google.cloud.aiplatform.v1.DatasetService";
const PIPELINE: &str = "google.cloud.aiplatform.v1.PipelineService";
const OPERATIONS: &str = "google.longrunning.Operations";

const DEFAULT_HOST: &str = "aiplatform.googleapis.com";
const MTLS_HOST: &str = "aiplatform.mtls.googleapis.com";
const ENDPOINT_TEMPLATE: &str = "aiplatform.{UNIVERSE_DOMAIN}";

/// OAuth scope requested when the caller sets none.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(60);

const BY_NAME: &[RoutingParam] = &[RoutingParam::field("name")];
const BY_PARENT: &[RoutingParam] = &[RoutingParam::field("parent")];
const BY_DATASET_NAME: &[RoutingParam] = &[RoutingParam::field("dataset.name")];

// ---------------------------------------------------------------------------
// DatasetService
// ---------------------------------------------------------------------------

pub static CREATE_DATASET: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "CreateDataset",
    idempotent: false,
    retry: RetryClass::None,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: true,
    routing: BY_PARENT,
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/{parent=projects/*/locations/*}/datasets",
        body: Some("dataset"),
    },
};

pub static GET_DATASET: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "GetDataset",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{name=projects/*/locations/*/datasets/*}",
        body: None,
    },
};

pub static UPDATE_DATASET: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "UpdateDataset",
    idempotent: false,
    retry: RetryClass::None,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_DATASET_NAME,
    http: HttpRule {
        verb: HttpVerb::Patch,
        path: "/v1/{dataset.name=projects/*/locations/*/datasets/*}",
        body: Some("dataset"),
    },
};

pub static LIST_DATASETS: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "ListDatasets",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: true,
    long_running: false,
    routing: BY_PARENT,
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{parent=projects/*/locations/*}/datasets",
        body: None,
    },
};

pub static DELETE_DATASET: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "DeleteDataset",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: true,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Delete,
        path: "/v1/{name=projects/*/locations/*/datasets/*}",
        body: None,
    },
};

pub static CREATE_DATASET_VERSION: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "CreateDatasetVersion",
    idempotent: false,
    retry: RetryClass::None,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: true,
    routing: BY_PARENT,
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/{parent=projects/*/locations/*/datasets/*}/datasetVersions",
        body: Some("dataset_version"),
    },
};

pub static GET_DATASET_VERSION: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "GetDatasetVersion",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{name=projects/*/locations/*/datasets/*/datasetVersions/*}",
        body: None,
    },
};

pub static LIST_DATASET_VERSIONS: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "ListDatasetVersions",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: true,
    long_running: false,
    routing: BY_PARENT,
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{parent=projects/*/locations/*/datasets/*}/datasetVersions",
        body: None,
    },
};

pub static DELETE_DATASET_VERSION: RpcDescriptor = RpcDescriptor {
    service: DATASET,
    method: "DeleteDatasetVersion",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: true,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Delete,
        path: "/v1/{name=projects/*/locations/*/datasets/*/datasetVersions/*}",
        body: None,
    },
};

pub static DATASET_SERVICE: ServiceDescriptor = ServiceDescriptor {
    name: DATASET,
    default_host: DEFAULT_HOST,
    mtls_host: MTLS_HOST,
    endpoint_template: ENDPOINT_TEMPLATE,
    default_port: 443,
    default_scopes: &[CLOUD_PLATFORM_SCOPE],
    rpcs: &[
        &CREATE_DATASET,
        &GET_DATASET,
        &UPDATE_DATASET,
        &LIST_DATASETS,
        &DELETE_DATASET,
        &CREATE_DATASET_VERSION,
        &GET_DATASET_VERSION,
        &LIST_DATASET_VERSIONS,
        &DELETE_DATASET_VERSION,
    ],
};

// ---------------------------------------------------------------------------
// PipelineService
// ---------------------------------------------------------------------------

pub static CREATE_TRAINING_PIPELINE: RpcDescriptor = RpcDescriptor {
    service: PIPELINE,
    method: "CreateTrainingPipeline",
    idempotent: false,
    retry: RetryClass::None,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_PARENT,
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/{parent=projects/*/locations/*}/trainingPipelines",
        body: Some("training_pipeline"),
    },
};

pub static GET_TRAINING_PIPELINE: RpcDescriptor = RpcDescriptor {
    service: PIPELINE,
    method: "GetTrainingPipeline",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{name=projects/*/locations/*/trainingPipelines/*}",
        body: None,
    },
};

pub static LIST_TRAINING_PIPELINES: RpcDescriptor = RpcDescriptor {
    service: PIPELINE,
    method: "ListTrainingPipelines",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: true,
    long_running: false,
    routing: BY_PARENT,
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{parent=projects/*/locations/*}/trainingPipelines",
        body: None,
    },
};

pub static DELETE_TRAINING_PIPELINE: RpcDescriptor = RpcDescriptor {
    service: PIPELINE,
    method: "DeleteTrainingPipeline",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: true,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Delete,
        path: "/v1/{name=projects/*/locations/*/trainingPipelines/*}",
        body: None,
    },
};

pub static CANCEL_TRAINING_PIPELINE: RpcDescriptor = RpcDescriptor {
    service: PIPELINE,
    method: "CancelTrainingPipeline",
    idempotent: false,
    retry: RetryClass::None,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/{name=projects/*/locations/*/trainingPipelines/*}:cancel",
        body: Some("*"),
    },
};

pub static PIPELINE_SERVICE: ServiceDescriptor = ServiceDescriptor {
    name: PIPELINE,
    default_host: DEFAULT_HOST,
    mtls_host: MTLS_HOST,
    endpoint_template: ENDPOINT_TEMPLATE,
    default_port: 443,
    default_scopes: &[CLOUD_PLATFORM_SCOPE],
    rpcs: &[
        &CREATE_TRAINING_PIPELINE,
        &GET_TRAINING_PIPELINE,
        &LIST_TRAINING_PIPELINES,
        &DELETE_TRAINING_PIPELINE,
        &CANCEL_TRAINING_PIPELINE,
    ],
};

// ---------------------------------------------------------------------------
// google.longrunning.Operations
// ---------------------------------------------------------------------------

// Operations live under the location or under any resource within it.
pub static GET_OPERATION: RpcDescriptor = RpcDescriptor {
    service: OPERATIONS,
    method: "GetOperation",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{name=projects/*/locations/*/**}",
        body: None,
    },
};

pub static LIST_OPERATIONS: RpcDescriptor = RpcDescriptor {
    service: OPERATIONS,
    method: "ListOperations",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: true,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{name=projects/*/locations/*}/operations",
        body: None,
    },
};

pub static CANCEL_OPERATION: RpcDescriptor = RpcDescriptor {
    service: OPERATIONS,
    method: "CancelOperation",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/{name=projects/*/locations/*/**}:cancel",
        body: Some("*"),
    },
};

pub static DELETE_OPERATION: RpcDescriptor = RpcDescriptor {
    service: OPERATIONS,
    method: "DeleteOperation",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: READ_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Delete,
        path: "/v1/{name=projects/*/locations/*/**}",
        body: None,
    },
};

pub static WAIT_OPERATION: RpcDescriptor = RpcDescriptor {
    service: OPERATIONS,
    method: "WaitOperation",
    idempotent: true,
    retry: RetryClass::None,
    default_timeout: WRITE_TIMEOUT,
    paginated: false,
    long_running: false,
    routing: BY_NAME,
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/{name=projects/*/locations/*/**}:wait",
        body: Some("*"),
    },
};

pub static OPERATIONS_SERVICE: ServiceDescriptor = ServiceDescriptor {
    name: OPERATIONS,
    default_host: DEFAULT_HOST,
    mtls_host: MTLS_HOST,
    endpoint_template: ENDPOINT_TEMPLATE,
    default_port: 443,
    default_scopes: &[CLOUD_PLATFORM_SCOPE],
    rpcs: &[
        &GET_OPERATION,
        &LIST_OPERATIONS,
        &CANCEL_OPERATION,
        &DELETE_OPERATION,
        &WAIT_OPERATION,
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use gax::path_template::PathTemplate;

    #[test]
    fn test_http_paths_parse_and_bind_declared_fields() {
        for service in [&DATASET_SERVICE, &PIPELINE_SERVICE, &OPERATIONS_SERVICE] {
            for rpc in service.rpcs {
                let template = PathTemplate::parse(rpc.http.path)
                    .unwrap_or_else(|e| panic!("{}: {e}", rpc.full_name()));
                assert!(!template.fields().is_empty(), "{}", rpc.full_name());
                assert_eq!(rpc.service, service.name);
                assert_eq!(rpc.paginated, rpc.method.starts_with("List"));
            }
        }
    }

    #[test]
    fn test_operation_paths_cover_nested_resources() {
        let get = PathTemplate::parse(GET_OPERATION.http.path).unwrap();
        assert!(get.matches("/v1/projects/p/locations/l/operations/1"));
        assert!(get.matches("/v1/projects/p/locations/l/datasets/d/operations/1"));

        let cancel = PathTemplate::parse(CANCEL_OPERATION.http.path).unwrap();
        assert_eq!(
            cancel.captures("/v1/projects/p/locations/l/datasets/d/operations/7:cancel"),
            Some(vec![(
                "name".to_string(),
                "projects/p/locations/l/datasets/d/operations/7".to_string()
            )])
        );
    }

    #[test]
    fn test_lookup_by_method() {
        assert!(DATASET_SERVICE.rpc("UpdateDataset").is_some());
        assert!(PIPELINE_SERVICE.rpc("CreateDataset").is_none());
        assert_eq!(
            DATASET_SERVICE.endpoint_for_universe("example.com"),
            "aiplatform.example.com"
        );
    }
}
