//! Blocking clients from plain threads.

mod common;

use aiplatform::args::{ByName, ByParent};
use aiplatform::model::{Dataset, ListDatasetsResponse, PipelineState, TrainingPipeline};
use aiplatform::{CallOptions, ErrorKind};
use common::{builder, finished_operation, pending_operation, FakeTransport};

const PARENT: &str = "projects/p/locations/l";
const DATASET: &str = "projects/p/locations/l/datasets/d";
const OPERATION: &str = "projects/p/locations/l/operations/3";

fn dataset(name: &str) -> Dataset {
    Dataset {
        name: format!("{PARENT}/datasets/{name}"),
        display_name: name.into(),
        ..Default::default()
    }
}

#[test]
fn test_blocking_dataset_calls() {
    let fake = FakeTransport::new();
    fake.reply(&dataset("d"));
    fake.reply(&ListDatasetsResponse {
        datasets: vec![dataset("a")],
        next_page_token: "next".into(),
    });
    fake.reply(&ListDatasetsResponse {
        datasets: vec![dataset("b")],
        next_page_token: String::new(),
    });
    let client = builder(fake.clone())
        .build_blocking_dataset_service()
        .unwrap();

    let got = client
        .get_dataset(ByName::new(DATASET), CallOptions::default())
        .unwrap();
    assert_eq!(got.display_name, "d");

    let names: Vec<String> = client
        .list_datasets(ByParent::new(PARENT), CallOptions::default())
        .unwrap()
        .map(|item| item.unwrap().display_name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(fake.calls().len(), 3);
}

#[test]
fn test_blocking_operation_result() {
    let fake = FakeTransport::new();
    fake.reply(&pending_operation(OPERATION));
    fake.reply(&pending_operation(OPERATION));
    fake.reply(&finished_operation(OPERATION, &dataset("d")));
    let client = builder(fake.clone())
        .build_blocking_dataset_service()
        .unwrap();

    let mut operation = client
        .create_dataset(
            aiplatform::args::CreateDatasetFields {
                parent: PARENT.into(),
                dataset: Dataset::default(),
            },
            CallOptions::default(),
        )
        .unwrap();
    assert!(!operation.done());
    let created = operation.result(None).unwrap();
    assert_eq!(created.name, DATASET);
    assert!(operation.done());
    assert_eq!(fake.calls().len(), 3);
}

#[test]
fn test_blocking_client_is_shared_across_threads() {
    let fake = FakeTransport::new();
    for _ in 0..4 {
        let mut pipeline = TrainingPipeline {
            name: format!("{PARENT}/trainingPipelines/tp"),
            ..Default::default()
        };
        pipeline.set_state(PipelineState::Queued);
        fake.reply(&pipeline);
    }
    let client = builder(fake.clone())
        .build_blocking_pipeline_service()
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let client = &client;
            scope.spawn(move || {
                let pipeline = client
                    .get_training_pipeline(
                        ByName::new(format!("{PARENT}/trainingPipelines/tp")),
                        CallOptions::default(),
                    )
                    .unwrap();
                assert_eq!(pipeline.state(), PipelineState::Queued);
            });
        }
    });
    assert_eq!(fake.calls().len(), 4);
}

#[test]
fn test_blocking_close() {
    let fake = FakeTransport::new();
    let client = builder(fake.clone())
        .build_blocking_dataset_service()
        .unwrap();
    client.close();
    assert!(client.is_closed());
    assert!(fake.is_closed());

    let err = client
        .get_dataset(ByName::new(DATASET), CallOptions::default())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
}
