//! Clients for the ML platform's dataset, training-pipeline and operations
//! services.
//!
//! Build clients with [`ClientBuilder`]. The async clients run on the
//! caller's tokio runtime over the `grpc_asyncio` or `rest` transport; the
//! blocking clients own a runtime and default to `grpc`.
//!
//! ```no_run
//! use aiplatform::args::ByParent;
//! use aiplatform::{CallOptions, ClientBuilder, ClientOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientBuilder::new(ClientOptions::default())
//!     .with_transport("rest")
//!     .build_dataset_service()?;
//! let mut pager = client
//!     .list_datasets(ByParent::new("projects/p/locations/us-central1"), CallOptions::default())
//!     .await?;
//! while let Some(dataset) = pager.next_item().await? {
//!     println!("{}", dataset.display_name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`model`] | Messages of the three services |
//! | [`descriptors`] | Static service and RPC descriptors |
//! | [`paths`] | Resource-name formatting and parsing |
//! | [`args`] | Request-or-flattened-fields call arguments |
//! | [`operations`] | `OperationsServiceClient` |
//! | [`dataset_service`] | `DatasetServiceClient` |
//! | [`pipeline_service`] | `PipelineServiceClient` |
//! | [`blocking`] | Blocking forms of both clients |
//! | [`builder`] | `ClientBuilder`, default transport registry |

pub mod args;
pub mod blocking;
pub mod builder;
mod client;
pub mod dataset_service;
pub mod descriptors;
pub mod model;
pub mod operations;
pub mod paths;
pub mod pipeline_service;

pub use blocking::{BlockingDatasetServiceClient, BlockingPipelineServiceClient};
pub use builder::{default_registry, ClientBuilder};
pub use dataset_service::DatasetServiceClient;
pub use operations::OperationsServiceClient;
pub use pipeline_service::PipelineServiceClient;

pub use gax::{
    CallOptions, ClientOptions, ConfigError, ErrorKind, OperationFuture, Pager, PollPolicy,
    RpcError,
};
