//! Client runtime shared by every generated service client.
//!
//! This crate owns everything a client needs between "the caller invoked a
//! method" and "bytes go on the wire": call envelopes, retries, routing
//! headers, credentials, endpoint resolution, interceptors, pagination and
//! long-running operations. Wire formats live behind the [`Transport`] port
//! and are implemented by the `grpc` and `rest` crates.
//!
//! ## Architectural Layer
//!
//! **Runtime core + port definitions.** No network I/O happens here.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`errors`] | `RpcError`, `ErrorKind`, `ConfigError`, retry classification |
//! | [`identifiers`] | Newtype identifiers (`OperationName`, `InvocationId`) |
//! | [`call`] | `Metadata`, `Deadline`, `CallOptions`, `RequestEnvelope` |
//! | [`retry`] | `RetryPolicy`, jittered backoff, the retry loop |
//! | [`descriptor`] | Static service and RPC descriptors |
//! | [`fields`] | Dotted field-path helpers over JSON values |
//! | [`path_template`] | Resource-name templates |
//! | [`routing`] | `x-goog-request-params` computation |
//! | [`wkt`] | `Any`, `Status`, `Timestamp`, `Duration`, `FieldMask`, `Empty` |
//! | [`longrunning`] | Operation messages |
//! | [`credentials`] | `Credentials` port, static token sources, universe check |
//! | [`options`] | `ClientOptions`, environment, endpoint/mTLS resolution |
//! | [`interceptor`] | Pre/post call hooks |
//! | [`transport`] | `Transport` port and `TransportRegistry` |
//! | [`executor`] | Drives one RPC through all of the above |
//! | [`pager`] | Pagination over list RPCs |
//! | [`lro`] | `OperationFuture` and the `OperationsClient` port |
//! | [`blocking`] | Blocking runtime, pager and operation adapters |

pub mod blocking;
pub mod call;
pub mod credentials;
pub mod descriptor;
pub mod errors;
pub mod executor;
pub mod fields;
pub mod identifiers;
pub mod interceptor;
pub mod longrunning;
pub mod lro;
pub mod options;
pub mod pager;
pub mod path_template;
pub mod retry;
pub mod routing;
pub mod transport;
pub mod wkt;

pub use call::{CallOptions, Deadline, Metadata, RequestEnvelope};
pub use credentials::{Credentials, CredentialsLoader, DEFAULT_UNIVERSE_DOMAIN};
pub use descriptor::{HttpRule, HttpVerb, RetryClass, RoutingParam, RpcDescriptor, ServiceDescriptor};
pub use errors::{ConfigError, ErrorDetail, ErrorKind, RetryDecision, RpcError};
pub use executor::{CallHandle, Executor, ExecutorConfig};
pub use identifiers::{InvocationId, OperationName};
pub use interceptor::{Interceptor, InterceptorChain};
pub use lro::{OperationFuture, OperationsClient, PollPolicy};
pub use options::{ClientInfo, ClientOptions, Environment, ResolvedEndpoint};
pub use pager::{PagedRequest, PagedResponse, Pager};
pub use retry::RetryPolicy;
pub use transport::{Transport, TransportConfig, TransportKind, TransportRegistry};
