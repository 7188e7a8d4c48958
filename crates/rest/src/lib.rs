//! HTTP/JSON transport for service clients.
//!
//! Implements the `gax` [`Transport`](gax::transport::Transport) port with
//! reqwest. Each call is transcoded onto the RPC's HTTP binding, sent as
//! JSON, and the reply handed back as a JSON value.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`transport`] | `RestTransport`, registry factory |
//! | [`transcode`] | Request to verb, path, query and body |
//! | [`error`] | HTTP status and JSON error payload mapping |

pub mod error;
pub mod transcode;
pub mod transport;

pub use transcode::{transcode, HttpCall};
pub use transport::{factory, register, RestTransport};
