//! Binary-framed transport for service clients.
//!
//! Implements the `gax` [`Transport`](gax::transport::Transport) port with
//! tonic. Requests arrive already encoded as protobuf and replies are handed
//! back as raw bytes, so one transport serves every service without
//! generated stubs.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Depends on `gax` for the port and error types.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`transport`] | `GrpcTransport`, registry factory, metadata conversion |
//! | [`codec`] | Pass-through `tonic` codec over `Bytes` |
//! | [`status`] | Server status to `RpcError` mapping |

pub mod codec;
pub mod status;
pub mod transport;

pub use transport::{factory, register, GrpcTransport};
