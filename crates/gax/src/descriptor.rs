//! Static descriptions of services and their RPCs.
//!
//! Service crates declare one [`ServiceDescriptor`] per service and one
//! [`RpcDescriptor`] per method as `static` items; the executor and the
//! transports read everything they need from these tables.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// HTTP verb of an HTTP/JSON binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// HTTP/JSON binding of an RPC.
#[derive(Debug, Clone, Copy)]
pub struct HttpRule {
    pub verb: HttpVerb,
    /// Path template, e.g. `/v1/{parent=projects/*/locations/*}/datasets`.
    pub path: &'static str,
    /// `Some("*")` sends every field not bound by the path as the body;
    /// `Some(field)` sends that one field; `None` sends no body.
    pub body: Option<&'static str>,
}

/// One contribution to the `x-goog-request-params` routing header.
#[derive(Debug, Clone, Copy)]
pub struct RoutingParam {
    /// Dotted request field path, e.g. `"dataset.name"`.
    pub field: &'static str,
    /// Header key. Ignored when `pattern` is set; the pattern's variable
    /// name is used instead.
    pub key: &'static str,
    /// Optional template with a single variable, e.g.
    /// `"{location=projects/*/locations/*}/**"`. When set, only the part of
    /// the field captured by the variable is sent.
    pub pattern: Option<&'static str>,
}

impl RoutingParam {
    /// Sends the whole field under its own path as key.
    pub const fn field(field: &'static str) -> Self {
        Self {
            field,
            key: field,
            pattern: None,
        }
    }
}

/// Retry class of an RPC; resolves to a [`RetryPolicy`] at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Never retried (non-idempotent mutations).
    None,
    /// Retried on transient failures.
    Transient,
}

impl RetryClass {
    pub fn policy(self) -> RetryPolicy {
        match self {
            Self::None => RetryPolicy::none(),
            Self::Transient => RetryPolicy::transient(),
        }
    }
}

/// Everything the runtime knows about one RPC.
#[derive(Debug)]
pub struct RpcDescriptor {
    /// Fully-qualified service name, e.g. `google.cloud.aiplatform.v1.DatasetService`.
    pub service: &'static str,
    /// Method name, e.g. `GetDataset`.
    pub method: &'static str,
    pub idempotent: bool,
    pub retry: RetryClass,
    pub default_timeout: Duration,
    /// Returns a page of items plus a continuation token.
    pub paginated: bool,
    /// Returns an operation record to be wrapped in an operation handle.
    pub long_running: bool,
    /// Routing-header recipe; empty when the RPC declares no routing.
    pub routing: &'static [RoutingParam],
    pub http: HttpRule,
}

impl RpcDescriptor {
    /// `service/method`, as used in logs and errors.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.service, self.method)
    }

    /// Path of the binary-framed call, `/service/method`.
    pub fn grpc_path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

/// Everything the runtime knows about one service.
#[derive(Debug)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    /// Default host in the default universe.
    pub default_host: &'static str,
    /// Host accepting mutually authenticated TLS.
    pub mtls_host: &'static str,
    /// Host template with a `{UNIVERSE_DOMAIN}` placeholder.
    pub endpoint_template: &'static str,
    pub default_port: u16,
    pub default_scopes: &'static [&'static str],
    pub rpcs: &'static [&'static RpcDescriptor],
}

impl ServiceDescriptor {
    /// Looks up an RPC by method name.
    pub fn rpc(&self, method: &str) -> Option<&'static RpcDescriptor> {
        self.rpcs.iter().copied().find(|r| r.method == method)
    }

    /// Default host for `universe_domain`.
    pub fn endpoint_for_universe(&self, universe_domain: &str) -> String {
        self.endpoint_template
            .replace("{UNIVERSE_DOMAIN}", universe_domain)
    }
}
