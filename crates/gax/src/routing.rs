//! The `x-goog-request-params` routing header.
//!
//! Lets the server dispatch a call from request fields without parsing the
//! body. Values are form-encoded with `/` left intact and joined as
//! `key1=value1&key2=value2`.

use serde_json::Value;
use url::form_urlencoded;

use crate::descriptor::RpcDescriptor;
use crate::errors::RpcError;
use crate::fields;
use crate::path_template::PathTemplate;

/// Metadata key carrying the routing parameters.
pub const REQUEST_PARAMS_HEADER: &str = "x-goog-request-params";

/// Computes the routing header value for `request`.
///
/// Returns `None` when the RPC declares no routing. When it does, the header
/// is always produced, with an empty value if every declared field is empty.
/// A later parameter with the same key replaces an earlier one.
pub fn routing_header(rpc: &RpcDescriptor, request: &Value) -> Result<Option<String>, RpcError> {
    if rpc.routing.is_empty() {
        return Ok(None);
    }

    let mut params: Vec<(String, String)> = Vec::new();
    for param in rpc.routing {
        let Some(value) = fields::lookup_string(request, param.field).filter(|v| !v.is_empty())
        else {
            continue;
        };

        let (key, value) = match param.pattern {
            None => (param.key.to_string(), value),
            Some(pattern) => {
                let template = PathTemplate::parse(pattern).map_err(|e| {
                    RpcError::invalid_argument(format!("bad routing pattern: {e}"))
                })?;
                match template.captures(&value).and_then(|c| c.into_iter().next()) {
                    Some(capture) => capture,
                    None => continue,
                }
            }
        };

        match params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => params.push((key, value)),
        }
    }

    Ok(Some(encode_params(&params)))
}

/// Form-encodes `params`, keeping `/` unescaped.
pub fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(raw: &str) -> String {
    // A literal '%' is always emitted as "%25", so "%2F" can only come from '/'.
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace("%2F", "/")
}
