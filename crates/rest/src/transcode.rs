//! Maps a request message onto its HTTP binding.
//!
//! The request's JSON form is split three ways:
//!
//! | Part | Source |
//! |------|--------|
//! | path | fields named by the path template's variables |
//! | body | `*` (everything left) or one named field |
//! | query | whatever neither the path nor the body consumed |
//!
//! Query keys are dotted lowerCamel paths; repeated fields repeat the key.

use gax::descriptor::{HttpRule, HttpVerb};
use gax::errors::RpcError;
use gax::fields;
use gax::path_template::PathTemplate;
use serde_json::Value;
use tracing::debug;

/// A request laid out for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub verb: HttpVerb,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

pub fn transcode(rule: &HttpRule, mut request: Value) -> Result<HttpCall, RpcError> {
    let template = PathTemplate::parse(rule.path)
        .map_err(|e| RpcError::invalid_argument(format!("bad HTTP path template: {e}")))?;

    let path = template.expand(|field| fields::lookup_string(&request, field))?;
    for field in template.fields() {
        fields::remove(&mut request, field);
    }

    let body = match rule.body {
        None => None,
        Some("*") => Some(std::mem::replace(&mut request, Value::Null)),
        Some(field) => Some(fields::remove(&mut request, field).unwrap_or(Value::Object(
            serde_json::Map::new(),
        ))),
    };

    let mut query = Vec::new();
    flatten_query("", &request, &mut query);

    Ok(HttpCall {
        verb: rule.verb,
        path,
        query,
        body,
    })
}

fn flatten_query(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_query(&key, child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                match scalar(item) {
                    Some(s) => out.push((prefix.to_string(), s)),
                    None => debug!(field = prefix, "dropping non-scalar repeated query field"),
                }
            }
        }
        other => {
            if let Some(s) = scalar(other) {
                out.push((prefix.to_string(), s));
            }
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
