//! Well-known message types shared by every service.
//!
//! [`Any`] is the one with real behaviour: an operation's `response` and
//! `metadata` arrive as protobuf bytes over the binary transport and as a
//! JSON object tagged with `@type` over HTTP/JSON. Both forms are kept as
//! received and decoded on demand by [`Any::unpack`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::{Buf, BufMut};
use chrono::{DateTime, SecondsFormat, Utc};
use prost::encoding::{self, DecodeContext, WireType};
use prost::{DecodeError, Message, Name};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{ErrorDetail, ErrorKind, RpcError};

/// Prefix of every type URL produced by [`Any::pack`].
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

// ---------------------------------------------------------------------------
// Any
// ---------------------------------------------------------------------------

/// Payload of an [`Any`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    /// Protobuf-encoded message bytes.
    Binary(Vec<u8>),
    /// JSON object of the message, without the `@type` key.
    Json(Map<String, Value>),
}

impl Default for AnyValue {
    fn default() -> Self {
        Self::Binary(Vec::new())
    }
}

/// A message of any type, identified by its type URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Any {
    pub type_url: String,
    pub value: AnyValue,
}

impl Any {
    /// Packs `message` in binary form.
    pub fn pack<T: Message + Name>(message: &T) -> Self {
        Self {
            type_url: format!("{TYPE_URL_PREFIX}{}", T::full_name()),
            value: AnyValue::Binary(message.encode_to_vec()),
        }
    }

    /// Packs `message` in JSON form, as an HTTP/JSON server would send it.
    pub fn pack_json<T: Serialize + Name>(message: &T) -> Result<Self, RpcError> {
        let value = serde_json::to_value(message)
            .map_err(|e| RpcError::serialization(format!("encoding {}: {e}", T::full_name())))?;
        let Value::Object(map) = value else {
            return Err(RpcError::serialization(format!(
                "{} does not encode as a JSON object",
                T::full_name()
            )));
        };
        Ok(Self {
            type_url: format!("{TYPE_URL_PREFIX}{}", T::full_name()),
            value: AnyValue::Json(map),
        })
    }

    /// Fully-qualified message name, i.e. the type URL after its last `/`.
    pub fn type_name(&self) -> &str {
        self.type_url
            .rsplit_once('/')
            .map_or(self.type_url.as_str(), |(_, name)| name)
    }

    pub fn is<T: Name>(&self) -> bool {
        self.type_name() == T::full_name()
    }

    /// Decodes the payload as `T`.
    ///
    /// Fails with [`ErrorKind::Serialization`] when the declared type is not
    /// `T` or the payload does not decode.
    pub fn unpack<T>(&self) -> Result<T, RpcError>
    where
        T: Message + Default + Name + DeserializeOwned,
    {
        if !self.is::<T>() {
            return Err(RpcError::serialization(format!(
                "expected payload of type {}, got '{}'",
                T::full_name(),
                self.type_url
            )));
        }
        match &self.value {
            AnyValue::Binary(bytes) => T::decode(bytes.as_slice())
                .map_err(|e| RpcError::serialization(format!("decoding {}: {e}", T::full_name()))),
            AnyValue::Json(map) => {
                if let Some(message) =
                    Self::opaque_json(map).and_then(|bytes| T::decode(bytes.as_slice()).ok())
                {
                    return Ok(message);
                }
                serde_json::from_value(Value::Object(map.clone())).map_err(|e| {
                    RpcError::serialization(format!("decoding {}: {e}", T::full_name()))
                })
            }
        }
    }

    // `{"value": "<base64>"}` is how a binary payload round-trips through JSON.
    fn opaque_json(map: &Map<String, Value>) -> Option<Vec<u8>> {
        if map.len() != 1 {
            return None;
        }
        let encoded = map.get("value")?.as_str()?;
        BASE64.decode(encoded).ok()
    }

    fn value_bytes(&self) -> Vec<u8> {
        match &self.value {
            AnyValue::Binary(bytes) => bytes.clone(),
            // JSON payloads re-encode as their JSON text.
            AnyValue::Json(map) => Value::Object(map.clone()).to_string().into_bytes(),
        }
    }
}

impl Message for Any {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if !self.type_url.is_empty() {
            encoding::string::encode(1, &self.type_url, buf);
        }
        let value = self.value_bytes();
        if !value.is_empty() {
            encoding::bytes::encode(2, &value, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => encoding::string::merge(wire_type, &mut self.type_url, buf, ctx),
            2 => {
                let mut bytes = Vec::new();
                encoding::bytes::merge(wire_type, &mut bytes, buf, ctx)?;
                self.value = AnyValue::Binary(bytes);
                Ok(())
            }
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.type_url.is_empty() {
            len += encoding::string::encoded_len(1, &self.type_url);
        }
        let value = self.value_bytes();
        if !value.is_empty() {
            len += encoding::bytes::encoded_len(2, &value);
        }
        len
    }

    fn clear(&mut self) {
        self.type_url.clear();
        self.value = AnyValue::default();
    }
}

impl Serialize for Any {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = Map::new();
        map.insert("@type".into(), Value::String(self.type_url.clone()));
        match &self.value {
            AnyValue::Binary(bytes) => {
                map.insert("value".into(), Value::String(BASE64.encode(bytes)));
            }
            AnyValue::Json(fields) => {
                map.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Any {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::deserialize(deserializer)?;
        let type_url = match map.remove("@type") {
            Some(Value::String(url)) => url,
            Some(_) => return Err(serde::de::Error::custom("'@type' must be a string")),
            None => return Err(serde::de::Error::missing_field("@type")),
        };
        Ok(Self {
            type_url,
            value: AnyValue::Json(map),
        })
    }
}

// ---------------------------------------------------------------------------
// Empty, FieldMask, Timestamp
// ---------------------------------------------------------------------------

/// A message with no fields.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
pub struct Empty {}

impl Name for Empty {
    const NAME: &'static str = "Empty";
    const PACKAGE: &'static str = "google.protobuf";

    fn type_url() -> String {
        format!("{TYPE_URL_PREFIX}{}", Self::full_name())
    }
}

/// Set of field paths targeted by an update.
///
/// Serialises in JSON as a single comma-joined string.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct FieldMask {
    #[prost(string, repeated, tag = "1")]
    pub paths: Vec<String>,
}

impl FieldMask {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Serialize for FieldMask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.paths.join(","))
    }
}

impl<'de> Deserialize<'de> for FieldMask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(Self::from_paths(
            joined.split(',').map(str::trim).filter(|p| !p.is_empty()),
        ))
    }
}

/// A point in time, serialised in JSON as RFC 3339.
#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Timestamp {
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, u32::try_from(self.nanos).ok()?)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanos: value.timestamp_subsec_nanos() as i32,
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let datetime = self
            .to_datetime()
            .ok_or_else(|| serde::ser::Error::custom("timestamp out of range"))?;
        serializer.serialize_str(&datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let parsed = DateTime::parse_from_rfc3339(&text).map_err(serde::de::Error::custom)?;
        Ok(parsed.with_timezone(&Utc).into())
    }
}

/// A span of time, serialised in JSON as decimal seconds with an `s` suffix.
#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct Duration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Self {
            seconds: i64::try_from(value.as_secs()).unwrap_or(i64::MAX),
            nanos: value.subsec_nanos() as i32,
        }
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = if self.nanos == 0 {
            format!("{}s", self.seconds)
        } else {
            let fraction = format!("{:09}", self.nanos.unsigned_abs());
            let sign = if self.seconds == 0 && self.nanos < 0 { "-" } else { "" };
            format!("{sign}{}.{}s", self.seconds, fraction.trim_end_matches('0'))
        };
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let number = text
            .strip_suffix('s')
            .ok_or_else(|| serde::de::Error::custom(format!("duration '{text}' lacks 's'")))?;
        let negative = number.starts_with('-');
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let seconds: i64 = whole.parse().map_err(serde::de::Error::custom)?;
        let mut nanos = 0i32;
        if !fraction.is_empty() {
            if fraction.len() > 9 {
                return Err(serde::de::Error::custom("duration has sub-nanosecond precision"));
            }
            let padded = format!("{fraction:0<9}");
            nanos = padded.parse().map_err(serde::de::Error::custom)?;
            if negative {
                nanos = -nanos;
            }
        }
        Ok(Self { seconds, nanos })
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Canonical error payload carried by a failed call or operation.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<Any>,
}

impl Name for Status {
    const NAME: &'static str = "Status";
    const PACKAGE: &'static str = "google.rpc";

    fn type_url() -> String {
        format!("{TYPE_URL_PREFIX}{}", Self::full_name())
    }
}

impl Status {
    /// Converts to an [`RpcError`] with the same code, message and details.
    pub fn to_error(&self) -> RpcError {
        let mut err = RpcError::new(ErrorKind::from_code(self.code), self.message.clone());
        for detail in error_details(&self.details) {
            err = err.with_detail(detail);
        }
        err
    }
}

/// Describes violations in a client request.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BadRequest {
    #[prost(message, repeated, tag = "1")]
    pub field_violations: Vec<FieldViolation>,
}

impl Name for BadRequest {
    const NAME: &'static str = "BadRequest";
    const PACKAGE: &'static str = "google.rpc";

    fn type_url() -> String {
        format!("{TYPE_URL_PREFIX}{}", Self::full_name())
    }
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldViolation {
    #[prost(string, tag = "1")]
    pub field: String,
    #[prost(string, tag = "2")]
    pub description: String,
}

/// Flattens status details into [`ErrorDetail`]s.
///
/// `BadRequest` payloads yield one detail per field violation; anything else
/// is kept as an opaque detail naming its type.
pub fn error_details(details: &[Any]) -> Vec<ErrorDetail> {
    let mut out = Vec::new();
    for detail in details {
        match detail.unpack::<BadRequest>() {
            Ok(bad_request) => {
                out.extend(bad_request.field_violations.into_iter().map(|v| ErrorDetail {
                    field: Some(v.field).filter(|f| !f.is_empty()),
                    description: v.description,
                    type_url: Some(detail.type_url.clone()),
                }));
            }
            Err(_) => out.push(ErrorDetail {
                field: None,
                description: String::new(),
                type_url: Some(detail.type_url.clone()),
            }),
        }
    }
    out
}
