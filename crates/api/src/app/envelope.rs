//! The canonical response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use userdesk_core::FieldMessages;

use crate::context::RequestMeta;

/// `message` of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Text(String),
    /// Multi-field validation failure: field → violation messages.
    Fields(FieldMessages),
    /// Structured fault payload passed through verbatim.
    Structured(Value),
}

impl Message {
    pub fn text(message: impl Into<String>) -> Self {
        Self::Text(message.into())
    }
}

impl core::fmt::Display for Message {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Text(t) => f.write_str(t),
            Self::Fields(fields) => {
                let mut first = true;
                for (field, messages) in fields.iter() {
                    if !first {
                        f.write_str("; ")?;
                    }
                    first = false;
                    write!(f, "{field}: {}", messages.join(", "))?;
                }
                Ok(())
            }
            Self::Structured(v) => write!(f, "{v}"),
        }
    }
}

/// The single JSON shape every response is rendered into.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status: bool,
    #[serde(serialize_with = "serialize_status")]
    pub status_code: StatusCode,
    pub path: String,
    pub method: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub message: Message,
    /// Present only when the handler carried a payload (which may itself be
    /// `null` or empty).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn success(
        meta: &RequestMeta,
        status_code: StatusCode,
        message: Message,
        data: Option<Value>,
    ) -> Self {
        Self {
            status: true,
            status_code,
            path: meta.path().to_owned(),
            method: meta.method().to_owned(),
            timestamp: Utc::now(),
            message,
            data,
        }
    }

    /// Failure envelopes never carry `data`.
    pub fn failure(meta: &RequestMeta, status_code: StatusCode, message: Message) -> Self {
        Self {
            status: false,
            status_code,
            path: meta.path().to_owned(),
            method: meta.method().to_owned(),
            timestamp: Utc::now(),
            message,
            data: None,
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

fn serialize_status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

/// Millisecond precision with a `Z` suffix, e.g. `2024-05-01T12:00:00.000Z`.
fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
