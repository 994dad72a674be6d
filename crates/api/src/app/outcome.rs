//! Handler outcomes.
//!
//! Handlers return `Result<Outcome, Fault>`. An [`Outcome`] is either a
//! success (with an optional payload) or a *soft failure*: a failure the
//! handler reports by value instead of raising a [`Fault`](super::fault::Fault).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use super::envelope::Message;
use super::fault::is_truthy;
use super::normalize::Settled;

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Operation successful";
pub const DEFAULT_FAILURE_MESSAGE: &str = "Operation failed";

/// Keys that mark a handler value as already envelope-shaped.
const SHAPE_KEYS: [&str; 4] = ["status", "statusCode", "message", "data"];

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success {
        /// Overrides the status already set on the response.
        status_code: Option<StatusCode>,
        message: Option<Message>,
        /// `None` means "no payload"; `Some(Value::Null)` is a payload.
        data: Option<Value>,
    },
    SoftFailure {
        /// Defaults to 400 when absent.
        status_code: Option<StatusCode>,
        message: Option<Message>,
    },
}

impl Outcome {
    pub fn ok(data: Value) -> Self {
        Self::Success {
            status_code: None,
            message: None,
            data: Some(data),
        }
    }

    /// Success without a payload.
    pub fn empty() -> Self {
        Self::Success {
            status_code: None,
            message: None,
            data: None,
        }
    }

    pub fn soft_failure(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self::SoftFailure {
            status_code: Some(status_code),
            message: Some(Message::Text(message.into())),
        }
    }

    pub fn with_message(mut self, new: impl Into<String>) -> Self {
        match &mut self {
            Self::Success { message, .. } | Self::SoftFailure { message, .. } => {
                *message = Some(Message::Text(new.into()));
            }
        }
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        match &mut self {
            Self::Success { status_code, .. } | Self::SoftFailure { status_code, .. } => {
                *status_code = Some(status);
            }
        }
        self
    }

    /// Interpret a loosely shaped handler value.
    ///
    /// - `status: false` makes it a soft failure (own `statusCode`/`message`).
    /// - A `data` key is the payload, whatever its value.
    /// - Any of `status`/`statusCode`/`message` without `data`: no payload.
    /// - Anything else (a plain entity, array or scalar) is itself the payload.
    ///
    /// A string `message` is plain text; any other truthy `message` (a field
    /// map, a list) is kept verbatim. Invalid `statusCode` values and falsy
    /// messages are ignored.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = &value else {
            return Self::ok(value);
        };

        let status_code = map
            .get("statusCode")
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .and_then(|c| StatusCode::from_u16(c).ok());
        let message = map
            .get("message")
            .filter(|m| is_truthy(m))
            .map(|m| match m {
                Value::String(s) => Message::Text(s.clone()),
                other => Message::Structured(other.clone()),
            });

        if map.get("status") == Some(&Value::Bool(false)) {
            return Self::SoftFailure {
                status_code,
                message,
            };
        }

        if !SHAPE_KEYS.iter().any(|k| map.contains_key(*k)) {
            return Self::ok(value);
        }

        Self::Success {
            status_code,
            message,
            data: map.get("data").cloned(),
        }
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// Settled outcomes are stashed for the normalizer, which writes the body.
///
/// The response status set here (200, or whatever the handler wraps it
/// with) is the fallback status for successes.
impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let mut res = StatusCode::OK.into_response();
        res.extensions_mut().insert(Settled::Returned(self));
        res
    }
}
