//! Faults and the fault classifier.
//!
//! A [`Fault`] is what a handler (or extractor, or middleware) raises instead
//! of returning an [`Outcome`](super::outcome::Outcome). The
//! [`FaultClassifier`] turns it into a status code and an envelope message,
//! applying the configured [`DisclosurePolicy`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;

use userdesk_core::{DomainError, FieldViolation, ValidationErrors};
use userdesk_infra::{DisclosurePolicy, StoreError};

use super::envelope::Message;
use super::normalize::Settled;

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";
pub const GENERIC_ERROR: &str = "Internal server error";

/// Response payload of an HTTP fault.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultPayload {
    Message(String),
    Violations(ValidationErrors),
    /// Arbitrary JSON body; its `message` key (when present) is the message.
    Structured(Value),
}

/// A fault carrying its own HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFault {
    pub status: StatusCode,
    pub payload: Option<FaultPayload>,
}

impl core::fmt::Display for HttpFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.status)?;
        match &self.payload {
            Some(FaultPayload::Message(m)) => write!(f, ": {m}"),
            Some(FaultPayload::Violations(v)) => write!(f, ": {v}"),
            Some(FaultPayload::Structured(v)) => write!(f, ": {v}"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error("{0}")]
    Http(HttpFault),

    /// Anything without an HTTP meaning. The detail is for logs only.
    #[error("unclassified: {0}")]
    Unclassified(String),
}

impl Fault {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http(HttpFault {
            status,
            payload: Some(FaultPayload::Message(message.into())),
        })
    }

    pub fn structured(status: StatusCode, payload: Value) -> Self {
        Self::Http(HttpFault {
            status,
            payload: Some(FaultPayload::Structured(payload)),
        })
    }

    /// Fault for a bare status reported by the framework, with the status'
    /// canonical reason as message.
    pub fn from_status(status: StatusCode) -> Self {
        let payload = status
            .canonical_reason()
            .map(|r| FaultPayload::Message(r.to_owned()));
        Self::Http(HttpFault { status, payload })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::http(StatusCode::CONFLICT, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::http(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self::Http(HttpFault {
            status: StatusCode::BAD_REQUEST,
            payload: Some(FaultPayload::Violations(errors)),
        })
    }

    pub fn unclassified(detail: impl Into<String>) -> Self {
        Self::Unclassified(detail.into())
    }

    /// Status the fault would be rendered with under a verbose policy.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http(h) => h.status,
            Self::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for Fault {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}

impl From<DomainError> for Fault {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidId(msg) => Self::bad_request(msg),
        }
    }
}

impl From<StoreError> for Fault {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::conflict(msg),
            StoreError::Backend(msg) => Self::unclassified(msg),
        }
    }
}

/// Raised faults are stashed for the normalizer, which writes the body.
impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        let mut res = self.status().into_response();
        res.extensions_mut().insert(Settled::Raised(self));
        res
    }
}

/// Result of classifying a fault.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub status: StatusCode,
    pub message: Message,
}

/// Derives `(status, message)` from a fault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultClassifier {
    policy: DisclosurePolicy,
}

impl FaultClassifier {
    pub fn new(policy: DisclosurePolicy) -> Self {
        Self { policy }
    }

    /// Classification as presented to the client.
    pub fn classify(&self, fault: &Fault) -> Classified {
        self.disclose(Self::classify_detailed(fault))
    }

    /// Classification before the disclosure policy is applied.
    pub fn classify_detailed(fault: &Fault) -> Classified {
        match fault {
            Fault::Unclassified(_) => Classified {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: Message::text(UNEXPECTED_ERROR),
            },
            Fault::Http(h) => Classified {
                status: h.status,
                message: match &h.payload {
                    None => Message::text(UNEXPECTED_ERROR),
                    Some(FaultPayload::Message(m)) => Message::Text(m.clone()),
                    Some(FaultPayload::Violations(v)) => Message::Fields(v.to_field_messages()),
                    Some(FaultPayload::Structured(v)) => structured_message(v),
                },
            },
        }
    }

    pub fn disclose(&self, detailed: Classified) -> Classified {
        match self.policy {
            DisclosurePolicy::Verbose => detailed,
            DisclosurePolicy::Generic => Classified {
                status: detailed.status,
                message: Message::text(GENERIC_ERROR),
            },
            DisclosurePolicy::Masked => Classified {
                status: StatusCode::OK,
                message: Message::text(GENERIC_ERROR),
            },
        }
    }
}

/// Message of a structured payload.
///
/// An array of `{property, constraints}` records under `message` is folded
/// into a field map; records missing either key are skipped. Any other truthy
/// `message` is used verbatim, and a payload without one is used whole.
fn structured_message(payload: &Value) -> Message {
    let message = match payload {
        Value::Object(map) => map.get("message").filter(|m| is_truthy(m)),
        Value::String(s) => return Message::Text(s.clone()),
        _ => None,
    };

    match message {
        Some(Value::String(s)) => Message::Text(s.clone()),
        Some(Value::Array(items)) => {
            let records: Vec<FieldViolation> = items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect();
            if records.is_empty() {
                Message::Structured(Value::Array(items.clone()))
            } else {
                Message::Fields(records.into_iter().collect::<ValidationErrors>().to_field_messages())
            }
        }
        Some(other) => Message::Structured(other.clone()),
        None => Message::Structured(payload.clone()),
    }
}

/// JavaScript-style truthiness of a JSON value.
pub(super) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
