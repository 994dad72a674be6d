//! Request extractors that reject with [`Fault`]s, so bad input is rendered
//! like any other failure.

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::Value;

use userdesk_core::{UserId, Validate, ValidationErrors};

use super::fault::Fault;

/// JSON body that has been deserialized and validated.
///
/// Keys listed in [`Validate::TEXT_FIELDS`] holding a non-string value are
/// reported as `isString` violations next to the regular validation errors;
/// `null` counts as absent.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Fault;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        let mistyped = take_mistyped(&mut body, T::TEXT_FIELDS);

        let value: T =
            serde_json::from_value(body).map_err(|e| Fault::bad_request(e.to_string()))?;

        let found = value.validate().err().unwrap_or_default();
        if mistyped.is_empty() {
            found.into_result()?;
            return Ok(Self(value));
        }

        let mut errors: ValidationErrors = found
            .iter()
            .filter(|v| !mistyped.iter().any(|f| *f == v.property))
            .cloned()
            .collect();
        for field in mistyped {
            errors.add(field, "isString", format!("{field} must be a string"));
        }
        Err(Fault::validation(errors))
    }
}

/// Strip `fields` that are not strings from a JSON object, returning the ones
/// that held some other non-null value.
fn take_mistyped(body: &mut Value, fields: &[&'static str]) -> Vec<&'static str> {
    let Value::Object(map) = body else {
        return Vec::new();
    };
    let mut mistyped = Vec::new();
    for &field in fields {
        match map.get(field) {
            None | Some(Value::String(_)) => {}
            Some(Value::Null) => {
                map.remove(field);
            }
            Some(_) => {
                map.remove(field);
                mistyped.push(field);
            }
        }
    }
    mistyped
}

fn json_rejection(rejection: JsonRejection) -> Fault {
    match rejection {
        JsonRejection::MissingJsonContentType(r) => Fault::http(r.status(), r.body_text()),
        other => Fault::bad_request(other.body_text()),
    }
}

/// `:id` path segment parsed as a [`UserId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserIdPath(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for UserIdPath
where
    S: Send + Sync,
{
    type Rejection = Fault;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|r| Fault::bad_request(r.body_text()))?;
        raw.parse::<UserId>().map(Self).map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.add("id", "isUuid", "id must be a UUID");
            Fault::validation(errors)
        })
    }
}
