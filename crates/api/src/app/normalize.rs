//! Outcome normalizer.
//!
//! Handlers, extractors and inner middleware never write response bodies:
//! they stash a [`Settled`] value in the response extensions. The
//! [`normalize`] middleware picks it up and renders exactly one
//! [`Envelope`], so the envelope's `statusCode` and the HTTP status always
//! agree.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::context::RequestMeta;

use super::envelope::{Envelope, Message};
use super::fault::{Fault, FaultClassifier};
use super::outcome::{DEFAULT_FAILURE_MESSAGE, DEFAULT_SUCCESS_MESSAGE, Outcome};

/// How a handler settled.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Returned(Outcome),
    Raised(Fault),
}

/// The real classification of a raised fault, attached to the rendered
/// response for logging. Unaffected by the disclosure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub status: StatusCode,
    pub message: String,
    /// Internal detail of unclassified faults.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeNormalizer {
    classifier: FaultClassifier,
}

impl OutcomeNormalizer {
    pub fn new(classifier: FaultClassifier) -> Self {
        Self { classifier }
    }

    /// Render a returned outcome. `current` is the status already set on the
    /// response.
    pub fn render_outcome(&self, meta: &RequestMeta, outcome: Outcome, current: StatusCode) -> Envelope {
        match outcome {
            Outcome::SoftFailure {
                status_code,
                message,
            } => Envelope::failure(
                meta,
                status_code.unwrap_or(StatusCode::BAD_REQUEST),
                message.unwrap_or_else(|| Message::text(DEFAULT_FAILURE_MESSAGE)),
            ),
            Outcome::Success {
                status_code,
                message,
                data,
            } => Envelope::success(
                meta,
                status_code.unwrap_or(current),
                message.unwrap_or_else(|| Message::text(DEFAULT_SUCCESS_MESSAGE)),
                data,
            ),
        }
    }

    /// Render a raised fault through the classifier.
    pub fn render_fault(&self, meta: &RequestMeta, fault: &Fault) -> Envelope {
        let classified = self.classifier.classify(fault);
        Envelope::failure(meta, classified.status, classified.message)
    }

    /// Render whatever the handler settled with; faults also yield a
    /// [`FaultReport`].
    pub fn render(
        &self,
        meta: &RequestMeta,
        settled: Settled,
        current: StatusCode,
    ) -> (Envelope, Option<FaultReport>) {
        match settled {
            Settled::Returned(outcome) => (self.render_outcome(meta, outcome, current), None),
            Settled::Raised(fault) => {
                let detailed = FaultClassifier::classify_detailed(&fault);
                let report = FaultReport {
                    status: detailed.status,
                    message: detailed.message.to_string(),
                    detail: match &fault {
                        Fault::Unclassified(detail) => Some(detail.clone()),
                        Fault::Http(_) => None,
                    },
                };
                let shown = self.classifier.disclose(detailed);
                (Envelope::failure(meta, shown.status, shown.message), Some(report))
            }
        }
    }
}

/// Middleware rendering every response into an envelope.
///
/// Responses without a stashed outcome are framework rejections (e.g. 405):
/// error statuses become faults, anything else passes through untouched.
pub async fn normalize(
    State(normalizer): State<OutcomeNormalizer>,
    req: Request,
    next: Next,
) -> Response {
    let meta = RequestMeta::from_request(&req);
    let mut response = next.run(req).await;
    let current = response.status();

    let settled = match response.extensions_mut().remove::<Settled>() {
        Some(settled) => settled,
        None if current.is_client_error() || current.is_server_error() => {
            Settled::Raised(Fault::from_status(current))
        }
        None => return response,
    };

    let (envelope, report) = normalizer.render(&meta, settled, current);
    let mut rendered = envelope.into_response();
    if let Some(report) = report {
        rendered.extensions_mut().insert(report);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use userdesk_core::ValidationErrors;
    use userdesk_infra::DisclosurePolicy;

    fn meta() -> RequestMeta {
        RequestMeta::new("GET", "/users/1")
    }

    fn verbose() -> OutcomeNormalizer {
        OutcomeNormalizer::new(FaultClassifier::new(DisclosurePolicy::Verbose))
    }

    fn body(envelope: &Envelope) -> Value {
        let mut v = serde_json::to_value(envelope).unwrap();
        v.as_object_mut().unwrap().remove("timestamp");
        v
    }

    #[test]
    fn plain_return_becomes_success_with_data() {
        let env = verbose().render_outcome(
            &meta(),
            Outcome::from_value(json!({"id": 1, "firstName": "John"})),
            StatusCode::OK,
        );
        assert_eq!(
            body(&env),
            json!({
                "status": true,
                "statusCode": 200,
                "path": "/users/1",
                "method": "GET",
                "message": "Operation successful",
                "data": {"id": 1, "firstName": "John"}
            })
        );
    }

    #[test]
    fn soft_failure_defaults_to_400() {
        let env = verbose().render_outcome(
            &meta(),
            Outcome::from_value(json!({"status": false, "message": "nope"})),
            StatusCode::OK,
        );
        assert!(!env.status);
        assert_eq!(env.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(env.message, Message::text("nope"));
        assert!(env.data.is_none());
    }

    #[test]
    fn structured_soft_failure_message_reaches_the_envelope() {
        let env = verbose().render_outcome(
            &meta(),
            Outcome::from_value(json!({
                "status": false,
                "statusCode": 422,
                "message": {"email": ["taken"]}
            })),
            StatusCode::OK,
        );
        assert_eq!(
            body(&env),
            json!({
                "status": false,
                "statusCode": 422,
                "path": "/users/1",
                "method": "GET",
                "message": {"email": ["taken"]}
            })
        );
    }

    #[test]
    fn structured_success_message_reaches_the_envelope() {
        let env = verbose().render_outcome(
            &meta(),
            Outcome::from_value(json!({"message": ["a", "b"], "data": 1})),
            StatusCode::OK,
        );
        let rendered = body(&env);
        assert_eq!(rendered["message"], json!(["a", "b"]));
        assert_eq!(rendered["data"], json!(1));
    }

    #[test]
    fn soft_failure_without_message_uses_default() {
        let env = verbose().render_outcome(
            &meta(),
            Outcome::SoftFailure {
                status_code: Some(StatusCode::NOT_FOUND),
                message: None,
            },
            StatusCode::OK,
        );
        assert_eq!(env.status_code, StatusCode::NOT_FOUND);
        assert_eq!(env.message, Message::text(DEFAULT_FAILURE_MESSAGE));
    }

    #[test]
    fn success_falls_back_to_current_status() {
        let env = verbose().render_outcome(&meta(), Outcome::empty(), StatusCode::CREATED);
        assert_eq!(env.status_code, StatusCode::CREATED);

        let env = verbose().render_outcome(
            &meta(),
            Outcome::empty().with_status(StatusCode::ACCEPTED),
            StatusCode::CREATED,
        );
        assert_eq!(env.status_code, StatusCode::ACCEPTED);
    }

    #[test]
    fn raised_not_found_renders_failure_without_data() {
        let (env, report) = verbose().render(
            &meta(),
            Settled::Raised(Fault::not_found("User with ID 5 not found")),
            StatusCode::NOT_FOUND,
        );
        assert_eq!(
            body(&env),
            json!({
                "status": false,
                "statusCode": 404,
                "path": "/users/1",
                "method": "GET",
                "message": "User with ID 5 not found"
            })
        );
        assert_eq!(report.unwrap().status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn masked_policy_hides_fault_but_report_keeps_it() {
        let normalizer = OutcomeNormalizer::new(FaultClassifier::new(DisclosurePolicy::Masked));
        let (env, report) = normalizer.render(
            &meta(),
            Settled::Raised(Fault::unclassified("db connection refused")),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        assert_eq!(env.status_code, StatusCode::OK);
        assert!(!env.status);
        assert_eq!(env.message, Message::text("Internal server error"));

        let report = report.unwrap();
        assert_eq!(report.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(report.detail.as_deref(), Some("db connection refused"));
    }

    #[test]
    fn masking_does_not_touch_soft_failures() {
        let normalizer = OutcomeNormalizer::new(FaultClassifier::new(DisclosurePolicy::Masked));
        let env = normalizer.render_outcome(
            &meta(),
            Outcome::soft_failure(StatusCode::NOT_FOUND, "User with ID 1 not found"),
            StatusCode::OK,
        );
        assert_eq!(env.status_code, StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_fault_renders_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "isEmail", "email must be an email");
        let env = verbose().render_fault(&meta(), &Fault::validation(errors));
        assert_eq!(
            body(&env)["message"],
            json!({"email": ["email must be an email"]})
        );
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z ]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map(
                    prop_oneof![
                        Just("status".to_string()),
                        Just("statusCode".to_string()),
                        Just("message".to_string()),
                        Just("data".to_string()),
                        "[a-z]{1,6}",
                    ],
                    inner,
                    0..4
                )
                .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn shaped_results_without_data_omit_data(
            message in "[a-zA-Z ]{0,16}",
            code in prop_oneof![Just(200u16), Just(201u16), Just(202u16)],
        ) {
            let value = json!({"status": true, "statusCode": code, "message": message});
            let env = verbose().render_outcome(&meta(), Outcome::from_value(value), StatusCode::OK);
            let rendered = serde_json::to_value(&env).unwrap();
            prop_assert!(rendered.get("data").is_none());
        }

        #[test]
        fn status_false_always_fails_with_own_or_default_code(
            code in proptest::option::of(400u16..600),
            message in "[a-zA-Z ]{1,16}",
        ) {
            let mut value = json!({"status": false, "message": message.clone()});
            if let Some(code) = code {
                value["statusCode"] = json!(code);
            }
            let env = verbose().render_outcome(&meta(), Outcome::from_value(value), StatusCode::OK);
            prop_assert!(!env.status);
            prop_assert_eq!(env.status_code.as_u16(), code.unwrap_or(400));
            prop_assert_eq!(env.message, Message::Text(message));
            prop_assert!(env.data.is_none());
        }

        #[test]
        fn http_faults_keep_their_status(code in 400u16..600, message in "[a-z ]{1,16}") {
            let status = StatusCode::from_u16(code).unwrap();
            let env = verbose().render_fault(&meta(), &Fault::http(status, message));
            prop_assert_eq!(env.status_code, status);
        }

        #[test]
        fn rendering_is_idempotent_modulo_timestamp(value in arb_json()) {
            let outcome = Outcome::from_value(value);
            let a = verbose().render_outcome(&meta(), outcome.clone(), StatusCode::OK);
            let b = verbose().render_outcome(&meta(), outcome, StatusCode::OK);
            prop_assert_eq!(body(&a), body(&b));
        }
    }
}
