//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers
//! - `outcome.rs` / `fault.rs`: what handlers return or raise
//! - `normalize.rs`: renders both into the response envelope
//! - `services.rs`: store wiring

use std::sync::Arc;

use axum::{Extension, Router};
use axum::middleware::{from_fn, from_fn_with_state};

use userdesk_infra::AppConfig;

use crate::middleware::{self, RateLimiter};

pub mod dto;
pub mod envelope;
pub mod extract;
pub mod fault;
pub mod normalize;
pub mod outcome;
pub mod routes;
pub mod services;

use self::fault::FaultClassifier;
use self::normalize::OutcomeNormalizer;
use self::services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Layers, outermost first: request logging, normalization, rate limiting.
pub fn build_app(config: &AppConfig, services: AppServices) -> Router {
    let normalizer = OutcomeNormalizer::new(FaultClassifier::new(config.disclosure));

    let mut router = routes::router().layer(Extension(Arc::new(services)));

    if let Some(limit) = config.rate_limit {
        let limiter = Arc::new(RateLimiter::new(limit));
        router = router.layer(from_fn_with_state(limiter, middleware::rate_limit));
    }

    router
        .layer(from_fn_with_state(normalizer, normalize::normalize))
        .layer(from_fn(middleware::log_requests))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;
    use userdesk_infra::{DisclosurePolicy, RateLimitConfig};

    fn app() -> Router {
        build_app(&AppConfig::default(), AppServices::in_memory())
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_has_no_data() {
        let (status, body) = send(app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], true);
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["message"], "Service is healthy");
        assert_eq!(body["path"], "/health");
        assert_eq!(body["method"], "GET");
        assert!(body.get("data").is_none());
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn create_user_returns_201_envelope() {
        let (status, body) = send(
            app(),
            json_request(
                "POST",
                "/users/create-user",
                json!({
                    "firstName": "John",
                    "lastName": "Smith",
                    "username": "jsmith",
                    "email": "john@example.com",
                    "password": "secret1"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["message"], "User created successfully");
        assert_eq!(body["data"]["username"], "jsmith");
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn invalid_create_returns_field_map() {
        let (status, body) = send(
            app(),
            json_request(
                "POST",
                "/users/create-user",
                json!({
                    "firstName": "John",
                    "lastName": "Smith",
                    "username": "jsmith",
                    "email": "not-an-email",
                    "password": "secret1"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], false);
        assert_eq!(body["message"], json!({"email": ["email must be an email"]}));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn wrongly_typed_field_is_reported_as_string_violation() {
        let (status, body) = send(
            app(),
            json_request(
                "POST",
                "/users/create-user",
                json!({
                    "firstName": 123,
                    "lastName": "Smith",
                    "username": "jsmith",
                    "email": "bad",
                    "password": "secret1"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            json!({
                "email": ["email must be an email"],
                "firstName": ["firstName must be a string"]
            })
        );
    }

    #[tokio::test]
    async fn null_field_is_treated_as_missing() {
        let (status, body) = send(
            app(),
            json_request(
                "POST",
                "/users/create-user",
                json!({
                    "firstName": null,
                    "lastName": "Smith",
                    "username": "jsmith",
                    "email": "john@example.com",
                    "password": "secret1"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"]["firstName"][0], "firstName should not be empty");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/users/create-user")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["statusCode"], 400);
    }

    #[tokio::test]
    async fn unknown_user_is_soft_404() {
        let uri = format!("/users/{}", userdesk_core::UserId::new());
        let (status, body) = send(app(), get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], false);
        assert!(body["message"].as_str().unwrap().starts_with("User with ID "));
    }

    #[tokio::test]
    async fn bad_id_is_validation_fault() {
        let (status, body) = send(app(), get("/users/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!({"id": ["id must be a UUID"]}));
    }

    #[tokio::test]
    async fn empty_list_reports_no_users() {
        let (status, body) = send(app(), get("/users/get-all-users")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "No users found");
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn unmatched_route_is_404_fault() {
        let (status, body) = send(app(), get("/nowhere?x=1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Cannot GET /nowhere");
        assert_eq!(body["path"], "/nowhere?x=1");
    }

    #[tokio::test]
    async fn wrong_method_is_normalized() {
        let req = Request::builder()
            .method("PUT")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["statusCode"], 405);
        assert_eq!(body["status"], false);
    }

    #[tokio::test]
    async fn delete_many_with_unknown_ids_is_404() {
        let (status, body) = send(
            app(),
            json_request(
                "DELETE",
                "/users/delete-multiple",
                json!({"ids": [userdesk_core::UserId::new().to_string()]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No users found for the provided IDs");
    }

    #[tokio::test]
    async fn masked_policy_keeps_soft_failures() {
        let config = AppConfig {
            disclosure: DisclosurePolicy::Masked,
            ..AppConfig::default()
        };
        let app = build_app(&config, AppServices::in_memory());
        let (status, _) = send(app.clone(), get("/users/abc")).await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/users/{}", userdesk_core::UserId::new());
        let (status, _) = send(app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rate_limit_rejects_with_429() {
        let config = AppConfig {
            rate_limit: Some(RateLimitConfig {
                max_requests: 1,
                window: Duration::from_secs(60),
            }),
            ..AppConfig::default()
        };
        let app = build_app(&config, AppServices::in_memory());
        let (status, _) = send(app.clone(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app, get("/health")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["message"], "Too many requests, please try again later.");
    }
}
