use axum::routing::get;
use axum::Router;

pub mod system;
pub mod users;

/// All application routes, without middleware.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/users", users::router())
        .fallback(system::not_found)
}
