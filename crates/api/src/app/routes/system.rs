use axum::http::{Method, Uri};

use crate::app::fault::Fault;
use crate::app::outcome::Outcome;

pub async fn health() -> Outcome {
    Outcome::empty().with_message("Service is healthy")
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> Fault {
    Fault::not_found(format!("Cannot {} {}", method, uri.path()))
}
