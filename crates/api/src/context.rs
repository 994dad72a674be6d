use axum::http::Request;

/// Request metadata echoed back in every envelope.
///
/// Captured before the handler runs, so it reflects the URL the client sent
/// even when nested routers rewrite the URI on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    method: String,
    path: String,
}

impl RequestMeta {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn from_request<B>(req: &Request<B>) -> Self {
        let uri = req.uri();
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        Self::new(req.method().as_str(), path)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path plus query string.
    pub fn path(&self) -> &str {
        &self.path
    }
}
