//! Request ID generation and propagation.
//!
//! Every request gets an `x-request-id` (kept if the client sent one),
//! echoed on the response and forwarded to the upstream service.

use axum::http::{HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = uuid::Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(value))
    }
}
