//! Request-scoped correlation ID.
//!
//! Every request gets a [`RequestId`]: the inbound `x-request-id` header when
//! present, otherwise a fresh UUIDv4. It is stored in the request extensions,
//! recorded on the request span, used when logging translated errors and
//! echoed on the response, including error, fallback and panic responses.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::ErrorReport;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Header values may carry obs-text bytes; the text form is lossy and is
    // only used for logs and `meta.request_id`.
    fn from_header(value: &HeaderValue) -> Option<Self> {
        if value.as_bytes().iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(Self(Arc::from(String::from_utf8_lossy(value.as_bytes()))))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handlers read the current ID with a `RequestId` argument. Outside the
/// middleware (unit tests) a fresh ID is produced.
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<RequestId>().cloned().unwrap_or_else(RequestId::generate))
    }
}

/// Outermost pipeline stage. The after-stage runs for every response the
/// inner stack produces; panics are already converted to responses by the
/// catch-panic layer below this one.
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    // The inbound value is echoed byte for byte.
    let inbound = req.headers().get(&REQUEST_ID_HEADER).cloned();
    let (request_id, echo) = match inbound.and_then(|v| RequestId::from_header(&v).map(|id| (id, v))) {
        Some((id, value)) => (id, Some(value)),
        None => (RequestId::generate(), None),
    };
    let path = req.uri().path().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %path,
    );
    req.extensions_mut().insert(request_id.clone());

    let mut res = next.run(req).instrument(span.clone()).await;

    if let Some(report) = res.extensions_mut().remove::<ErrorReport>() {
        span.in_scope(|| report.log(&path, Some(request_id.as_str())));
    }
    let outbound = match echo {
        Some(value) => Ok(value),
        None => HeaderValue::from_str(request_id.as_str()),
    };
    match outbound {
        Ok(value) => {
            res.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
        }
        Err(e) => tracing::warn!("Cannot echo request id {:?}: {}", request_id.as_str(), e),
    }
    res
}
