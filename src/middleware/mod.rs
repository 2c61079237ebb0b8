//! Middleware components for HTTP request processing.
//!
//! - `request_context`: request-ID assignment, propagation and error logging

pub mod request_context;

pub use request_context::{request_context_middleware, RequestId, REQUEST_ID_HEADER};
