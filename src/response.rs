//! The uniform JSON envelope returned by every endpoint.
//!
//! ```json
//! {"data": <T>|null, "meta": {"request_id": ..., "extra": ...}|null, "error": {...}|null}
//! ```
//!
//! A response carries either a payload or an error, never both. Clients
//! discriminate on `error == null`, which stays valid when the payload itself
//! is `null`, empty or otherwise falsy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{ser::SerializeStruct, Serialize, Serializer};
use serde_json::{Map, Value};

/// Response metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiMeta {
    pub request_id: Option<String>,
    pub extra: Option<Map<String, Value>>,
}

impl ApiMeta {
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self { request_id: Some(request_id.into()), extra: None }
    }

    /// Adds one entry to `extra`, creating the map on first use.
    pub fn extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.get_or_insert_with(Map::new).insert(key.to_string(), value.into());
        self
    }
}

/// The failure descriptor. `message` is always safe to show to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Debug, Clone)]
enum Outcome<T> {
    Data(T),
    Error(ApiError),
}

/// Success-or-failure envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    outcome: Outcome<T>,
    meta: Option<ApiMeta>,
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { outcome: Outcome::Data(data), meta: None, status: StatusCode::OK }
    }

    pub fn ok_with_meta(data: T, meta: ApiMeta) -> Self {
        Self { outcome: Outcome::Data(data), meta: Some(meta), status: StatusCode::OK }
    }

    pub fn fail(code: impl Into<String>, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            outcome: Outcome::Error(ApiError { code: code.into(), message: message.into(), details }),
            meta: None,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn with_meta(mut self, meta: ApiMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Overrides the HTTP status used by [`IntoResponse`].
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn data(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Data(data) => Some(data),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match &self.outcome {
            Outcome::Data(_) => None,
            Outcome::Error(err) => Some(err),
        }
    }

    pub fn meta(&self) -> Option<&ApiMeta> {
        self.meta.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Data(_))
    }
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ApiResponse", 3)?;
        state.serialize_field("data", &self.data())?;
        state.serialize_field("meta", &self.meta)?;
        state.serialize_field("error", &self.error())?;
        state.end()
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_serializes_all_three_keys() {
        let v = serde_json::to_value(ApiResponse::ok(json!({"status": "ok"}))).unwrap();
        assert_eq!(v, json!({"data": {"status": "ok"}, "meta": null, "error": null}));
    }

    #[test]
    fn falsy_payloads_keep_error_null() {
        for payload in [json!(null), json!([]), json!(0), json!(false), json!("")] {
            let v = serde_json::to_value(ApiResponse::ok(payload.clone())).unwrap();
            assert_eq!(v["data"], payload);
            assert!(v["error"].is_null());
        }
    }

    #[test]
    fn fail_has_no_data() {
        let resp = ApiResponse::<()>::fail("conflict", "Resource conflict", None);
        assert!(!resp.is_ok());
        assert!(resp.data().is_none());
        let v = serde_json::to_value(&resp).unwrap();
        assert!(v["data"].is_null());
        assert_eq!(v["error"]["code"], "conflict");
        assert!(v["error"]["details"].is_null());
    }

    #[test]
    fn meta_extra_accumulates() {
        let meta = ApiMeta::with_request_id("abc").extra("limit", 20).extra("offset", 0);
        let v = serde_json::to_value(ApiResponse::ok_with_meta(vec![1, 2], meta)).unwrap();
        assert_eq!(v["meta"]["request_id"], "abc");
        assert_eq!(v["meta"]["extra"], json!({"limit": 20, "offset": 0}));
    }

    #[test]
    fn status_defaults() {
        assert_eq!(ApiResponse::ok(1).status(), StatusCode::OK);
        let failed = ApiResponse::<()>::fail("not_found", "Resource not found", None)
            .with_status(StatusCode::NOT_FOUND);
        assert_eq!(failed.into_response().status(), StatusCode::NOT_FOUND);
    }
}
