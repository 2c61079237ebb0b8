//! Error taxonomy and the single translation from errors to HTTP responses.
//!
//! Handlers and extractors return [`AppError`]; [`AppError::translate`] is the
//! one exhaustive mapping to `(status, code, message, details)`. The response
//! carries an [`ErrorReport`] extension which the request-context middleware
//! logs once, together with the request path and request ID.

use std::any::Any;
use std::borrow::Cow;
use std::error::Error as _;
use std::fmt;

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::response::ApiResponse;
use validation::ValidationIssue;

const MSG_INVALID_REQUEST: &str = "Invalid request";
const MSG_REQUEST_VALIDATION: &str = "Request validation failed";
const MSG_INTEGRITY_CONFLICT: &str = "Request could not be completed due to a conflict";
const MSG_SCHEMA_MISSING: &str = "Database not initialized. Ensure migrations are applied.";
const MSG_ROW_NOT_FOUND: &str = "Requested resource was not found";
const MSG_MULTIPLE_ROWS: &str = "Multiple resources found where one expected";
const MSG_REQUEST_FAILED: &str = "Request failed";

/// The fixed error kinds. Each has a status, a stable code and a default
/// client-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Permission,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Permission => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Auth => "auth_error",
            ErrorKind::Permission => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal_error",
        }
    }

    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Validation => MSG_INVALID_REQUEST,
            ErrorKind::Auth => "Authentication required",
            ErrorKind::Permission => "Permission denied",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::Conflict => "Resource conflict",
            ErrorKind::Internal => "Internal server error",
        }
    }

    /// The kind whose safe message is used for a bare HTTP status.
    pub fn for_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Some(ErrorKind::Validation),
            StatusCode::UNAUTHORIZED => Some(ErrorKind::Auth),
            StatusCode::FORBIDDEN => Some(ErrorKind::Permission),
            StatusCode::NOT_FOUND => Some(ErrorKind::NotFound),
            StatusCode::CONFLICT => Some(ErrorKind::Conflict),
            _ => None,
        }
    }
}

/// Stable error code for an arbitrary HTTP status.
pub fn resolve_error_code(status: StatusCode) -> &'static str {
    match ErrorKind::for_status(status) {
        Some(kind) => kind.code(),
        None if status.is_server_error() => ErrorKind::Internal.code(),
        None => "http_error",
    }
}

/// A business-rule violation with its own status, code and message.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainError {
    status: StatusCode,
    code: Cow<'static, str>,
    message: Cow<'static, str>,
    details: Option<Value>,
}

impl DomainError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            status: kind.status(),
            code: Cow::Borrowed(kind.code()),
            message: Cow::Borrowed(kind.default_message()),
            details: None,
        }
    }

    /// A rule-specific error outside the fixed kinds.
    pub fn custom(
        status: StatusCode,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self { status, code: code.into(), message: message.into(), details: None }
    }

    pub fn validation() -> Self {
        Self::new(ErrorKind::Validation)
    }

    pub fn auth() -> Self {
        Self::new(ErrorKind::Auth)
    }

    pub fn permission() -> Self {
        Self::new(ErrorKind::Permission)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    pub fn conflict() -> Self {
        Self::new(ErrorKind::Conflict)
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }
}

impl Default for DomainError {
    fn default() -> Self {
        Self::custom(StatusCode::BAD_REQUEST, "domain_error", "Domain error")
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for DomainError {}

/// Every failure a request can end in.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Business-rule violations.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// A bare HTTP failure raised by the framework layer (fallbacks, rejections).
    #[error("HTTP {status}: {detail}")]
    Http { status: StatusCode, detail: Value },
    /// Query or path input that failed to parse or validate.
    #[error("request validation failed ({} issue(s))", .0.len())]
    RequestValidation(Vec<ValidationIssue>),
    /// A value outside its domain. The text is logged, never returned.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// A lookup that must be unique matched several rows.
    #[error("multiple {entity} rows found where one was expected")]
    MultipleResults { entity: &'static str },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("handler panicked: {0}")]
    Panic(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// The client-facing result of translating an [`AppError`].
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub status: StatusCode,
    pub code: Cow<'static, str>,
    pub message: Cow<'static, str>,
    pub details: Option<Value>,
    /// What gets logged when it differs from `message`.
    pub log_message: Option<String>,
}

impl Translation {
    fn new(status: StatusCode, code: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self { status, code: code.into(), message: message.into(), details: None, log_message: None }
    }

    fn kind(kind: ErrorKind) -> Self {
        Self::new(kind.status(), kind.code(), kind.default_message())
    }

    fn with_details(mut self, details: Option<Value>) -> Self {
        self.details = details;
        self
    }

    fn logging(mut self, log_message: impl Into<String>) -> Self {
        self.log_message = Some(log_message.into());
        self
    }
}

impl AppError {
    pub fn http(status: StatusCode, detail: impl Into<Value>) -> Self {
        AppError::Http { status, detail: detail.into() }
    }

    pub fn translate(&self) -> Translation {
        match self {
            AppError::Domain(err) if err.status.is_server_error() => {
                Translation::new(err.status, err.code.clone(), ErrorKind::Internal.default_message())
                    .logging(err.to_string())
            }
            AppError::Domain(err) => Translation::new(err.status, err.code.clone(), err.message.clone())
                .with_details(err.details.clone()),
            AppError::Http { status, detail } => translate_http(*status, detail),
            AppError::RequestValidation(issues) => Translation::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Validation.code(),
                MSG_REQUEST_VALIDATION,
            )
            .with_details(serde_json::to_value(issues).ok()),
            AppError::InvalidValue(text) => {
                let logged = if text.trim().is_empty() { MSG_INVALID_REQUEST } else { text.trim() };
                Translation::new(StatusCode::BAD_REQUEST, ErrorKind::Validation.code(), MSG_INVALID_REQUEST)
                    .logging(logged)
            }
            AppError::MultipleResults { .. } => {
                Translation::new(StatusCode::CONFLICT, ErrorKind::Conflict.code(), MSG_MULTIPLE_ROWS)
            }
            AppError::Database(err) => translate_database(err),
            AppError::Panic(_) | AppError::Internal(_) => Translation::kind(ErrorKind::Internal),
        }
    }

    /// The error text followed by its source chain.
    pub fn describe(&self) -> String {
        let mut out = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

fn translate_http(status: StatusCode, detail: &Value) -> Translation {
    if let Some(canonical) = canonical_error(detail) {
        return Translation::new(status, canonical.0, canonical.1).with_details(canonical.2);
    }

    let detail_text = detail.as_str().map(str::trim).filter(|s| !s.is_empty());
    let message: Cow<'static, str> = match ErrorKind::for_status(status) {
        Some(kind) => Cow::Borrowed(kind.default_message()),
        None if status.is_server_error() => Cow::Borrowed(ErrorKind::Internal.default_message()),
        None => match detail_text {
            Some(text) => Cow::Owned(text.to_string()),
            None => Cow::Borrowed(MSG_REQUEST_FAILED),
        },
    };
    // Structured details are forwarded for client errors only.
    let details = match detail {
        Value::Null | Value::String(_) => None,
        _ if status.is_server_error() => None,
        other => Some(other.clone()),
    };
    let logged = detail_text.map(str::to_string).unwrap_or_else(|| message.to_string());
    Translation::new(status, resolve_error_code(status), message).with_details(details).logging(logged)
}

// `{"error": {"code": str, "message": str, "details"?: any}}`
fn canonical_error(detail: &Value) -> Option<(String, String, Option<Value>)> {
    let error = detail.get("error")?.as_object()?;
    let code = error.get("code")?.as_str()?;
    let message = error.get("message")?.as_str()?;
    let details = error.get("details").filter(|d| !d.is_null()).cloned();
    Some((code.to_string(), message.to_string(), details))
}

fn translate_database(err: &sqlx::Error) -> Translation {
    use sqlx::error::ErrorKind as DbErrorKind;

    match err {
        sqlx::Error::RowNotFound => {
            Translation::new(StatusCode::NOT_FOUND, ErrorKind::NotFound.code(), MSG_ROW_NOT_FOUND)
        }
        sqlx::Error::Database(db_err) => match db_err.kind() {
            DbErrorKind::UniqueViolation
            | DbErrorKind::ForeignKeyViolation
            | DbErrorKind::NotNullViolation
            | DbErrorKind::CheckViolation => {
                Translation::new(StatusCode::CONFLICT, ErrorKind::Conflict.code(), MSG_INTEGRITY_CONFLICT)
            }
            _ if is_missing_schema(&**db_err) => Translation::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal.code(),
                MSG_SCHEMA_MISSING,
            ),
            _ => Translation::kind(ErrorKind::Internal),
        },
        _ => Translation::kind(ErrorKind::Internal),
    }
}

// SQLite reports a missing table/column by message; Postgres by SQLSTATE.
fn is_missing_schema(err: &dyn sqlx::error::DatabaseError) -> bool {
    let message = err.message().to_lowercase();
    if message.starts_with("no such table") || message.starts_with("no such column") {
        return true;
    }
    matches!(err.code().as_deref(), Some("42P01") | Some("42703"))
}

/// What the request-context middleware needs to log a translated error.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    /// The original error chain; only recorded for server errors.
    pub cause: Option<String>,
}

impl ErrorReport {
    pub fn log(&self, path: &str, request_id: Option<&str>) {
        let request_id = request_id.unwrap_or("n/a");
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                cause = self.cause.as_deref().unwrap_or("-"),
                "[{}] path={} request_id={} message={}",
                self.code,
                path,
                request_id,
                self.message
            );
        } else {
            tracing::warn!(
                status = self.status.as_u16(),
                "[{}] path={} request_id={} message={}",
                self.code,
                path,
                request_id,
                self.message
            );
        }
    }
}

impl AppError {
    /// The failure envelope (status set) and the report for the
    /// request-context middleware. The report must be attached to the
    /// response built from the envelope.
    pub fn into_envelope<T>(self) -> (ApiResponse<T>, ErrorReport) {
        let translation = self.translate();
        let report = ErrorReport {
            status: translation.status,
            code: translation.code.to_string(),
            message: translation.log_message.clone().unwrap_or_else(|| translation.message.to_string()),
            cause: translation.status.is_server_error().then(|| self.describe()),
        };
        let envelope = ApiResponse::fail(translation.code, translation.message, translation.details)
            .with_status(translation.status);
        (envelope, report)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (envelope, report) = self.into_envelope::<()>();
        let mut response = envelope.into_response();
        response.extensions_mut().insert(report);
        response
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        match rejection {
            QueryRejection::FailedToDeserializeQueryString(inner) => {
                AppError::RequestValidation(vec![ValidationIssue::new(&["query"], inner.body_text(), "parse_error")])
            }
            other => AppError::Internal(anyhow::anyhow!("query extraction failed: {}", other.body_text())),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(inner) => {
                AppError::RequestValidation(vec![ValidationIssue::new(&["path"], inner.body_text(), "parse_error")])
            }
            other => AppError::Internal(anyhow::anyhow!("path extraction failed: {}", other.body_text())),
        }
    }
}

/// Turns a caught handler panic into a 500 envelope. Used with
/// `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::Panic(detail).into_response()
}

/// An extension trait for `Option` that converts `None` into a not-found
/// domain error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, AppError>`.
    ///
    /// # Arguments
    ///
    /// * `entity` - A string describing the entity that was not found.
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| DomainError::not_found().with_message(format!("{} not found", entity)).into())
    }
}

/// Field-level validation of request parameters.
pub mod validation {
    use serde::Serialize;

    /// One failed field. `loc` is the path to the field, e.g. `["query", "limit"]`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ValidationIssue {
        pub loc: Vec<String>,
        pub msg: String,
        #[serde(rename = "type")]
        pub kind: String,
    }

    impl ValidationIssue {
        pub fn new(loc: &[&str], msg: impl Into<String>, kind: impl Into<String>) -> Self {
            Self { loc: loc.iter().map(|s| s.to_string()).collect(), msg: msg.into(), kind: kind.into() }
        }
    }

    /// Implemented by request parameter types checked after deserialization.
    pub trait Validate {
        fn validate(&self) -> Result<(), Vec<ValidationIssue>>;
    }

    /// Collects issues for one parameter set.
    #[derive(Debug, Default)]
    pub struct Checker {
        issues: Vec<ValidationIssue>,
    }

    impl Checker {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn range(&mut self, loc: &[&str], value: i64, min: i64, max: Option<i64>) -> &mut Self {
            if value < min {
                self.issues.push(ValidationIssue::new(
                    loc,
                    format!("Input should be greater than or equal to {}", min),
                    "greater_than_equal",
                ));
            } else if let Some(max) = max.filter(|max| value > *max) {
                self.issues.push(ValidationIssue::new(
                    loc,
                    format!("Input should be less than or equal to {}", max),
                    "less_than_equal",
                ));
            }
            self
        }

        /// Length in characters, not bytes.
        pub fn length(&mut self, loc: &[&str], value: &str, min: usize, max: usize) -> &mut Self {
            let len = value.chars().count();
            if len < min {
                self.issues.push(ValidationIssue::new(
                    loc,
                    format!("String should have at least {} characters", min),
                    "string_too_short",
                ));
            } else if len > max {
                self.issues.push(ValidationIssue::new(
                    loc,
                    format!("String should have at most {} characters", max),
                    "string_too_long",
                ));
            }
            self
        }

        pub fn finish(&mut self) -> Result<(), Vec<ValidationIssue>> {
            if self.issues.is_empty() {
                Ok(())
            } else {
                Err(std::mem::take(&mut self.issues))
            }
        }
    }
}
