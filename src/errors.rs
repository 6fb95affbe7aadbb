//! # Error Handling for Resource Actions
//!
//! Every failure raised by a pipeline step is an [`ApiError`]. The HTTP
//! boundary turns it into the uniform error envelope:
//!
//! ```json
//! { "error": { "code": "VALIDATION_FAILED", "message": "...", ... }, ... }
//! ```
//!
//! ## Philosophy
//!
//! **Never expose internal errors to users**. Database errors and internal
//! details are logged with `tracing` and replaced by `SERVER_ERROR` /
//! `Server Error`, unless the envelope is rendered in debug mode.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use restful_actions::ApiError;
//!
//! async fn before_save(&self, ...) -> Result<(), ApiError> {
//!     if slug_taken {
//!         return Err(ApiError::conflict("Slug already in use"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Internal errors are logged using the `tracing` crate. To see them, install
//! a subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt()
//!     .with_target(false)
//!     .compact()
//!     .init();
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use utoipa::ToSchema;

use crate::exception::{ApiException, ErrorCode};
use crate::validation::{ValidationError, ValidationErrors};

/// Code for unclassified server errors in production rendering.
pub const SERVER_ERROR: &str = "SERVER_ERROR";
/// Code for failed request validation.
pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
/// Code for missing or invalid authentication.
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// Deliberate failure with an explicit status and error code
    Exception(ApiException),

    /// 404 Not Found - Resource doesn't exist
    NotFound {
        /// Resource type (e.g., "post")
        resource: String,
        /// Optional ID that wasn't found
        id: Option<String>,
    },

    /// 422 Unprocessable Entity - Validation failed
    ValidationFailed(ValidationErrors),

    /// 401 Unauthorized - Authentication required or failed
    Unauthenticated {
        /// User-facing error message
        message: String,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database(DbErr),

    /// 500 Internal Server Error - Generic internal error
    Internal {
        /// Message shown in debug mode only
        message: String,
        /// Internal error details (logged, shown in debug mode only)
        internal: Option<String>,
    },
}

impl ApiError {
    /// Create a 404 Not Found error
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Exception(ApiException::new(StatusCode::BAD_REQUEST, ErrorCode::None, message))
    }

    /// Create a 401 error; rendered with the `UNAUTHORIZED` code
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Create a 403 Forbidden error with the `FORBIDDEN` code
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Exception(ApiException::forbidden(message))
    }

    /// Create a 409 Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Exception(ApiException::new(StatusCode::CONFLICT, ErrorCode::None, message))
    }

    /// Create a 422 Validation Failed error
    pub fn validation_failed(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }

    /// Create a 422 error for a single field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed(ValidationError::new(field, message).into())
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database(err)
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Create an error with any status and code
    pub fn custom(status: StatusCode, code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self::Exception(ApiException::new(status, code, message))
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Exception(exception) => exception.status(),
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code rendered in production mode
    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::Exception(exception) => exception.error_code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ValidationFailed(_) => VALIDATION_FAILED,
            Self::Unauthenticated { .. } => UNAUTHORIZED,
            Self::Database(_) | Self::Internal { .. } => SERVER_ERROR,
        }
    }

    /// Get the user-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Exception(exception) => exception.message().to_string(),
            Self::NotFound { resource, id } => {
                if let Some(id) = id {
                    format!("{resource} with ID '{id}' not found")
                } else {
                    format!("{resource} not found")
                }
            }
            Self::ValidationFailed(errors) => errors.summary(),
            Self::Unauthenticated { message } => message.clone(),
            Self::Database(_) | Self::Internal { .. } => "Server Error".to_string(),
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal { .. })
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database(internal) => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal { message, internal } => {
                tracing::error!(
                    message = %message,
                    details = internal.as_deref().unwrap_or_default(),
                    "Internal error occurred"
                );
            }
            Self::Exception(exception) => {
                tracing::debug!(
                    status = %exception.status(),
                    code = exception.error_code(),
                    more = ?exception.extra_error_fields(),
                    meta = ?exception.extra_response_fields(),
                    "API exception"
                );
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }

    /// Framework-level body of the failure before it is wrapped under `error`.
    fn original_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(self.user_message()));
        if let Self::ValidationFailed(errors) = self {
            body.insert("errors".to_string(), Value::Object(errors.to_field_map()));
        }
        body
    }

    /// Builds the error envelope.
    ///
    /// With `debug` set, server errors keep their own code and internal
    /// message; otherwise they are reduced to `SERVER_ERROR` / `Server Error`.
    #[must_use]
    pub fn to_envelope(&self, debug: bool) -> ErrorEnvelope {
        let status = self.status_code();
        let body = match self {
            Self::Exception(exception) => exception.to_body(),
            Self::ValidationFailed(_) => wrap(VALIDATION_FAILED, "Validation failed", self.original_body()),
            Self::Unauthenticated { .. } => wrap(UNAUTHORIZED, "Unauthenticated.", self.original_body()),
            Self::Database(err) if debug => {
                wrap_plain("DATABASE_ERROR", &err.to_string())
            }
            Self::Internal { message, internal } if debug => {
                let detail = internal.as_ref().map_or_else(|| message.clone(), |d| format!("{message}: {d}"));
                wrap_plain("INTERNAL_ERROR", &detail)
            }
            Self::Database(_) | Self::Internal { .. } => wrap_plain(SERVER_ERROR, "Server Error"),
            Self::NotFound { .. } => wrap_plain("NOT_FOUND", &self.user_message()),
        };
        ErrorEnvelope { status, body }
    }

    /// Logs the error and renders the envelope as a response.
    #[must_use]
    pub fn render(self, debug: bool) -> Response {
        self.log_internal();
        if debug && self.is_server_error() {
            tracing::warn!("rendering server error details in debug mode");
        }
        self.to_envelope(debug).into_response()
    }
}

/// `{"error": {code, message, ...original}}` where the original body wins on collisions.
fn wrap(code: &str, message: &str, original: Map<String, Value>) -> Value {
    let mut error = ErrorObject::new(code, message).into_map();
    error.extend(original);
    serde_json::json!({ "error": error })
}

fn wrap_plain(code: &str, message: &str) -> Value {
    serde_json::json!({ "error": ErrorObject::new(code, message) })
}

/// The `error` object of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorObject {
    /// Stable, upper-snake-case error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ErrorObject {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub(crate) fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("code".to_string(), Value::String(self.code));
        map.insert("message".to_string(), Value::String(self.message));
        map
    }
}

/// Error body as documented in the OpenAPI components.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

/// Rendered error: status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.render(false)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(err) => write!(f, "database error: {err}"),
            Self::Internal { message, internal: Some(details) } => write!(f, "{message}: {details}"),
            Self::Internal { message, internal: None } => f.write_str(message),
            _ => f.write_str(&self.user_message()),
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert SeaORM DbErr to ApiError
///
/// **Conversion Rules:**
/// - `DbErr::RecordNotFound` → 404 Not Found
/// - All other `DbErr` variants → 500 Internal Server Error (logged internally, sanitized for users)
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::Database(err),
        }
    }
}

impl From<ApiException> for ApiError {
    fn from(exception: ApiException) -> Self {
        Self::Exception(exception)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("post", Some("5".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            err.to_envelope(false).body,
            json!({"error": {"code": "NOT_FOUND", "message": "post with ID '5' not found"}})
        );
    }

    #[test]
    fn test_forbidden() {
        let err = ApiError::forbidden("Insufficient permissions");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), "FORBIDDEN");
        assert_eq!(err.user_message(), "Insufficient permissions");
    }

    #[test]
    fn test_status_derived_codes() {
        assert_eq!(ApiError::bad_request("x").error_code(), "BAD_REQUEST");
        assert_eq!(ApiError::conflict("x").error_code(), "CONFLICT");
        assert_eq!(
            ApiError::custom(StatusCode::TOO_MANY_REQUESTS, ErrorCode::None, "slow down").error_code(),
            "TOO_MANY_REQUESTS"
        );
    }

    #[test]
    fn test_validation_envelope_nests_original_body() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new("limit", "The limit field must be at least 1."));
        let envelope = ApiError::validation_failed(errors).to_envelope(false);

        assert_eq!(envelope.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            envelope.body,
            json!({
                "error": {
                    "code": "VALIDATION_FAILED",
                    "message": "The limit field must be at least 1.",
                    "errors": {"limit": ["The limit field must be at least 1."]}
                }
            })
        );
    }

    #[test]
    fn test_unauthenticated_recoded() {
        let envelope = ApiError::unauthenticated("Unauthenticated.").to_envelope(false);
        assert_eq!(envelope.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            envelope.body,
            json!({"error": {"code": "UNAUTHORIZED", "message": "Unauthenticated."}})
        );
    }

    #[test]
    fn test_server_error_hidden_in_production() {
        let err = ApiError::database(DbErr::Custom("secret table missing".to_string()));
        let envelope = err.to_envelope(false);
        assert_eq!(envelope.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            envelope.body,
            json!({"error": {"code": "SERVER_ERROR", "message": "Server Error"}})
        );
        assert!(!envelope.body.to_string().contains("secret"));
    }

    #[test]
    fn test_server_error_detailed_in_debug() {
        let err = ApiError::database(DbErr::Custom("secret table missing".to_string()));
        let envelope = err.to_envelope(true);
        assert_eq!(envelope.body["error"]["code"], "DATABASE_ERROR");
        assert!(envelope.body["error"]["message"].as_str().unwrap().contains("secret table missing"));

        let err = ApiError::internal("Render failed", Some("template missing".into()));
        let envelope = err.to_envelope(true);
        assert_eq!(envelope.body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(envelope.body["error"]["message"], "Render failed: template missing");
    }

    #[test]
    fn test_exception_envelope_keeps_extensions() {
        let exception = ApiException::new(StatusCode::CONFLICT, "DUPLICATE", "exists")
            .with_error_field("field", "slug")
            .with_response_field("hint", "pick another");
        let envelope = ApiError::from(exception).to_envelope(true);
        assert_eq!(
            envelope.body,
            json!({"error": {"code": "DUPLICATE", "message": "exists", "field": "slug"}, "hint": "pick another"})
        );
    }

    #[test]
    fn test_dberr_record_not_found_becomes_404() {
        let api_err: ApiError = DbErr::RecordNotFound("post not found".to_string()).into();
        assert_eq!(api_err.status_code(), StatusCode::NOT_FOUND);
        assert!(api_err.user_message().contains("not found"));
    }

    #[test]
    fn test_all_other_dberr_become_500() {
        let test_cases = vec![
            DbErr::Custom("Any custom error".to_string()),
            DbErr::Type("Type error".to_string()),
            DbErr::Json("JSON error".to_string()),
        ];

        for db_err in test_cases {
            let api_err: ApiError = db_err.into();
            assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(api_err.user_message(), "Server Error");
        }
    }

    #[test]
    fn test_display_trait() {
        assert_eq!(format!("{}", ApiError::bad_request("Test error")), "Test error");
        assert_eq!(
            ApiError::internal("boom", Some("detail".into())).to_string(),
            "boom: detail"
        );
    }

    #[tokio::test]
    async fn test_into_response_renders_envelope() {
        let response = ApiError::invalid_field("title", "The title field is required.").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(body["error"]["errors"]["title"][0], "The title field is required.");
    }
}
