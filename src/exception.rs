//! # Typed API exceptions
//!
//! [`ApiException`] is the value object behind every deliberate, client-facing
//! failure: an HTTP status, a stable upper-snake-case error code, a message and
//! two extension maps. The code is resolved exactly once, at construction:
//!
//! 1. an explicit string ([`ErrorCode::Literal`]),
//! 2. the string value of a closed enumeration ([`ErrorCode::from_enum`]),
//! 3. the canonical reason phrase of the status (`405` → `METHOD_NOT_ALLOWED`),
//! 4. `UNKNOWN_STATUS` when the status has no reason phrase.
//!
//! ```rust,ignore
//! use axum::http::StatusCode;
//! use restful_actions::exception::ApiException;
//!
//! let err = ApiException::new(StatusCode::CONFLICT, "SLUG_TAKEN", "Slug already in use")
//!     .with_error_field("field", "slug")
//!     .with_response_field("retry", false);
//! ```

use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::errors::ErrorObject;

/// Code used when a status has no canonical reason phrase.
pub const UNKNOWN_STATUS: &str = "UNKNOWN_STATUS";

/// Closed enumerations usable as error codes.
///
/// Implementors map each variant to its stable string value. The conversion
/// happens before an [`ApiException`] is built, so the exception itself only
/// ever stores a string.
pub trait AsErrorCode {
    fn as_error_code(&self) -> &str;
}

/// Error code as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorCode {
    /// Use this code verbatim.
    Literal(String),
    /// Derive the code from the HTTP status.
    #[default]
    None,
}

impl ErrorCode {
    /// Extracts the string value of an enumeration code.
    pub fn from_enum<E: AsErrorCode + ?Sized>(code: &E) -> Self {
        Self::Literal(code.as_error_code().to_string())
    }

    fn resolve(self, status: StatusCode) -> String {
        match self {
            Self::Literal(code) => code,
            Self::None => status_code_text(status),
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        Self::Literal(code.to_string())
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        Self::Literal(code)
    }
}

impl From<Option<String>> for ErrorCode {
    fn from(code: Option<String>) -> Self {
        code.map_or(Self::None, Self::Literal)
    }
}

/// Raised when a dynamically supplied error code is neither a string nor null.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("error code must be a string or null, got {found}")]
pub struct InvalidErrorCode {
    pub found: String,
}

impl TryFrom<Value> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::None),
            Value::String(code) => Ok(Self::Literal(code)),
            other => Err(InvalidErrorCode {
                found: other.to_string(),
            }),
        }
    }
}

/// Canonicalizes the reason phrase of `status` into an error code.
///
/// Uppercases the phrase and collapses every run of non-alphanumeric
/// characters into a single underscore, so `"Method Not Allowed"` becomes
/// `METHOD_NOT_ALLOWED` and `"I'm a teapot"` becomes `I_M_A_TEAPOT`.
#[must_use]
pub fn status_code_text(status: StatusCode) -> String {
    let Some(reason) = status.canonical_reason() else {
        return UNKNOWN_STATUS.to_string();
    };

    let mut code = String::with_capacity(reason.len());
    for c in reason.chars() {
        if c.is_ascii_alphanumeric() {
            code.push(c.to_ascii_uppercase());
        } else if !code.ends_with('_') {
            code.push('_');
        }
    }
    code
}

/// Client-facing failure with a resolved error code and extension fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiException {
    status: StatusCode,
    error_code: String,
    message: String,
    extra_error_fields: Map<String, Value>,
    extra_response_fields: Map<String, Value>,
}

impl ApiException {
    pub fn new(
        status: StatusCode,
        code: impl Into<ErrorCode>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            error_code: code.into().resolve(status),
            message: message.into(),
            extra_error_fields: Map::new(),
            extra_response_fields: Map::new(),
        }
    }

    /// A 403 exception with the `FORBIDDEN` code.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// A 403 exception with a caller-chosen code.
    pub fn forbidden_with_code(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        match code.into() {
            ErrorCode::None => Self::forbidden(message),
            literal => Self::new(StatusCode::FORBIDDEN, literal, message),
        }
    }

    /// Adds a field to the `error` object of the envelope.
    #[must_use]
    pub fn with_error_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_error_fields.insert(key.into(), value.into());
        self
    }

    /// Adds a top-level field to the envelope, sibling to `error`.
    #[must_use]
    pub fn with_response_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_response_fields.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn extra_error_fields(&self) -> &Map<String, Value> {
        &self.extra_error_fields
    }

    #[must_use]
    pub const fn extra_response_fields(&self) -> &Map<String, Value> {
        &self.extra_response_fields
    }

    /// Builds the envelope body.
    ///
    /// Extension fields are merged last and win over `code`/`message`
    /// (or over `error` at the top level) on key collisions.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut error = ErrorObject::new(&self.error_code, &self.message).into_map();
        for (key, value) in &self.extra_error_fields {
            error.insert(key.clone(), value.clone());
        }

        let mut body = Map::new();
        body.insert("error".to_string(), Value::Object(error));
        for (key, value) in &self.extra_response_fields {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

impl std::fmt::Display for ApiException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.error_code, self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiException {}
