//! Validation Support
//!
//! Two layers of request validation feed the action pipelines:
//!
//! - [`FormValidator`]: an upstream, authoritative validator for request
//!   bodies. When a controller provides one, its output is trusted and the
//!   attribute allow-list is bypassed (see [`crate::request::Input`]).
//! - [`ParamRule`]: small per-parameter checks on the query string, used by
//!   the index/count pipelines for the pagination schema and caller rules.
//!
//! # Example
//!
//! ```rust,ignore
//! use restful_actions::validation::{FormValidator, ValidationError, ValidationErrors};
//! use serde_json::{Map, Value};
//!
//! struct PostForm;
//!
//! impl FormValidator for PostForm {
//!     fn validate(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, ValidationErrors> {
//!         let mut errors = ValidationErrors::new();
//!         let mut safe = Map::new();
//!         match input.get("title").and_then(Value::as_str) {
//!             Some(title) if !title.is_empty() => {
//!                 safe.insert("title".into(), Value::from(title));
//!             }
//!             _ => errors.add(ValidationError::new("title", "The title field is required.")),
//!         }
//!         errors.result().map(|()| safe)
//!     }
//! }
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::request::ResourceRequest;

/// Validation error with field name and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add a validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get all errors
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Convert to Result
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was collected.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// First message, suffixed with the number of remaining errors.
    #[must_use]
    pub fn summary(&self) -> String {
        let Some(first) = self.errors.first() else {
            return "The given data was invalid.".to_string();
        };
        match self.errors.len() - 1 {
            0 => first.message.clone(),
            1 => format!("{} (and 1 more error)", first.message),
            n => format!("{} (and {n} more errors)", first.message),
        }
    }

    /// Messages grouped by field, fields in first-seen order.
    #[must_use]
    pub fn to_field_map(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        for error in &self.errors {
            let messages = fields
                .entry(error.field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(messages) = messages {
                messages.push(Value::String(error.message.clone()));
            }
        }
        fields
    }
}

impl Default for ValidationErrors {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Authoritative validator for request bodies.
///
/// Returns the validated, already-whitelisted subset of the input. Every key
/// of the returned map is assigned to the model without consulting the
/// controller's allow-list.
pub trait FormValidator: Send + Sync {
    /// # Errors
    ///
    /// Returns the collected field errors when the input is invalid.
    fn validate(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, ValidationErrors>;
}

/// A check applied to one query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRule {
    /// The parameter must be present and non-empty.
    Required,
    /// The value must parse as a signed integer.
    Integer,
    /// Integer value must be at least this.
    Min(i64),
    /// Integer value must not exceed this.
    Max(i64),
    /// The value must be one of `true`, `false`, `1`, `0`.
    Boolean,
    /// The value must be one of the listed strings.
    In(Vec<String>),
}

/// Rules keyed by parameter name.
pub type ParamRules = Vec<(&'static str, Vec<ParamRule>)>;

impl ParamRule {
    fn check(&self, field: &str, value: &str) -> Result<(), ValidationError> {
        let fail = |message: String| Err(ValidationError::new(field, message));
        match self {
            Self::Required if value.is_empty() => fail(format!("The {field} field is required.")),
            Self::Integer if value.parse::<i64>().is_err() => {
                fail(format!("The {field} field must be an integer."))
            }
            Self::Min(min) if value.parse::<i64>().is_ok_and(|v| v < *min) => {
                fail(format!("The {field} field must be at least {min}."))
            }
            Self::Max(max) if value.parse::<i64>().is_ok_and(|v| v > *max) => {
                fail(format!("The {field} field must not be greater than {max}."))
            }
            Self::Boolean if !matches!(value, "true" | "false" | "1" | "0") => {
                fail(format!("The {field} field must be true or false."))
            }
            Self::In(allowed) if !allowed.iter().any(|a| a == value) => {
                fail(format!("The selected {field} is invalid."))
            }
            _ => Ok(()),
        }
    }
}

/// Overlays `overrides` onto `base`; a field present in both takes the
/// override's rules.
#[must_use]
pub fn merge_rules(mut base: ParamRules, overrides: ParamRules) -> ParamRules {
    for (field, rules) in overrides {
        match base.iter_mut().find(|(existing, _)| *existing == field) {
            Some(slot) => slot.1 = rules,
            None => base.push((field, rules)),
        }
    }
    base
}

/// Checks the query parameters of `request` against `rules`.
///
/// Absent parameters are only checked by [`ParamRule::Required`]. Checking a
/// field stops at its first failing rule.
///
/// # Errors
///
/// Returns every failing field.
pub fn validate_params(request: &ResourceRequest, rules: &ParamRules) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for (field, field_rules) in rules {
        let value = request.param(field);
        for rule in field_rules {
            let outcome = match value {
                Some(value) => rule.check(field, value),
                None if *rule == ParamRule::Required => rule.check(field, ""),
                None => Ok(()),
            };
            if let Err(error) = outcome {
                errors.add(error);
                break;
            }
        }
    }
    errors.result()
}
