//! Attribute casts applied while assigning request input.
//!
//! A cast replaces the plain `serde_json` conversion for one attribute in
//! [`assignable_attributes!`](crate::assignable_attributes):
//!
//! ```rust,ignore
//! const LOCAL: LocalDatetime = LocalDatetime::new(8 * 3600);
//!
//! restful_actions::assignable_attributes!(event::ActiveModel {
//!     starts_at: DateTimeWithTimeZone => LOCAL,
//!     day: Option<DateTimeWithTimeZone> => LOCAL.date_only(),
//! });
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;

use crate::validation::ValidationError;

/// Converts one JSON input value into an attribute value.
pub trait AttributeCast<T> {
    /// # Errors
    ///
    /// Fails when `value` cannot be represented as `T`.
    fn cast(&self, name: &str, value: &Value) -> Result<T, ValidationError>;
}

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Datetime cast into the application's UTC offset.
///
/// Offset-carrying input is converted to that offset; naive input is read
/// as local time. The date-only variant truncates to local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDatetime {
    offset_seconds: i32,
    time: bool,
}

impl LocalDatetime {
    pub const UTC: Self = Self::new(0);

    /// Cast into the offset `offset_seconds` east of UTC.
    #[must_use]
    pub const fn new(offset_seconds: i32) -> Self {
        Self {
            offset_seconds,
            time: true,
        }
    }

    #[must_use]
    pub const fn date_only(self) -> Self {
        Self { time: false, ..self }
    }

    #[must_use]
    pub const fn keeps_time(&self) -> bool {
        self.time
    }

    /// The target offset, or `None` when out of range (over 24 hours).
    #[must_use]
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.offset_seconds)
    }

    /// Moves `value` into the target offset, truncating it for the
    /// date-only variant.
    #[must_use]
    pub fn localize(&self, value: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let local = value.with_timezone(&self.offset()?);
        if self.time {
            return Some(local);
        }
        let midnight = local.date_naive().and_hms_opt(0, 0, 0)?;
        local.offset().from_local_datetime(&midnight).single()
    }

    /// Parses RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DD` text.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        let text = text.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return self.localize(parsed);
        }

        let offset = self.offset()?;
        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })?;
        self.localize(offset.from_local_datetime(&naive).single()?)
    }
}

impl Default for LocalDatetime {
    fn default() -> Self {
        Self::UTC
    }
}

fn invalid_datetime(name: &str) -> ValidationError {
    ValidationError::new(name, format!("The {name} field must be a valid date."))
}

impl AttributeCast<DateTime<FixedOffset>> for LocalDatetime {
    fn cast(&self, name: &str, value: &Value) -> Result<DateTime<FixedOffset>, ValidationError> {
        value
            .as_str()
            .and_then(|text| self.parse(text))
            .ok_or_else(|| invalid_datetime(name))
    }
}

impl AttributeCast<Option<DateTime<FixedOffset>>> for LocalDatetime {
    fn cast(&self, name: &str, value: &Value) -> Result<Option<DateTime<FixedOffset>>, ValidationError> {
        match value {
            Value::Null => Ok(None),
            _ => AttributeCast::<DateTime<FixedOffset>>::cast(self, name, value).map(Some),
        }
    }
}
