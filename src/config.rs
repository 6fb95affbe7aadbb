//! Runtime configuration shared by every resource router.

use serde::{Deserialize, Serialize};

pub const DEBUG_VAR: &str = "APP_DEBUG";
pub const URL_VAR: &str = "APP_URL";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a boolean, got {value:?}")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var} must be an absolute URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Render server error details in error envelopes.
    pub debug: bool,
    /// Absolute prefix of generated pagination links. Links are
    /// path-relative when unset.
    pub app_url: Option<String>,
}

impl ApiConfig {
    /// Reads `APP_DEBUG` and `APP_URL` from the environment.
    ///
    /// # Errors
    ///
    /// Fails on a non-boolean `APP_DEBUG` or a relative `APP_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Fails on a non-boolean `APP_DEBUG` or a relative `APP_URL`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let debug = match lookup(DEBUG_VAR).as_deref().map(str::trim) {
            None | Some("") => false,
            Some(value) => parse_bool(value).ok_or_else(|| ConfigError::InvalidBool {
                var: DEBUG_VAR,
                value: value.to_string(),
            })?,
        };

        let app_url = match lookup(URL_VAR).filter(|value| !value.trim().is_empty()) {
            None => None,
            Some(value) => {
                url::Url::parse(value.trim()).map_err(|_| ConfigError::InvalidUrl {
                    var: URL_VAR,
                    value: value.clone(),
                })?;
                Some(value.trim().trim_end_matches('/').to_string())
            }
        };

        Ok(Self { debug, app_url })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
