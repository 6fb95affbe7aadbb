//! Request handle threaded through the action pipelines.

use axum::http::{Extensions, HeaderMap, Method, Request, Uri, request::Parts};
use serde_json::{Map, Value};

/// Request body as seen by attribute assignment.
///
/// The mode is fixed when the request is built and never changes afterwards,
/// so a pipeline cannot mix trusted and untrusted keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Output of an authoritative [`FormValidator`](crate::validation::FormValidator).
    /// Every key is assigned; the allow-list is not consulted.
    Validated(Map<String, Value>),
    /// Untrusted body. Only keys on the allow-list are assigned.
    Raw(Map<String, Value>),
}

impl Input {
    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        match self {
            Self::Validated(values) | Self::Raw(values) => values,
        }
    }

    #[must_use]
    pub const fn is_validated(&self) -> bool {
        matches!(self, Self::Validated(_))
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::Raw(Map::new())
    }
}

/// Opaque inbound request: head, decoded query parameters and body input.
#[derive(Debug)]
pub struct ResourceRequest {
    parts: Parts,
    query: Vec<(String, String)>,
    input: Input,
    base_url: Option<String>,
}

impl ResourceRequest {
    #[must_use]
    pub fn from_parts(parts: Parts, input: Input) -> Self {
        let query = parts
            .uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self {
            parts,
            query,
            input,
            base_url: None,
        }
    }

    /// A bodiless `GET` request for `uri`.
    #[must_use]
    pub fn for_uri(uri: Uri) -> Self {
        let mut request = Request::new(());
        *request.uri_mut() = uri;
        let (parts, ()) = request.into_parts();
        Self::from_parts(parts, Input::default())
    }

    /// Replaces the body input.
    #[must_use]
    pub fn with_input(mut self, input: Input) -> Self {
        self.input = input;
        self
    }

    /// Absolute prefix used when generating links (e.g. `https://api.example.com`).
    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.query.iter().any(|(key, _)| key == name)
    }

    /// First value of the query parameter `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn param_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.param(name).unwrap_or(default)
    }

    /// Decoded query parameters in request order.
    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    #[must_use]
    pub const fn input(&self) -> &Input {
        &self.input
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.parts.method
    }

    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Extensions set by upstream middleware, such as an authenticated user.
    #[must_use]
    pub const fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Request path prefixed with the base URL, without the query string.
    #[must_use]
    pub fn url(&self) -> String {
        let path = self.parts.uri.path();
        match &self.base_url {
            Some(base) => format!("{}{path}", base.trim_end_matches('/')),
            None => path.to_string(),
        }
    }
}
