//! Success response shapes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Final output of a pipeline: a status and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ResourceResponse {
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    #[must_use]
    pub const fn created(body: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Some(body),
        }
    }

    #[must_use]
    pub const fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }
}

impl IntoResponse for ResourceResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// `{"data": null, "total": n}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    #[schema(value_type = Object, nullable)]
    pub data: Option<Value>,
    pub total: u64,
}

impl CountResponse {
    #[must_use]
    pub const fn new(total: u64) -> Self {
        Self { data: None, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_serializes_null_data() {
        assert_eq!(
            serde_json::to_value(CountResponse::new(7)).unwrap(),
            json!({"data": null, "total": 7})
        );
    }

    #[test]
    fn no_content_has_empty_body() {
        let response = ResourceResponse::no_content().into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
