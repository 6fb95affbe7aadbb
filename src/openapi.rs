//! OpenAPI components for the response shapes produced by the pipelines.
//!
//! Merge [`ResourceApiDoc`] into an application's document to reference the
//! error envelope and pagination schemas from its own paths.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::errors::{ErrorObject, ErrorResponse};
use crate::pagination::{PaginationLinks, PaginationMeta};
use crate::response::CountResponse;

/// Query parameters accepted by index and count.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page size, clamped to the controller's maximum
    #[param(minimum = 1)]
    pub limit: Option<u64>,
    /// 1-based page number
    #[param(minimum = 1)]
    pub page: Option<u64>,
}

/// `{"data": [...], "links": {...}, "meta": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Value>,
    pub links: PaginationLinks,
    pub meta: PaginationMeta,
}

#[derive(OpenApi)]
#[openapi(components(schemas(
    ErrorObject,
    ErrorResponse,
    CountResponse,
    PaginationMeta,
    PaginationLinks,
    PaginatedResponse
)))]
pub struct ResourceApiDoc;
