//! RESTful CRUD action pipelines over Sea-ORM entities, served with Axum.
//!
//! A resource implements [`ResourceController`]; [`ResourceRoutes`] and
//! [`NestedResourceRoutes`] mount index, show, store, update, destroy and
//! count endpoints that run the fixed pipelines in [`actions`]. Every failure
//! is rendered as `{"error": {"code", "message", ...}}`.

pub mod actions;
pub mod casts;
pub mod config;
pub mod context;
pub mod errors;
pub mod exception;
pub mod openapi;
pub mod pagination;
pub mod policy;
pub mod request;
pub mod response;
pub mod routes;
pub mod traits;
pub mod validation;

pub use casts::{AttributeCast, LocalDatetime};
pub use config::ApiConfig;
pub use context::{ActionResult, ResourceContext};
pub use errors::{ApiError, ErrorEnvelope};
pub use exception::{ApiException, AsErrorCode, ErrorCode};
pub use pagination::{Paginated, PaginationPolicy};
pub use policy::{Ability, AllowAll, Policy, Subject};
pub use request::{Input, ResourceRequest};
pub use response::ResourceResponse;
pub use routes::{NestedResourceRoutes, ResourceRoutes, Verb};
pub use traits::{AssignAttributes, ContextOf, NestedResourceController, ResourceController};
pub use validation::{FormValidator, ParamRule, ValidationError, ValidationErrors};

#[doc(hidden)]
pub mod __private {
    pub use sea_orm::ActiveValue;
    pub use serde_json;
}
