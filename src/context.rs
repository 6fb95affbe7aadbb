//! Per-request pipeline state.

use sea_orm::{EntityTrait, Select};

use crate::errors::ApiError;
use crate::pagination::Paginated;
use crate::request::ResourceRequest;

/// Raw output of an execute step, before postprocessing.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult<M> {
    One(M),
    Many(Vec<M>),
    Page(Paginated<M>),
    Count(u64),
}

/// State threaded through one pipeline run.
///
/// Created by the route handler, owned by the pipeline and dropped when it
/// returns. Each field is populated by a specific step; reading one before
/// that step ran is an internal error.
#[derive(Debug)]
pub struct ResourceContext<E: EntityTrait, P = ()> {
    pub request: ResourceRequest,
    pub model: Option<E::Model>,
    pub parent_model: Option<P>,
    pub query: Option<Select<E>>,
    pub result: Option<ActionResult<E::Model>>,
}

impl<E: EntityTrait, P> ResourceContext<E, P> {
    #[must_use]
    pub const fn new(request: ResourceRequest) -> Self {
        Self {
            request,
            model: None,
            parent_model: None,
            query: None,
            result: None,
        }
    }

    /// Binds the entity loaded from the route.
    #[must_use]
    pub fn with_model(mut self, model: E::Model) -> Self {
        self.model = Some(model);
        self
    }

    /// Binds the parent entity of a nested route.
    #[must_use]
    pub fn with_parent(mut self, parent: P) -> Self {
        self.parent_model = Some(parent);
        self
    }

    /// # Errors
    ///
    /// Internal error when no model is bound.
    pub fn model(&self) -> Result<&E::Model, ApiError> {
        self.model.as_ref().ok_or_else(|| missing("model"))
    }

    /// # Errors
    ///
    /// Internal error when no model is bound.
    pub fn take_model(&mut self) -> Result<E::Model, ApiError> {
        self.model.take().ok_or_else(|| missing("model"))
    }

    /// # Errors
    ///
    /// Internal error outside nested pipelines.
    pub fn parent(&self) -> Result<&P, ApiError> {
        self.parent_model.as_ref().ok_or_else(|| missing("parent_model"))
    }

    /// # Errors
    ///
    /// Internal error when `setup_query` has not run.
    pub fn query(&self) -> Result<&Select<E>, ApiError> {
        self.query.as_ref().ok_or_else(|| missing("query"))
    }

    /// # Errors
    ///
    /// Internal error when `setup_query` has not run.
    pub fn take_query(&mut self) -> Result<Select<E>, ApiError> {
        self.query.take().ok_or_else(|| missing("query"))
    }

    /// # Errors
    ///
    /// Internal error when the execute step has not run.
    pub fn take_result(&mut self) -> Result<ActionResult<E::Model>, ApiError> {
        self.result.take().ok_or_else(|| missing("result"))
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::internal(
        "Pipeline state error",
        Some(format!("context field `{field}` read before it was populated")),
    )
}
