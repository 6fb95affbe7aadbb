//! Pipelines for resources scoped under a bound parent.
//!
//! Index and count read the parent's related collection instead of the whole
//! table; store attaches the new model to the parent before inserting.
//! Member actions (show, update, destroy) are shallow and reuse the flat
//! pipelines.

use sea_orm::DatabaseConnection;

use super::assign_attributes;
use super::index::refine_query;
use crate::context::ActionResult;
use crate::errors::ApiError;
use crate::response::ResourceResponse;
use crate::traits::{ContextOf, NestedResourceController};

/// `GET /{parents}/{parent}/{plural}`
///
/// # Errors
///
/// Same as the flat [`index`](super::index()); an internal error when no
/// parent is bound.
pub async fn index<C: NestedResourceController>(
    controller: &C,
    db: &DatabaseConnection,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, parent = C::PARENT_NAME, "nested index: validate");
    controller.validate_index(&mut ctx).await?;
    controller.authorize_index(&mut ctx).await?;
    controller.setup_nested_query(&mut ctx).await?;
    refine_query(controller, &mut ctx)?;
    tracing::debug!(resource = C::RESOURCE_NAME, parent = C::PARENT_NAME, "nested index: execute");
    controller.execute_index(db, &mut ctx).await?;
    controller.postprocess_index(&mut ctx).await
}

/// `GET /{parents}/{parent}/{plural}/count`
///
/// # Errors
///
/// Same as [`index`].
pub async fn count<C: NestedResourceController>(
    controller: &C,
    db: &DatabaseConnection,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, parent = C::PARENT_NAME, "nested count: validate");
    controller.validate_index(&mut ctx).await?;
    controller.authorize_index(&mut ctx).await?;
    controller.setup_nested_query(&mut ctx).await?;
    refine_query(controller, &mut ctx)?;
    controller.execute_count(db, &mut ctx).await?;
    controller.postprocess_count(&mut ctx).await
}

/// `POST /{parents}/{parent}/{plural}`; responds 201 like the flat store.
///
/// # Errors
///
/// Same as the flat [`store`](super::store()).
pub async fn store<C: NestedResourceController>(
    controller: &C,
    db: &DatabaseConnection,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, parent = C::PARENT_NAME, "nested store: validate");
    controller.validate_store(&mut ctx).await?;
    controller.authorize_store(&mut ctx).await?;

    let mut model = controller.create_model(&mut ctx).await?;
    let fillable = controller.fillable();
    assign_attributes(&mut model, ctx.request.input(), fillable.as_deref())?;
    controller.before_save_created(&mut ctx, &mut model).await?;

    let saved = controller.save_nested_created(db, &mut ctx, model).await?;
    ctx.model = Some(saved.clone());
    ctx.result = Some(ActionResult::One(saved));
    controller.postprocess_store(&mut ctx).await
}
