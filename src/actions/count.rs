use sea_orm::DatabaseConnection;

use super::index::refine_query;
use crate::errors::ApiError;
use crate::response::ResourceResponse;
use crate::traits::{ContextOf, ResourceController};

/// `GET /{plural}/count`
///
/// Runs the index steps up to the refined query, then counts instead of
/// fetching. Responds with `{"data": null, "total": n}`.
///
/// # Errors
///
/// Same as [`index`](super::index()).
pub async fn count<C: ResourceController>(
    controller: &C,
    db: &DatabaseConnection,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, "count: validate");
    controller.validate_index(&mut ctx).await?;
    controller.authorize_index(&mut ctx).await?;
    controller.setup_query(&mut ctx).await?;
    refine_query(controller, &mut ctx)?;
    tracing::debug!(resource = C::RESOURCE_NAME, "count: execute");
    controller.execute_count(db, &mut ctx).await?;
    controller.postprocess_count(&mut ctx).await
}
