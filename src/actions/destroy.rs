use sea_orm::DatabaseConnection;

use crate::errors::ApiError;
use crate::response::ResourceResponse;
use crate::traits::{ContextOf, ResourceController};

/// `DELETE /{plural}/{id}`; responds 204 with no body.
///
/// # Errors
///
/// `Forbidden` when the policy denies `delete`, `Database` when the delete fails.
pub async fn destroy<C: ResourceController>(
    controller: &C,
    db: &DatabaseConnection,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, "destroy: validate");
    controller.validate_destroy(&mut ctx).await?;
    controller.authorize_destroy(&mut ctx).await?;
    let model = ctx.take_model()?;
    tracing::debug!(resource = C::RESOURCE_NAME, "destroy: delete");
    controller.delete_model(db, &mut ctx, model).await?;
    ctx.result = None;
    controller.postprocess_destroy(&mut ctx).await
}
