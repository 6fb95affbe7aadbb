use sea_orm::DatabaseConnection;

use super::assign_attributes;
use crate::context::ActionResult;
use crate::errors::ApiError;
use crate::response::ResourceResponse;
use crate::traits::{ContextOf, ResourceController};

/// `POST /{plural}`; responds 201 with the stored resource.
///
/// validate → authorize (`create`) → create model → assign attributes →
/// before-save hook → insert → postprocess.
///
/// # Errors
///
/// `Forbidden` when the policy denies, `ValidationFailed` for attributes of
/// the wrong type, `Database` when the insert fails.
pub async fn store<C: ResourceController>(
    controller: &C,
    db: &DatabaseConnection,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, "store: validate");
    controller.validate_store(&mut ctx).await?;
    controller.authorize_store(&mut ctx).await?;

    let mut model = controller.create_model(&mut ctx).await?;
    let fillable = controller.fillable();
    let assigned = assign_attributes(&mut model, ctx.request.input(), fillable.as_deref())?;
    tracing::debug!(resource = C::RESOURCE_NAME, ?assigned, "store: assigned attributes");
    controller.before_save_created(&mut ctx, &mut model).await?;

    let saved = controller.save_created(db, &mut ctx, model).await?;
    ctx.model = Some(saved.clone());
    ctx.result = Some(ActionResult::One(saved));
    controller.postprocess_store(&mut ctx).await
}
