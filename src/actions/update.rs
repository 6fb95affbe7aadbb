use sea_orm::{DatabaseConnection, IntoActiveModel};

use super::assign_attributes;
use crate::context::ActionResult;
use crate::errors::ApiError;
use crate::response::ResourceResponse;
use crate::traits::{ContextOf, ResourceController};

/// `PUT|PATCH /{plural}/{id}` on a context with the model already bound.
///
/// # Errors
///
/// `Forbidden` when the policy denies `update`, `ValidationFailed` for
/// attributes of the wrong type, `Database` when the update fails.
pub async fn update<C: ResourceController>(
    controller: &C,
    db: &DatabaseConnection,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, "update: validate");
    controller.validate_update(&mut ctx).await?;
    controller.authorize_update(&mut ctx).await?;

    let original = ctx.take_model()?;
    let mut model = original.clone().into_active_model();
    let updatable = controller.updatable();
    let assigned = assign_attributes(&mut model, ctx.request.input(), updatable.as_deref())?;
    tracing::debug!(resource = C::RESOURCE_NAME, ?assigned, "update: assigned attributes");
    controller.before_save_updated(&mut ctx, &mut model).await?;

    let saved = controller.save_updated(db, &mut ctx, original, model).await?;
    ctx.model = Some(saved.clone());
    ctx.result = Some(ActionResult::One(saved));
    controller.postprocess_update(&mut ctx).await
}
