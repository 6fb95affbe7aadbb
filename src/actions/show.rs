use crate::context::ActionResult;
use crate::errors::ApiError;
use crate::response::ResourceResponse;
use crate::traits::{ContextOf, ResourceController};

/// `GET /{plural}/{id}` on a context with the model already bound.
///
/// # Errors
///
/// `Forbidden` when the policy denies `view`.
pub async fn show<C: ResourceController>(
    controller: &C,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, "show: validate");
    controller.validate_show(&mut ctx).await?;
    controller.authorize_show(&mut ctx).await?;
    let model = ctx.take_model()?;
    ctx.result = Some(ActionResult::One(model));
    controller.postprocess_show(&mut ctx).await
}
