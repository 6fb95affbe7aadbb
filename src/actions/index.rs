use sea_orm::DatabaseConnection;

use crate::errors::ApiError;
use crate::response::ResourceResponse;
use crate::traits::{ContextOf, ResourceController};

/// `GET /{plural}`
///
/// validate → authorize (`viewAny`) → setup query → refine query →
/// execute (paginated or not) → postprocess.
///
/// # Errors
///
/// `ValidationFailed` for bad query parameters, `Forbidden` (403) when the
/// policy denies, `Database` when the query fails.
pub async fn index<C: ResourceController>(
    controller: &C,
    db: &DatabaseConnection,
    mut ctx: ContextOf<C>,
) -> Result<ResourceResponse, ApiError> {
    tracing::debug!(resource = C::RESOURCE_NAME, "index: validate");
    controller.validate_index(&mut ctx).await?;
    tracing::debug!(resource = C::RESOURCE_NAME, "index: authorize");
    controller.authorize_index(&mut ctx).await?;
    controller.setup_query(&mut ctx).await?;
    refine_query(controller, &mut ctx)?;
    tracing::debug!(resource = C::RESOURCE_NAME, "index: execute");
    controller.execute_index(db, &mut ctx).await?;
    controller.postprocess_index(&mut ctx).await
}

/// Applies `build_index_query`, keeping the current query on `Ok(None)`.
pub(crate) fn refine_query<C: ResourceController>(
    controller: &C,
    ctx: &mut ContextOf<C>,
) -> Result<(), ApiError> {
    ctx.query()?;
    if let Some(query) = controller.build_index_query(ctx)? {
        ctx.query = Some(query);
    }
    Ok(())
}
