//! Authorization hooks.
//!
//! Every pipeline authorizes one [`Ability`] against either the resource type
//! (index, count, store) or the bound model (show, update, destroy). The
//! decision itself belongs to the application's [`Policy`].

use async_trait::async_trait;

use crate::errors::ApiError;
use crate::request::ResourceRequest;

/// Message used when a policy denies an action.
pub const UNAUTHORIZED_ACTION: &str = "This action is unauthorized.";

/// Capability checked by a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ability {
    ViewAny,
    View,
    Create,
    Update,
    Delete,
}

impl Ability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewAny => "viewAny",
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Ability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an ability is checked against.
#[derive(Debug)]
pub enum Subject<'a, M> {
    /// The resource type, named by its singular resource name.
    Type(&'static str),
    /// A concrete model.
    Model(&'a M),
}

#[async_trait]
pub trait Policy<M: Sync>: Send + Sync {
    async fn allows(&self, request: &ResourceRequest, ability: Ability, subject: Subject<'_, M>) -> bool;
}

/// Grants every ability.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl<M: Sync> Policy<M> for AllowAll {
    async fn allows(&self, _request: &ResourceRequest, _ability: Ability, _subject: Subject<'_, M>) -> bool {
        true
    }
}

/// Fails with a 403 `FORBIDDEN` error when `policy` denies `ability`.
///
/// # Errors
///
/// Returns [`ApiError::Exception`] with status 403.
pub async fn authorize<M: Sync>(
    policy: &dyn Policy<M>,
    request: &ResourceRequest,
    ability: Ability,
    subject: Subject<'_, M>,
) -> Result<(), ApiError> {
    if policy.allows(request, ability, subject).await {
        Ok(())
    } else {
        tracing::debug!(ability = %ability, "authorization denied");
        Err(ApiError::forbidden(UNAUTHORIZED_ACTION))
    }
}
