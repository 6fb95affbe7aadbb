//! Axum routers and handlers for flat and nested resources.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .merge(ResourceRoutes::new("posts", Posts).except(&[Verb::Destroy]).router(db.clone()))
//!     .merge(NestedResourceRoutes::new("authors", "posts", AuthorPosts).router(db));
//! ```

use axum::{
    Router,
    body::Bytes,
    extract::{Path, Request, State, rejection::PathRejection},
    response::{IntoResponse, Response},
    routing::{MethodRouter, delete, get, post, put},
};
use sea_orm::{DatabaseConnection, EntityTrait, FromQueryResult, PrimaryKeyTrait};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

use crate::actions;
use crate::config::ApiConfig;
use crate::context::ResourceContext;
use crate::errors::ApiError;
use crate::request::{Input, ResourceRequest};
use crate::response::ResourceResponse;
use crate::traits::{ContextOf, NestedResourceController, ResourceController};
use crate::validation::FormValidator;

/// Largest request body read by the handlers.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

pub type PrimaryKeyOf<E> = <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

/// Primary key types usable as route parameters.
pub trait RouteKey: DeserializeOwned + fmt::Display + Send + Sync + 'static {}

impl<T: DeserializeOwned + fmt::Display + Send + Sync + 'static> RouteKey for T {}

/// Shared state of one resource router.
pub struct ResourceState<C> {
    pub controller: Arc<C>,
    pub db: DatabaseConnection,
    pub config: ApiConfig,
}

impl<C> Clone for ResourceState<C> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            db: self.db.clone(),
            config: self.config.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Index,
    Count,
    Store,
    Show,
    Update,
    Destroy,
}

impl Verb {
    pub const ALL: [Self; 6] = [
        Self::Index,
        Self::Count,
        Self::Store,
        Self::Show,
        Self::Update,
        Self::Destroy,
    ];

    /// Verbs served on the collection path.
    pub const COLLECTION: [Self; 3] = [Self::Index, Self::Count, Self::Store];

    /// Verbs served on the member path.
    pub const MEMBER: [Self; 3] = [Self::Show, Self::Update, Self::Destroy];
}

/// Router builder for `/{plural}` resources.
pub struct ResourceRoutes<C> {
    plural: String,
    controller: C,
    verbs: Vec<Verb>,
    config: ApiConfig,
}

impl<C> ResourceRoutes<C>
where
    C: ResourceController,
    PrimaryKeyOf<C::Entity>: RouteKey,
{
    pub fn new(plural: impl Into<String>, controller: C) -> Self {
        Self {
            plural: plural.into(),
            controller,
            verbs: Verb::ALL.to_vec(),
            config: ApiConfig::default(),
        }
    }

    /// Serves only `verbs`.
    #[must_use]
    pub fn only(mut self, verbs: &[Verb]) -> Self {
        self.verbs.retain(|verb| verbs.contains(verb));
        self
    }

    /// Serves every verb except `verbs`.
    #[must_use]
    pub fn except(mut self, verbs: &[Verb]) -> Self {
        self.verbs.retain(|verb| !verbs.contains(verb));
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn router(self, db: DatabaseConnection) -> Router {
        let plural = self.plural.trim_matches('/').to_string();
        let enabled = |verb| self.verbs.contains(&verb);

        let collection = merge_methods([
            enabled(Verb::Index).then(|| get(index_handler::<C>)),
            enabled(Verb::Store).then(|| post(store_handler::<C>)),
        ]);
        let count = merge_methods([enabled(Verb::Count).then(|| get(count_handler::<C>))]);
        let member = member_methods::<C>(&self.verbs);

        let mut router = Router::new();
        if let Some(methods) = collection {
            router = router.route(&format!("/{plural}"), methods);
        }
        if let Some(methods) = count {
            router = router.route(&format!("/{plural}/count"), methods);
        }
        if let Some(methods) = member {
            router = router.route(&format!("/{plural}/{{id}}"), methods);
        }
        tracing::debug!(resource = C::RESOURCE_NAME, verbs = ?self.verbs, "registered resource routes");

        router.with_state(ResourceState {
            controller: Arc::new(self.controller),
            db,
            config: self.config,
        })
    }
}

/// Router builder for `/{parents}/{id}/{plural}` resources with shallow
/// member routes at `/{plural}/{id}`.
///
/// The parent key uses the `{id}` segment name so the parent's own
/// [`ResourceRoutes`] can be merged into the same router.
///
/// The member routes overlap with a flat [`ResourceRoutes`] for the same
/// plural, and Axum panics when both are merged. Serve the nested side with
/// [`collection_only`](Self::collection_only) in that case:
///
/// ```rust,ignore
/// let app = Router::new()
///     .merge(ResourceRoutes::new("posts", Posts).router(db.clone()))
///     .merge(NestedResourceRoutes::new("authors", "posts", AuthorPosts).collection_only().router(db));
/// ```
pub struct NestedResourceRoutes<C> {
    parents: String,
    plural: String,
    controller: C,
    verbs: Vec<Verb>,
    config: ApiConfig,
}

impl<C> NestedResourceRoutes<C>
where
    C: NestedResourceController,
    C::Parent: FromQueryResult,
    PrimaryKeyOf<C::Entity>: RouteKey,
    PrimaryKeyOf<C::ParentEntity>: RouteKey,
{
    pub fn new(parents: impl Into<String>, plural: impl Into<String>, controller: C) -> Self {
        Self {
            parents: parents.into(),
            plural: plural.into(),
            controller,
            verbs: Verb::ALL.to_vec(),
            config: ApiConfig::default(),
        }
    }

    #[must_use]
    pub fn only(mut self, verbs: &[Verb]) -> Self {
        self.verbs.retain(|verb| verbs.contains(verb));
        self
    }

    #[must_use]
    pub fn except(mut self, verbs: &[Verb]) -> Self {
        self.verbs.retain(|verb| !verbs.contains(verb));
        self
    }

    /// Serves only the parent-scoped index, count and store routes.
    #[must_use]
    pub fn collection_only(self) -> Self {
        self.only(&Verb::COLLECTION)
    }

    #[must_use]
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn router(self, db: DatabaseConnection) -> Router {
        let parents = self.parents.trim_matches('/').to_string();
        let plural = self.plural.trim_matches('/').to_string();
        let enabled = |verb| self.verbs.contains(&verb);

        let collection = merge_methods([
            enabled(Verb::Index).then(|| get(nested_index_handler::<C>)),
            enabled(Verb::Store).then(|| post(nested_store_handler::<C>)),
        ]);
        let count = merge_methods([enabled(Verb::Count).then(|| get(nested_count_handler::<C>))]);
        let member = member_methods::<C>(&self.verbs);

        let mut router = Router::new();
        if let Some(methods) = collection {
            router = router.route(&format!("/{parents}/{{id}}/{plural}"), methods);
        }
        if let Some(methods) = count {
            router = router.route(&format!("/{parents}/{{id}}/{plural}/count"), methods);
        }
        if let Some(methods) = member {
            router = router.route(&format!("/{plural}/{{id}}"), methods);
        }
        tracing::debug!(
            resource = C::RESOURCE_NAME,
            parent = C::PARENT_NAME,
            verbs = ?self.verbs,
            "registered nested resource routes"
        );

        router.with_state(ResourceState {
            controller: Arc::new(self.controller),
            db,
            config: self.config,
        })
    }
}

fn merge_methods<S, const N: usize>(methods: [Option<MethodRouter<S>>; N]) -> Option<MethodRouter<S>>
where
    S: Clone + Send + Sync + 'static,
{
    methods.into_iter().flatten().reduce(MethodRouter::merge)
}

fn member_methods<C>(verbs: &[Verb]) -> Option<MethodRouter<ResourceState<C>>>
where
    C: ResourceController,
    PrimaryKeyOf<C::Entity>: RouteKey,
{
    let enabled = |verb| verbs.contains(&verb);
    merge_methods([
        enabled(Verb::Show).then(|| get(show_handler::<C>)),
        enabled(Verb::Update).then(|| put(update_handler::<C>).patch(update_handler::<C>)),
        enabled(Verb::Destroy).then(|| delete(destroy_handler::<C>)),
    ])
}

fn respond(result: Result<ResourceResponse, ApiError>, config: &ApiConfig) -> Response {
    match result {
        Ok(response) => response.into_response(),
        Err(err) => err.render(config.debug),
    }
}

/// Splits the request and decodes its JSON body.
///
/// With a form validator the body is validated and becomes trusted input;
/// otherwise it stays raw.
async fn read_request(
    request: Request,
    form: Option<&dyn FormValidator>,
    config: &ApiConfig,
) -> Result<ResourceRequest, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|_| ApiError::invalid_field("body", "The request body could not be read."))?;
    let values = parse_body(&bytes)?;

    let input = match form {
        Some(form) => Input::Validated(form.validate(&values)?),
        None => Input::Raw(values),
    };
    Ok(ResourceRequest::from_parts(parts, input).with_base_url(config.app_url.clone()))
}

fn parse_body(bytes: &Bytes) -> Result<Map<String, Value>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice(bytes) {
        Ok(Value::Object(values)) => Ok(values),
        Ok(_) => Err(ApiError::invalid_field("body", "The request body must be a JSON object.")),
        Err(_) => Err(ApiError::invalid_field("body", "The request body must be valid JSON.")),
    }
}

fn route_key<K>(path: Result<Path<K>, PathRejection>, resource: &str) -> Result<K, ApiError> {
    path.map(|Path(key)| key).map_err(|rejection| {
        tracing::debug!(resource, %rejection, "unmatched route key");
        ApiError::not_found(resource, None)
    })
}

/// Loads the entity addressed by a route key.
async fn find_model<E>(
    db: &DatabaseConnection,
    key: PrimaryKeyOf<E>,
    resource: &str,
) -> Result<E::Model, ApiError>
where
    E: EntityTrait,
    PrimaryKeyOf<E>: RouteKey,
{
    let id = key.to_string();
    E::find_by_id(key)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(resource, Some(id)))
}

async fn bind_member<C>(
    state: &ResourceState<C>,
    path: Result<Path<PrimaryKeyOf<C::Entity>>, PathRejection>,
    request: Request,
    form: Option<&dyn FormValidator>,
) -> Result<ContextOf<C>, ApiError>
where
    C: ResourceController,
    PrimaryKeyOf<C::Entity>: RouteKey,
{
    let key = route_key(path, C::RESOURCE_NAME)?;
    let model = find_model::<C::Entity>(&state.db, key, C::RESOURCE_NAME).await?;
    let request = read_request(request, form, &state.config).await?;
    Ok(ResourceContext::new(request).with_model(model))
}

async fn bind_parent<C>(
    state: &ResourceState<C>,
    path: Result<Path<PrimaryKeyOf<C::ParentEntity>>, PathRejection>,
    request: Request,
    form: Option<&dyn FormValidator>,
) -> Result<ContextOf<C>, ApiError>
where
    C: NestedResourceController,
    C::Parent: FromQueryResult,
    PrimaryKeyOf<C::ParentEntity>: RouteKey,
{
    let key = route_key(path, C::PARENT_NAME)?;
    let parent = find_model::<C::ParentEntity>(&state.db, key, C::PARENT_NAME).await?;
    let request = read_request(request, form, &state.config).await?;
    Ok(ResourceContext::new(request).with_parent(parent))
}

async fn index_handler<C: ResourceController>(
    State(state): State<ResourceState<C>>,
    request: Request,
) -> Response {
    let result = match read_request(request, None, &state.config).await {
        Ok(request) => actions::index(&*state.controller, &state.db, ResourceContext::new(request)).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}

async fn count_handler<C: ResourceController>(
    State(state): State<ResourceState<C>>,
    request: Request,
) -> Response {
    let result = match read_request(request, None, &state.config).await {
        Ok(request) => actions::count(&*state.controller, &state.db, ResourceContext::new(request)).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}

async fn store_handler<C: ResourceController>(
    State(state): State<ResourceState<C>>,
    request: Request,
) -> Response {
    let result = match read_request(request, state.controller.store_form(), &state.config).await {
        Ok(request) => actions::store(&*state.controller, &state.db, ResourceContext::new(request)).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}

async fn show_handler<C>(
    State(state): State<ResourceState<C>>,
    path: Result<Path<PrimaryKeyOf<C::Entity>>, PathRejection>,
    request: Request,
) -> Response
where
    C: ResourceController,
    PrimaryKeyOf<C::Entity>: RouteKey,
{
    let result = match bind_member(&state, path, request, None).await {
        Ok(ctx) => actions::show(&*state.controller, ctx).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}

async fn update_handler<C>(
    State(state): State<ResourceState<C>>,
    path: Result<Path<PrimaryKeyOf<C::Entity>>, PathRejection>,
    request: Request,
) -> Response
where
    C: ResourceController,
    PrimaryKeyOf<C::Entity>: RouteKey,
{
    let form = state.controller.update_form();
    let result = match bind_member(&state, path, request, form).await {
        Ok(ctx) => actions::update(&*state.controller, &state.db, ctx).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}

async fn destroy_handler<C>(
    State(state): State<ResourceState<C>>,
    path: Result<Path<PrimaryKeyOf<C::Entity>>, PathRejection>,
    request: Request,
) -> Response
where
    C: ResourceController,
    PrimaryKeyOf<C::Entity>: RouteKey,
{
    let result = match bind_member(&state, path, request, None).await {
        Ok(ctx) => actions::destroy(&*state.controller, &state.db, ctx).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}

async fn nested_index_handler<C>(
    State(state): State<ResourceState<C>>,
    path: Result<Path<PrimaryKeyOf<C::ParentEntity>>, PathRejection>,
    request: Request,
) -> Response
where
    C: NestedResourceController,
    C::Parent: FromQueryResult,
    PrimaryKeyOf<C::ParentEntity>: RouteKey,
{
    let result = match bind_parent(&state, path, request, None).await {
        Ok(ctx) => actions::nested::index(&*state.controller, &state.db, ctx).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}

async fn nested_count_handler<C>(
    State(state): State<ResourceState<C>>,
    path: Result<Path<PrimaryKeyOf<C::ParentEntity>>, PathRejection>,
    request: Request,
) -> Response
where
    C: NestedResourceController,
    C::Parent: FromQueryResult,
    PrimaryKeyOf<C::ParentEntity>: RouteKey,
{
    let result = match bind_parent(&state, path, request, None).await {
        Ok(ctx) => actions::nested::count(&*state.controller, &state.db, ctx).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}

async fn nested_store_handler<C>(
    State(state): State<ResourceState<C>>,
    path: Result<Path<PrimaryKeyOf<C::ParentEntity>>, PathRejection>,
    request: Request,
) -> Response
where
    C: NestedResourceController,
    C::Parent: FromQueryResult,
    PrimaryKeyOf<C::ParentEntity>: RouteKey,
{
    let form = state.controller.store_form();
    let result = match bind_parent(&state, path, request, form).await {
        Ok(ctx) => actions::nested::store(&*state.controller, &state.db, ctx).await,
        Err(err) => Err(err),
    };
    respond(result, &state.config)
}
