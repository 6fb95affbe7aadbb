#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use restful_actions::{
    ApiConfig, ApiError, ContextOf, FormValidator, NestedResourceController, NestedResourceRoutes,
    PaginationPolicy, Policy, ResourceController, ResourceRequest, ResourceRoutes, Subject,
    ValidationError, ValidationErrors, Verb, policy::Ability,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, ModelTrait, QueryFilter, QueryOrder, Schema, Select,
};
use serde_json::{Map, Value};
use tower::ServiceExt;

pub mod author;
pub mod post;

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to database");

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    for statement in [
        schema.create_table_from_entity(author::Entity),
        schema.create_table_from_entity(post::Entity),
    ] {
        db.execute(backend.build(&statement))
            .await
            .expect("Failed to create table");
    }

    db
}

pub async fn seed_posts(db: &DatabaseConnection, count: usize) {
    for i in 1..=count {
        post::ActiveModel {
            title: Set(format!("Post {i}")),
            secret: Set(None),
            author_id: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert post");
    }
}

pub async fn seed_author(db: &DatabaseConnection, name: &str, posts: &[&str]) -> author::Model {
    let author = author::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert author");

    for title in posts {
        post::ActiveModel {
            title: Set((*title).to_string()),
            secret: Set(None),
            author_id: Set(Some(author.id)),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert post");
    }

    author
}

/// Grants reads, denies writes.
pub struct ReadOnly;

#[async_trait]
impl Policy<post::Model> for ReadOnly {
    async fn allows(&self, _request: &ResourceRequest, ability: Ability, _subject: Subject<'_, post::Model>) -> bool {
        matches!(ability, Ability::ViewAny | Ability::View)
    }
}

/// Accepts any body as already validated.
pub struct TrustedForm;

impl FormValidator for TrustedForm {
    fn validate(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, ValidationErrors> {
        Ok(input.clone())
    }
}

/// Requires a non-empty title and passes only the title and secret on.
pub struct TitledForm;

impl FormValidator for TitledForm {
    fn validate(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut safe = Map::new();
        match input.get("title").and_then(Value::as_str) {
            Some(title) if !title.trim().is_empty() => {
                safe.insert("title".into(), Value::from(title));
            }
            _ => errors.add(ValidationError::new("title", "The title field is required.")),
        }
        if let Some(secret) = input.get("secret") {
            safe.insert("secret".into(), secret.clone());
        }
        errors.result().map(|()| safe)
    }
}

#[derive(Default)]
pub struct Posts {
    pub pagination: PaginationPolicy,
    pub read_only: bool,
    pub trusted_form: bool,
    /// Validator for both store and update, used unless `trusted_form` is set.
    pub form: Option<&'static dyn FormValidator>,
}

impl Posts {
    pub fn with_form(form: &'static dyn FormValidator) -> Self {
        Self {
            form: Some(form),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ResourceController for Posts {
    type Entity = post::Entity;
    type Model = post::Model;
    type ActiveModel = post::ActiveModel;
    type Parent = ();

    const RESOURCE_NAME: &'static str = "post";

    fn pagination(&self) -> PaginationPolicy {
        self.pagination
    }

    fn policy(&self) -> &dyn Policy<post::Model> {
        if self.read_only { &ReadOnly } else { &restful_actions::AllowAll }
    }

    fn store_form(&self) -> Option<&dyn FormValidator> {
        self.trusted_form
            .then_some(&TrustedForm as &dyn FormValidator)
            .or(self.form)
    }

    fn update_form(&self) -> Option<&dyn FormValidator> {
        self.form
    }

    fn build_index_query(&self, ctx: &ContextOf<Self>) -> Result<Option<Select<post::Entity>>, ApiError> {
        let query = ctx.query()?.clone().order_by_asc(post::Column::Id);
        Ok(Some(match ctx.request.param("title") {
            Some(title) => query.filter(post::Column::Title.eq(title)),
            None => query,
        }))
    }
}

pub struct Authors;

#[async_trait]
impl ResourceController for Authors {
    type Entity = author::Entity;
    type Model = author::Model;
    type ActiveModel = author::ActiveModel;
    type Parent = ();

    const RESOURCE_NAME: &'static str = "author";

    fn build_index_query(&self, _ctx: &ContextOf<Self>) -> Result<Option<Select<author::Entity>>, ApiError> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct AuthorPosts {
    pub form: Option<&'static dyn FormValidator>,
}

impl AuthorPosts {
    pub fn with_form(form: &'static dyn FormValidator) -> Self {
        Self { form: Some(form) }
    }
}

#[async_trait]
impl ResourceController for AuthorPosts {
    type Entity = post::Entity;
    type Model = post::Model;
    type ActiveModel = post::ActiveModel;
    type Parent = author::Model;

    const RESOURCE_NAME: &'static str = "post";

    fn pagination(&self) -> PaginationPolicy {
        PaginationPolicy::on_request()
    }

    fn store_form(&self) -> Option<&dyn FormValidator> {
        self.form
    }

    fn build_index_query(&self, ctx: &ContextOf<Self>) -> Result<Option<Select<post::Entity>>, ApiError> {
        Ok(Some(ctx.query()?.clone().order_by_asc(post::Column::Id)))
    }
}

#[async_trait]
impl NestedResourceController for AuthorPosts {
    type ParentEntity = author::Entity;

    const PARENT_NAME: &'static str = "author";

    fn related_query(&self, parent: &author::Model) -> Select<post::Entity> {
        parent.find_related(post::Entity)
    }

    fn attach_to_parent(&self, parent: &author::Model, model: &mut post::ActiveModel) {
        model.author_id = Set(Some(parent.id));
    }
}

pub fn setup_posts_app(db: DatabaseConnection, posts: Posts) -> Router {
    ResourceRoutes::new("posts", posts).router(db)
}

pub fn setup_nested_app(db: DatabaseConnection) -> Router {
    setup_nested_app_with(db, AuthorPosts::default())
}

pub fn setup_nested_app_with(db: DatabaseConnection, author_posts: AuthorPosts) -> Router {
    Router::new()
        .merge(ResourceRoutes::new("authors", Authors).router(db.clone()))
        .merge(NestedResourceRoutes::new("authors", "posts", author_posts).router(db))
}

/// Flat posts plus author-scoped collections, without duplicate member routes.
pub fn setup_flat_and_nested_app(db: DatabaseConnection) -> Router {
    Router::new()
        .merge(ResourceRoutes::new("authors", Authors).only(&[Verb::Show]).router(db.clone()))
        .merge(ResourceRoutes::new("posts", Posts::default()).router(db.clone()))
        .merge(
            NestedResourceRoutes::new("authors", "posts", AuthorPosts::default())
                .collection_only()
                .router(db),
        )
}

pub fn setup_debug_app(db: DatabaseConnection) -> Router {
    ResourceRoutes::new("posts", Posts::default())
        .with_config(ApiConfig {
            debug: true,
            app_url: None,
        })
        .router(db)
}

/// Sends one request and returns the status and decoded body (`Null` when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn post_count(db: &DatabaseConnection) -> usize {
    post::Entity::find().all(db).await.unwrap().len()
}

pub async fn find_post(db: &DatabaseConnection, id: i32) -> Option<post::Model> {
    post::Entity::find_by_id(id).one(db).await.unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn raw_request(uri: &str) -> ResourceRequest {
    ResourceRequest::for_uri(uri.parse().unwrap())
}

/// Asserts the `data`/`links`/`meta` envelope of a paginated index.
pub fn assert_resource_paginated(body: &Value) {
    assert!(body["data"].is_array(), "data should be an array: {body}");

    let links = &body["links"];
    for key in ["first", "last"] {
        assert!(links[key].is_string(), "links.{key} should be a url: {body}");
    }
    for key in ["next", "prev"] {
        assert!(
            links[key].is_string() || links[key].is_null(),
            "links.{key} should be a url or null: {body}"
        );
    }

    let meta = &body["meta"];
    for key in ["total", "per_page", "current_page", "last_page"] {
        assert!(meta[key].is_u64(), "meta.{key} should be a non-negative integer: {body}");
    }
    assert!(meta["path"].is_string(), "meta.path should be a url: {body}");
    for key in ["from", "to"] {
        assert!(
            meta[key].is_u64() || meta[key].is_null(),
            "meta.{key} should be an integer or null: {body}"
        );
    }
}

pub async fn posts_titled(db: &DatabaseConnection, title: &str) -> Vec<post::Model> {
    post::Entity::find()
        .filter(post::Column::Title.eq(title))
        .all(db)
        .await
        .unwrap()
}
