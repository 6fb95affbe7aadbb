use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    IntoActiveModel, ModelTrait, PaginatorTrait, Select,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::context::{ActionResult, ResourceContext};
use crate::errors::ApiError;
use crate::pagination::{PaginationPolicy, paginate};
use crate::policy::{Ability, AllowAll, Policy, Subject, authorize};
use crate::response::{CountResponse, ResourceResponse};
use crate::validation::{FormValidator, ParamRules, ValidationError, merge_rules, validate_params};

/// Assigns request attributes onto an active model by name.
///
/// Usually implemented with [`assignable_attributes!`](crate::assignable_attributes).
pub trait AssignAttributes {
    /// Attributes mass-assignable from raw input; `None` allows every attribute.
    fn fillable() -> Option<&'static [&'static str]> {
        None
    }

    /// Sets `name` from a JSON value.
    ///
    /// Returns `Ok(false)` when the model has no attribute called `name`.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be converted to the attribute's type.
    fn set_attribute(&mut self, name: &str, value: &Value) -> Result<bool, ValidationError>;
}

/// Implements [`AssignAttributes`] for a Sea-ORM active model.
///
/// An attribute converts with `serde_json` unless it names an
/// [`AttributeCast`](crate::casts::AttributeCast) after `=>`.
///
/// ```rust,ignore
/// restful_actions::assignable_attributes!(post::ActiveModel, fillable [title, published_at] {
///     title: String,
///     secret: Option<String>,
///     published_at: Option<DateTimeWithTimeZone> => LocalDatetime::UTC,
/// });
/// ```
#[macro_export]
macro_rules! assignable_attributes {
    (@parse $name:ident, $value:ident, $ty:ty) => {
        $crate::__private::serde_json::from_value::<$ty>($value.clone()).map_err(|_| {
            $crate::validation::ValidationError::new(
                $name,
                format!("The {} field has an invalid value.", $name),
            )
        })
    };
    (@parse $name:ident, $value:ident, $ty:ty, $cast:expr) => {
        $crate::casts::AttributeCast::<$ty>::cast(&$cast, $name, $value)
    };
    (@impl $am:ty, $fillable:expr, { $($field:ident : $ty:ty $(=> $cast:expr)?),* }) => {
        impl $crate::traits::AssignAttributes for $am {
            fn fillable() -> ::core::option::Option<&'static [&'static str]> {
                $fillable
            }

            fn set_attribute(
                &mut self,
                name: &str,
                value: &$crate::__private::serde_json::Value,
            ) -> ::core::result::Result<bool, $crate::validation::ValidationError> {
                match name {
                    $(
                        stringify!($field) => {
                            let parsed: $ty =
                                $crate::assignable_attributes!(@parse name, value, $ty $(, $cast)?)?;
                            self.$field = $crate::__private::ActiveValue::Set(parsed);
                            Ok(true)
                        }
                    )*
                    _ => Ok(false),
                }
            }
        }
    };
    (
        $am:ty,
        fillable [$($fill:ident),* $(,)?]
        { $($field:ident : $ty:ty $(=> $cast:expr)?),* $(,)? }
    ) => {
        $crate::assignable_attributes!(
            @impl $am,
            Some(&[$(stringify!($fill)),*] as &[&str]),
            { $($field : $ty $(=> $cast)?),* }
        );
    };
    ($am:ty { $($field:ident : $ty:ty $(=> $cast:expr)?),* $(,)? }) => {
        $crate::assignable_attributes!(@impl $am, None, { $($field : $ty $(=> $cast)?),* });
    };
}

/// Pipeline context for controller `C`.
pub type ContextOf<C> = ResourceContext<<C as ResourceController>::Entity, <C as ResourceController>::Parent>;

/// A resource served by the action pipelines.
///
/// Every step is a method with a default; a controller overrides what it
/// needs. The order in which steps run is fixed by [`crate::actions`].
///
/// ```rust,ignore
/// struct Posts;
///
/// #[async_trait]
/// impl ResourceController for Posts {
///     type Entity = post::Entity;
///     type Model = post::Model;
///     type ActiveModel = post::ActiveModel;
///     type Parent = ();
///     const RESOURCE_NAME: &'static str = "post";
///
///     fn build_index_query(&self, ctx: &ContextOf<Self>) -> Result<Option<Select<post::Entity>>, ApiError> {
///         Ok(Some(ctx.query()?.clone().order_by_desc(post::Column::Id)))
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceController: Send + Sync + 'static {
    type Entity: EntityTrait<Model = Self::Model>;
    type Model: ModelTrait<Entity = Self::Entity>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModel>
        + Serialize
        + Send
        + Sync;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + AssignAttributes
        + Send
        + Sync;
    /// Parent model for nested controllers; `()` otherwise.
    type Parent: Send + Sync;

    /// Singular name used in not-found messages and type-level authorization.
    const RESOURCE_NAME: &'static str;

    fn pagination(&self) -> PaginationPolicy {
        PaginationPolicy::DEFAULT
    }

    fn policy(&self) -> &dyn Policy<Self::Model> {
        &AllowAll
    }

    /// Extra query-parameter rules for index and count, merged over the
    /// pagination schema.
    fn index_rules(&self) -> ParamRules {
        Vec::new()
    }

    /// Authoritative body validator for store. When set, its output is
    /// assigned without consulting [`fillable`](Self::fillable).
    fn store_form(&self) -> Option<&dyn FormValidator> {
        None
    }

    fn update_form(&self) -> Option<&dyn FormValidator> {
        None
    }

    /// Allow-list for raw store input.
    fn fillable(&self) -> Option<Vec<&'static str>> {
        <Self::ActiveModel as AssignAttributes>::fillable().map(<[_]>::to_vec)
    }

    /// Allow-list for raw update input.
    fn updatable(&self) -> Option<Vec<&'static str>> {
        self.fillable()
    }

    /// # Errors
    ///
    /// Internal error when the model cannot be serialized.
    fn to_resource(&self, model: &Self::Model) -> Result<Value, ApiError> {
        serde_json::to_value(model)
            .map_err(|e| ApiError::internal("Failed to serialize resource", Some(e.to_string())))
    }

    /// # Errors
    ///
    /// Internal error when a model cannot be serialized.
    fn to_collection(&self, models: &[Self::Model]) -> Result<Vec<Value>, ApiError> {
        models.iter().map(|model| self.to_resource(model)).collect()
    }

    // Index

    async fn validate_index(&self, ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        let rules = merge_rules(PaginationPolicy::rules(), self.index_rules());
        validate_params(&ctx.request, &rules)?;
        Ok(())
    }

    async fn authorize_index(&self, ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        authorize(
            self.policy(),
            &ctx.request,
            Ability::ViewAny,
            Subject::Type(Self::RESOURCE_NAME),
        )
        .await
    }

    async fn setup_query(&self, ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        ctx.query = Some(Self::Entity::find());
        Ok(())
    }

    /// Refines the index query. `Ok(None)` keeps the query set up so far.
    ///
    /// # Errors
    ///
    /// Any error aborts the pipeline.
    fn build_index_query(
        &self,
        ctx: &ContextOf<Self>,
    ) -> Result<Option<Select<Self::Entity>>, ApiError>;

    async fn execute_index(
        &self,
        db: &DatabaseConnection,
        ctx: &mut ContextOf<Self>,
    ) -> Result<(), ApiError> {
        let query = ctx.take_query()?;
        let policy = self.pagination();
        let result = if policy.needs_pagination_for(&ctx.request) {
            ActionResult::Page(paginate(db, query, &ctx.request, &policy).await?)
        } else {
            ActionResult::Many(query.all(db).await?)
        };
        ctx.result = Some(result);
        Ok(())
    }

    async fn postprocess_index(&self, ctx: &mut ContextOf<Self>) -> Result<ResourceResponse, ApiError> {
        match ctx.take_result()? {
            ActionResult::Many(models) => Ok(ResourceResponse::ok(json!({
                "data": self.to_collection(&models)?,
            }))),
            ActionResult::Page(page) => Ok(ResourceResponse::ok(json!({
                "data": self.to_collection(&page.data)?,
                "links": page.links,
                "meta": page.meta,
            }))),
            _ => Err(unexpected_result("index")),
        }
    }

    // Count

    async fn execute_count(
        &self,
        db: &DatabaseConnection,
        ctx: &mut ContextOf<Self>,
    ) -> Result<(), ApiError> {
        let query = ctx.take_query()?;
        let total = PaginatorTrait::count(query, db).await?;
        ctx.result = Some(ActionResult::Count(total));
        Ok(())
    }

    async fn postprocess_count(&self, ctx: &mut ContextOf<Self>) -> Result<ResourceResponse, ApiError> {
        let ActionResult::Count(total) = ctx.take_result()? else {
            return Err(unexpected_result("count"));
        };
        let body = serde_json::to_value(CountResponse::new(total))
            .map_err(|e| ApiError::internal("Failed to serialize count", Some(e.to_string())))?;
        Ok(ResourceResponse::ok(body))
    }

    // Show

    async fn validate_show(&self, _ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        Ok(())
    }

    async fn authorize_show(&self, ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        authorize(self.policy(), &ctx.request, Ability::View, Subject::Model(ctx.model()?)).await
    }

    async fn postprocess_show(&self, ctx: &mut ContextOf<Self>) -> Result<ResourceResponse, ApiError> {
        let model = single_result(ctx, "show")?;
        Ok(ResourceResponse::ok(json!({ "data": self.to_resource(&model)? })))
    }

    // Store

    async fn validate_store(&self, _ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        Ok(())
    }

    async fn authorize_store(&self, ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        authorize(
            self.policy(),
            &ctx.request,
            Ability::Create,
            Subject::Type(Self::RESOURCE_NAME),
        )
        .await
    }

    /// Fresh, unsaved model for store.
    async fn create_model(&self, _ctx: &mut ContextOf<Self>) -> Result<Self::ActiveModel, ApiError> {
        Ok(<Self::ActiveModel as ActiveModelBehavior>::new())
    }

    /// Runs after attribute assignment, right before the insert.
    async fn before_save_created(
        &self,
        _ctx: &mut ContextOf<Self>,
        _model: &mut Self::ActiveModel,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn save_created(
        &self,
        db: &DatabaseConnection,
        _ctx: &mut ContextOf<Self>,
        model: Self::ActiveModel,
    ) -> Result<Self::Model, ApiError> {
        Ok(model.insert(db).await?)
    }

    async fn postprocess_store(&self, ctx: &mut ContextOf<Self>) -> Result<ResourceResponse, ApiError> {
        let model = single_result(ctx, "store")?;
        Ok(ResourceResponse::created(json!({ "data": self.to_resource(&model)? })))
    }

    // Update

    async fn validate_update(&self, _ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        Ok(())
    }

    async fn authorize_update(&self, ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        authorize(self.policy(), &ctx.request, Ability::Update, Subject::Model(ctx.model()?)).await
    }

    async fn before_save_updated(
        &self,
        _ctx: &mut ContextOf<Self>,
        _model: &mut Self::ActiveModel,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    /// Persists the changed attributes. `original` is returned untouched when
    /// nothing changed.
    async fn save_updated(
        &self,
        db: &DatabaseConnection,
        _ctx: &mut ContextOf<Self>,
        original: Self::Model,
        model: Self::ActiveModel,
    ) -> Result<Self::Model, ApiError> {
        if !model.is_changed() {
            return Ok(original);
        }
        Ok(model.update(db).await?)
    }

    async fn postprocess_update(&self, ctx: &mut ContextOf<Self>) -> Result<ResourceResponse, ApiError> {
        let model = single_result(ctx, "update")?;
        Ok(ResourceResponse::ok(json!({ "data": self.to_resource(&model)? })))
    }

    // Destroy

    async fn validate_destroy(&self, _ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        Ok(())
    }

    async fn authorize_destroy(&self, ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        authorize(self.policy(), &ctx.request, Ability::Delete, Subject::Model(ctx.model()?)).await
    }

    async fn delete_model(
        &self,
        db: &DatabaseConnection,
        _ctx: &mut ContextOf<Self>,
        model: Self::Model,
    ) -> Result<(), ApiError> {
        let result = model.into_active_model().delete(db).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::not_found(Self::RESOURCE_NAME, None));
        }
        Ok(())
    }

    async fn postprocess_destroy(&self, _ctx: &mut ContextOf<Self>) -> Result<ResourceResponse, ApiError> {
        Ok(ResourceResponse::no_content())
    }
}

/// A resource scoped under a parent entity, e.g. `/authors/{author}/posts`.
///
/// The routers additionally require `Self::Parent: FromQueryResult`, which
/// holds for every Sea-ORM model.
#[async_trait]
pub trait NestedResourceController: ResourceController {
    type ParentEntity: EntityTrait<Model = Self::Parent>;

    /// Singular parent name used in not-found messages.
    const PARENT_NAME: &'static str;

    /// The parent's related collection, e.g. `parent.find_related(post::Entity)`.
    fn related_query(&self, parent: &Self::Parent) -> Select<Self::Entity>;

    /// Sets the foreign key of a new child.
    fn attach_to_parent(&self, parent: &Self::Parent, model: &mut Self::ActiveModel);

    async fn setup_nested_query(&self, ctx: &mut ContextOf<Self>) -> Result<(), ApiError> {
        let query = self.related_query(ctx.parent()?);
        ctx.query = Some(query);
        Ok(())
    }

    async fn save_nested_created(
        &self,
        db: &DatabaseConnection,
        ctx: &mut ContextOf<Self>,
        mut model: Self::ActiveModel,
    ) -> Result<Self::Model, ApiError> {
        self.attach_to_parent(ctx.parent()?, &mut model);
        self.save_created(db, ctx, model).await
    }
}

fn single_result<E: EntityTrait, P>(
    ctx: &mut ResourceContext<E, P>,
    action: &str,
) -> Result<E::Model, ApiError> {
    match ctx.take_result()? {
        ActionResult::One(model) => Ok(model),
        _ => Err(unexpected_result(action)),
    }
}

fn unexpected_result(action: &str) -> ApiError {
    ApiError::internal(
        "Pipeline state error",
        Some(format!("unexpected result kind in {action} postprocess")),
    )
}
