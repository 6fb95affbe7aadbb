use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub secret: Option<String>,
    pub author_id: Option<i32>,
    pub published_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::author::Entity",
        from = "Column::AuthorId",
        to = "super::author::Column::Id"
    )]
    Author,
}

impl Related<super::author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Publication times are stored in UTC+8.
pub const PUBLISHED_AT: restful_actions::LocalDatetime = restful_actions::LocalDatetime::new(8 * 3600);

restful_actions::assignable_attributes!(ActiveModel, fillable [title, published_at] {
    title: String,
    secret: Option<String>,
    author_id: Option<i32>,
    published_at: Option<DateTimeWithTimeZone> => PUBLISHED_AT,
});
