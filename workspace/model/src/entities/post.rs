use super::{post_like, user};
use sea_orm::entity::prelude::*;

/// A top-level post in the feed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub public_id: Uuid,
    /// The user who wrote this post. Immutable after creation.
    pub author_id: i32,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// Sticky flag: set on the first body change, never cleared.
    #[sea_orm(default_value = "false")]
    pub edited: bool,
    pub created: DateTimeWithTimeZone,
    pub updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A post belongs to one author.
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    /// Relation for the many-to-many liked-by set.
    #[sea_orm(has_many = "super::post_like::Entity")]
    PostLike,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

// The liked-by set: users related through the post_likes join table.
impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        post_like::Relation::User.def()
    }
    fn via() -> Option<RelationDef> {
        Some(post_like::Relation::Post.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
