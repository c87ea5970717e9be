use super::{comment_like, user};
use sea_orm::entity::prelude::*;

/// A comment attached to a post.
/// Both the parent post and the author are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub public_id: Uuid,
    pub post_id: i32,
    pub author_id: i32,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// Same semantics as on Post: flips to true once, stays true.
    #[sea_orm(default_value = "false")]
    pub edited: bool,
    pub created: DateTimeWithTimeZone,
    pub updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id"
    )]
    Post,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,
    /// Relation for the many-to-many liked-by set.
    #[sea_orm(has_many = "super::comment_like::Entity")]
    CommentLike,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

// The liked-by set: users related through the comment_likes join table.
impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        comment_like::Relation::User.def()
    }
    fn via() -> Option<RelationDef> {
        Some(comment_like::Relation::Comment.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
