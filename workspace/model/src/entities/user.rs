use sea_orm::entity::prelude::*;

/// Represents a registered user of the application.
/// The `public_id` is the only identifier ever exposed over the API;
/// the integer primary key stays internal to the storage layer.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub public_id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 hash of the credential. Never rendered in responses.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// Free-form biography; empty string when unset.
    #[sea_orm(column_type = "Text")]
    pub bio: String,
    /// Avatar reference (URL or media path). `None` means "use the default".
    pub avatar: Option<String>,
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
    #[sea_orm(default_value = "false")]
    pub is_staff: bool,
    #[sea_orm(default_value = "false")]
    pub is_superuser: bool,
    pub created: DateTimeWithTimeZone,
    pub updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Posts authored by this user.
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
    /// Comments authored by this user.
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    /// Relation for the many-to-many liked-posts set.
    #[sea_orm(has_many = "super::post_like::Entity")]
    PostLike,
    /// Relation for the many-to-many liked-comments set.
    #[sea_orm(has_many = "super::comment_like::Entity")]
    CommentLike,
}

impl Model {
    /// Display name, `"{first_name} {last_name}"`.
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl ActiveModelBehavior for ActiveModel {}
