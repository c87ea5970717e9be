use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(uuid_uniq(Users::PublicId))
                    .col(string_uniq(Users::Username))
                    .col(string_uniq(Users::Email))
                    .col(string(Users::PasswordHash))
                    .col(string(Users::FirstName))
                    .col(string(Users::LastName))
                    .col(text(Users::Bio))
                    .col(string_null(Users::Avatar))
                    .col(boolean(Users::IsActive).default(true))
                    .col(boolean(Users::IsStaff).default(false))
                    .col(boolean(Users::IsSuperuser).default(false))
                    .col(timestamp_with_time_zone(Users::Created))
                    .col(timestamp_with_time_zone(Users::Updated))
                    .to_owned(),
            )
            .await?;

        // Create posts table
        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(pk_auto(Posts::Id))
                    .col(uuid_uniq(Posts::PublicId))
                    .col(integer(Posts::AuthorId))
                    .col(text(Posts::Body))
                    .col(boolean(Posts::Edited).default(false))
                    .col(timestamp_with_time_zone(Posts::Created))
                    .col(timestamp_with_time_zone(Posts::Updated))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_author")
                            .from(Posts::Table, Posts::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create comments table
        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(pk_auto(Comments::Id))
                    .col(uuid_uniq(Comments::PublicId))
                    .col(integer(Comments::PostId))
                    .col(integer(Comments::AuthorId))
                    .col(text(Comments::Body))
                    .col(boolean(Comments::Edited).default(false))
                    .col(timestamp_with_time_zone(Comments::Created))
                    .col(timestamp_with_time_zone(Comments::Updated))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_post")
                            .from(Comments::Table, Comments::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_author")
                            .from(Comments::Table, Comments::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create post_likes table (join table)
        manager
            .create_table(
                Table::create()
                    .table(PostLikes::Table)
                    .if_not_exists()
                    .col(integer(PostLikes::UserId))
                    .col(integer(PostLikes::PostId))
                    .primary_key(
                        Index::create()
                            .name("pk_post_likes")
                            .col(PostLikes::UserId)
                            .col(PostLikes::PostId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_likes_user")
                            .from(PostLikes::Table, PostLikes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_likes_post")
                            .from(PostLikes::Table, PostLikes::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create comment_likes table (join table)
        manager
            .create_table(
                Table::create()
                    .table(CommentLikes::Table)
                    .if_not_exists()
                    .col(integer(CommentLikes::UserId))
                    .col(integer(CommentLikes::CommentId))
                    .primary_key(
                        Index::create()
                            .name("pk_comment_likes")
                            .col(CommentLikes::UserId)
                            .col(CommentLikes::CommentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_likes_user")
                            .from(CommentLikes::Table, CommentLikes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_likes_comment")
                            .from(CommentLikes::Table, CommentLikes::CommentId)
                            .to(Comments::Table, Comments::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup indexes for the common filters: posts by author,
        // comments by post.
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_author_id")
                    .table(Posts::Table)
                    .col(Posts::AuthorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comments_post_id")
                    .table(Comments::Table)
                    .col(Comments::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentLikes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostLikes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    PublicId,
    Username,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Bio,
    Avatar,
    IsActive,
    IsStaff,
    IsSuperuser,
    Created,
    Updated,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    PublicId,
    AuthorId,
    Body,
    Edited,
    Created,
    Updated,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    PublicId,
    PostId,
    AuthorId,
    Body,
    Edited,
    Created,
    Updated,
}

#[derive(DeriveIden)]
enum PostLikes {
    Table,
    UserId,
    PostId,
}

#[derive(DeriveIden)]
enum CommentLikes {
    Table,
    UserId,
    CommentId,
}
