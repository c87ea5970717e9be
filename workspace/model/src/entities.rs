//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the social-posting application here:
//! users, posts, comments, and the two like-edge join tables.

pub mod comment;
pub mod comment_like;
pub mod post;
pub mod post_like;
pub mod user;

// Define join tables for many-to-many relationships.
// SeaORM uses these to understand how to link entities.
pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::comment::Entity as Comment;
    pub use super::comment_like::Entity as CommentLike;
    pub use super::post::Entity as Post;
    pub use super::post_like::Entity as PostLike;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };
    use uuid::Uuid;

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        // Connect to the SQLite database
        let db = Database::connect("sqlite::memory:").await?;

        // Enable foreign keys
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        // Try to apply migrations first
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    fn new_user(username: &str, email: &str) -> user::ActiveModel {
        let now = chrono::Utc::now().fixed_offset();
        user::ActiveModel {
            public_id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set("hash".to_string()),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            bio: Set(String::new()),
            avatar: Set(None),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            created: Set(now),
            updated: Set(now),
            ..Default::default()
        }
    }

    fn new_post(author_id: i32, body: &str) -> post::ActiveModel {
        let now = chrono::Utc::now().fixed_offset();
        post::ActiveModel {
            public_id: Set(Uuid::new_v4()),
            author_id: Set(author_id),
            body: Set(body.to_string()),
            edited: Set(false),
            created: Set(now),
            updated: Set(now),
            ..Default::default()
        }
    }

    fn new_comment(post_id: i32, author_id: i32, body: &str) -> comment::ActiveModel {
        let now = chrono::Utc::now().fixed_offset();
        comment::ActiveModel {
            public_id: Set(Uuid::new_v4()),
            post_id: Set(post_id),
            author_id: Set(author_id),
            body: Set(body.to_string()),
            edited: Set(false),
            created: Set(now),
            updated: Set(now),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        // Setup database
        let db = setup_db().await?;

        // Create users
        let alice = new_user("alice", "alice@example.com").insert(&db).await?;
        let bob = new_user("bob", "bob@example.com").insert(&db).await?;

        // Create posts
        let post1 = new_post(alice.id, "Hello from Alice").insert(&db).await?;
        let post2 = new_post(bob.id, "Hello from Bob").insert(&db).await?;

        // Comment on Alice's post
        let comment1 = new_comment(post1.id, bob.id, "Nice post!").insert(&db).await?;

        // Bob likes Alice's post, Alice likes Bob's comment on her own post
        post_like::ActiveModel {
            user_id: Set(bob.id),
            post_id: Set(post1.id),
        }
        .insert(&db)
        .await?;

        comment_like::ActiveModel {
            user_id: Set(alice.id),
            comment_id: Set(comment1.id),
        }
        .insert(&db)
        .await?;

        // Read back and verify data

        // Verify users
        let users = User::find().all(&db).await?;
        assert_eq!(users.len(), 2);
        assert!(users.iter().any(|u| u.username == "alice"));
        assert!(users.iter().any(|u| u.username == "bob"));

        // Verify posts
        let posts = Post::find().all(&db).await?;
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| !p.edited));

        // Verify comments and the post->comment relation
        let comments = Comment::find()
            .filter(comment::Column::PostId.eq(post1.id))
            .all(&db)
            .await?;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author_id, bob.id);

        // Verify like edges
        let post_likes = PostLike::find().all(&db).await?;
        assert_eq!(post_likes.len(), 1);
        assert_eq!(post_likes[0].user_id, bob.id);
        assert_eq!(post_likes[0].post_id, post1.id);

        let comment_likes = CommentLike::find().all(&db).await?;
        assert_eq!(comment_likes.len(), 1);
        assert_eq!(comment_likes[0].user_id, alice.id);
        assert_eq!(comment_likes[0].comment_id, comment1.id);

        // Public ids are unique across rows of the same table
        assert_ne!(post1.public_id, post2.public_id);
        assert_ne!(alice.public_id, bob.public_id);

        // Lookup by public id, the only externally visible key
        let found = Post::find()
            .filter(post::Column::PublicId.eq(post1.public_id))
            .one(&db)
            .await?
            .expect("post should be found by public id");
        assert_eq!(found.id, post1.id);

        // The liked-by set is reachable through the Related impl
        let likers = post1.find_related(User).all(&db).await?;
        assert_eq!(likers.len(), 1);
        assert_eq!(likers[0].id, bob.id);

        // Deleting a post cascades to its comments and like edges
        Post::delete_by_id(post1.id).exec(&db).await?;
        assert_eq!(Comment::find().all(&db).await?.len(), 0);
        assert_eq!(PostLike::find().all(&db).await?.len(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_like_rejected_by_primary_key() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let alice = new_user("alice", "alice@example.com").insert(&db).await?;
        let post = new_post(alice.id, "body").insert(&db).await?;

        post_like::ActiveModel {
            user_id: Set(alice.id),
            post_id: Set(post.id),
        }
        .insert(&db)
        .await?;

        // A plain second insert violates the composite primary key.
        let dup = post_like::ActiveModel {
            user_id: Set(alice.id),
            post_id: Set(post.id),
        }
        .insert(&db)
        .await;
        assert!(dup.is_err());

        Ok(())
    }
}
