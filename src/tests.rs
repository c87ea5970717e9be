#[cfg(test)]
mod integration_tests {
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use uuid::Uuid;

    use crate::router::create_router;
    use crate::test_utils::test_utils::{
        create_superuser_in_db, setup_test_app, setup_test_app_state,
        setup_test_app_state_with_settings, test_settings,
    };

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    /// Register a user and return their access token and public id.
    async fn register(server: &TestServer, username: &str, email: &str) -> (String, Uuid) {
        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": email,
                "username": username,
                "password": "password123",
                "first_name": "Test",
                "last_name": "User",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let access = body["data"]["access"].as_str().unwrap().to_string();
        let user_id = Uuid::parse_str(body["data"]["user"]["id"].as_str().unwrap()).unwrap();
        (access, user_id)
    }

    /// Create a post and return its public id.
    async fn create_post(server: &TestServer, token: &str, author: Uuid, body: &str) -> Uuid {
        let response = server
            .post("/api/v1/posts")
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&json!({ "author": author, "body": body }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap()
    }

    /// Create a comment under a post and return its public id.
    async fn create_comment(
        server: &TestServer,
        token: &str,
        author: Uuid,
        post_id: Uuid,
        body: &str,
    ) -> Uuid {
        let response = server
            .post(&format!("/api/v1/posts/{}/comments", post_id))
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&json!({ "author": author, "body": body }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_returns_tokens_and_user() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "alice@example.com",
                "username": "alice",
                "password": "password123",
                "first_name": "Alice",
                "last_name": "Anderson",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert!(body["data"]["access"].as_str().unwrap().len() > 0);
        assert!(body["data"]["refresh"].as_str().unwrap().len() > 0);

        let user = &body["data"]["user"];
        assert_eq!(user["username"], "alice");
        assert_eq!(user["email"], "alice@example.com");
        assert_eq!(user["name"], "Alice Anderson");
        assert_eq!(user["posts_count"], 0);
        assert_eq!(user["is_active"], true);
        // The credential never leaves the server.
        assert!(user.get("password_hash").is_none());
        assert!(user.get("password").is_none());
        // The public id is a well-formed UUID.
        assert!(Uuid::parse_str(user["id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "bob@example.com",
                "username": "bob",
                "password": "short",
                "first_name": "Bob",
                "last_name": "Brown",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register(&server, "carol", "carol@example.com").await;

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": "carol@example.com",
                "username": "carol2",
                "password": "password123",
                "first_name": "Carol",
                "last_name": "Clone",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_login_and_refresh_round_trip() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register(&server, "dave", "dave@example.com").await;

        let login = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "dave@example.com", "password": "password123" }))
            .await;
        login.assert_status(StatusCode::OK);
        let body: Value = login.json();
        assert_eq!(body["data"]["user"]["username"], "dave");
        let refresh_token = body["data"]["refresh"].as_str().unwrap().to_string();

        let refreshed = server
            .post("/api/v1/auth/refresh")
            .json(&json!({ "refresh": refresh_token }))
            .await;
        refreshed.assert_status(StatusCode::OK);
        let body: Value = refreshed.json();
        let access = body["data"]["access"].as_str().unwrap();

        // The refreshed access token is usable.
        let users = server
            .get("/api/v1/users")
            .add_header(header::AUTHORIZATION, bearer(access))
            .await;
        users.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_wrong_password_unauthenticated() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        register(&server, "erin", "erin@example.com").await;

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "erin@example.com", "password": "wrong-password" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (access, _) = register(&server, "frank", "frank@example.com").await;

        let response = server
            .post("/api/v1/auth/refresh")
            .json(&json!({ "refresh": access }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_anonymous_can_list_posts() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        create_post(&server, &token, author, "First post").await;
        create_post(&server, &token, author, "Second post").await;

        let response = server.get("/api/v1/posts").await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], true);

        let posts = body["data"].as_array().unwrap();
        assert_eq!(posts.len(), 2);
        for post in posts {
            // Anonymous viewers never see `liked == true`.
            assert_eq!(post["liked"], false);
            assert_eq!(post["author"]["username"], "alice");
        }
    }

    #[tokio::test]
    async fn test_anonymous_cannot_create_post() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/posts")
            .json(&json!({ "author": Uuid::new_v4(), "body": "anonymous post" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_create_post_for_another_user_rejected() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token_a, _) = register(&server, "alice", "alice@example.com").await;
        let (_, bob_id) = register(&server, "bob", "bob@example.com").await;

        let response = server
            .post("/api/v1/posts")
            .add_header(header::AUTHORIZATION, bearer(&token_a))
            .json(&json!({ "author": bob_id, "body": "impersonated" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        let post_id = create_post(&server, &token, author, "Hello world").await;

        let response = server.get(&format!("/api/v1/posts/{}", post_id)).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();

        let post = &body["data"];
        assert_eq!(post["body"], "Hello world");
        assert_eq!(post["edited"], false);
        assert_eq!(post["likes_count"], 0);
        assert_eq!(post["comments_count"], 0);
        // The author is a fully rendered user payload, not a bare id.
        assert_eq!(post["author"]["id"], author.to_string());
        assert_eq!(post["author"]["username"], "alice");
        assert_eq!(post["author"]["posts_count"], 1);
    }

    #[tokio::test]
    async fn test_update_post_flips_edited_once() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        let post_id = create_post(&server, &token, author, "Original body").await;

        let first = server
            .put(&format!("/api/v1/posts/{}", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "body": "Revised body" }))
            .await;
        first.assert_status(StatusCode::OK);
        let body: Value = first.json();
        assert_eq!(body["data"]["edited"], true);
        assert_eq!(body["data"]["body"], "Revised body");

        let second = server
            .put(&format!("/api/v1/posts/{}", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "body": "Revised again" }))
            .await;
        second.assert_status(StatusCode::OK);
        let body: Value = second.json();
        // Sticky: it never resets.
        assert_eq!(body["data"]["edited"], true);
    }

    #[tokio::test]
    async fn test_update_post_with_unchanged_body_keeps_edited_false() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        let post_id = create_post(&server, &token, author, "Same body").await;

        let response = server
            .put(&format!("/api/v1/posts/{}", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "body": "Same body" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        // No content change, no edit flag.
        assert_eq!(body["data"]["edited"], false);
    }

    #[tokio::test]
    async fn test_update_post_cannot_change_author() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        let (_, bob_id) = register(&server, "bob", "bob@example.com").await;
        let post_id = create_post(&server, &token, author, "Mine").await;

        // A smuggled author field is ignored; the stored value is
        // preserved regardless of submitted input.
        let response = server
            .put(&format!("/api/v1/posts/{}", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "body": "Still mine", "author": bob_id }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["author"]["id"], author.to_string());
    }

    #[tokio::test]
    async fn test_update_post_by_other_user_denied() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, _) = register(&server, "bob", "bob@example.com").await;
        let post_id = create_post(&server, &token_a, alice_id, "Alice's post").await;

        let response = server
            .put(&format!("/api/v1/posts/{}", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .json(&json!({ "body": "Bob's takeover" }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_superuser_can_update_and_delete_any_post() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let post_id = create_post(&server, &token_a, alice_id, "Alice's post").await;

        create_superuser_in_db(&state, "admin", "admin@example.com", "admin-password").await;
        let login = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "admin@example.com", "password": "admin-password" }))
            .await;
        login.assert_status(StatusCode::OK);
        let body: Value = login.json();
        let admin_token = body["data"]["access"].as_str().unwrap().to_string();

        let update = server
            .put(&format!("/api/v1/posts/{}", post_id))
            .add_header(header::AUTHORIZATION, bearer(&admin_token))
            .json(&json!({ "body": "Moderated body" }))
            .await;
        update.assert_status(StatusCode::OK);

        let delete = server
            .delete(&format!("/api/v1/posts/{}", post_id))
            .add_header(header::AUTHORIZATION, bearer(&admin_token))
            .await;
        delete.assert_status(StatusCode::OK);

        let gone = server.get(&format!("/api/v1/posts/{}", post_id)).await;
        gone.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_post_by_author() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        let post_id = create_post(&server, &token, author, "Ephemeral").await;

        let response = server
            .delete(&format!("/api/v1/posts/{}", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["message"], "Post deleted successfully");

        let gone = server.get(&format!("/api/v1/posts/{}", post_id)).await;
        gone.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_like_unlike_post_idempotent() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, _) = register(&server, "bob", "bob@example.com").await;
        let post_id = create_post(&server, &token_a, alice_id, "Likeable").await;

        // Bob likes Alice's post.
        let like = server
            .post(&format!("/api/v1/posts/{}/like", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .await;
        like.assert_status(StatusCode::OK);
        let body: Value = like.json();
        assert_eq!(body["data"]["likes_count"], 1);
        assert_eq!(body["data"]["liked"], true);

        // Liking again leaves the count unchanged and succeeds.
        let like_again = server
            .post(&format!("/api/v1/posts/{}/like", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .await;
        like_again.assert_status(StatusCode::OK);
        let body: Value = like_again.json();
        assert_eq!(body["data"]["likes_count"], 1);

        // Unlike brings it back to zero.
        let unlike = server
            .delete(&format!("/api/v1/posts/{}/like", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .await;
        unlike.assert_status(StatusCode::OK);
        let body: Value = unlike.json();
        assert_eq!(body["data"]["likes_count"], 0);
        assert_eq!(body["data"]["liked"], false);

        // Unliking a post that is not liked is a silent no-op.
        let unlike_again = server
            .delete(&format!("/api/v1/posts/{}/like", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .await;
        unlike_again.assert_status(StatusCode::OK);
        let body: Value = unlike_again.json();
        assert_eq!(body["data"]["likes_count"], 0);
    }

    #[tokio::test]
    async fn test_like_requires_authentication() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        let post_id = create_post(&server, &token, author, "Likeable").await;

        let response = server
            .post(&format!("/api/v1/posts/{}/like", post_id))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_identifier_distinct_from_not_found() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // A malformed identifier is a 400, not a 404.
        let malformed = server.get("/api/v1/posts/not-a-uuid").await;
        malformed.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = malformed.json();
        assert_eq!(body["code"], "MALFORMED_IDENTIFIER");

        // A well-formed identifier with no record is a 404.
        let missing = server
            .get(&format!("/api/v1/posts/{}", Uuid::new_v4()))
            .await;
        missing.assert_status(StatusCode::NOT_FOUND);
        let body: Value = missing.json();
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_users_requires_auth() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, _) = register(&server, "alice", "alice@example.com").await;
        register(&server, "bob", "bob@example.com").await;

        // Anonymous listing is rejected as unauthenticated.
        let anonymous = server.get("/api/v1/users").await;
        anonymous.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = anonymous.json();
        assert_eq!(body["code"], "UNAUTHENTICATED");

        // Authenticated listing succeeds and never leaks credentials.
        let response = server
            .get("/api/v1/users")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let users = body["data"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        for user in users {
            assert!(user.get("password_hash").is_none());
        }
    }

    #[tokio::test]
    async fn test_get_user_detail_requires_auth() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, alice_id) = register(&server, "alice", "alice@example.com").await;

        let anonymous = server.get(&format!("/api/v1/users/{}", alice_id)).await;
        anonymous.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .get(&format!("/api/v1/users/{}", alice_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["username"], "alice");

        let malformed = server
            .get("/api/v1/users/42")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        malformed.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_patch_user_permissions() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, _) = register(&server, "bob", "bob@example.com").await;

        // Self-service partial edit.
        let own = server
            .patch(&format!("/api/v1/users/{}", alice_id))
            .add_header(header::AUTHORIZATION, bearer(&token_a))
            .json(&json!({ "bio": "Rustacean" }))
            .await;
        own.assert_status(StatusCode::OK);
        let body: Value = own.json();
        assert_eq!(body["data"]["bio"], "Rustacean");
        // Untouched fields are preserved.
        assert_eq!(body["data"]["username"], "alice");

        // Another regular user is forbidden.
        let other = server
            .patch(&format!("/api/v1/users/{}", alice_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .json(&json!({ "bio": "Hijacked" }))
            .await;
        other.assert_status(StatusCode::FORBIDDEN);

        // A superuser may edit anyone.
        create_superuser_in_db(&state, "admin", "admin@example.com", "admin-password").await;
        let login = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "admin@example.com", "password": "admin-password" }))
            .await;
        let admin_token = login.json::<Value>()["data"]["access"]
            .as_str()
            .unwrap()
            .to_string();

        let admin_edit = server
            .patch(&format!("/api/v1/users/{}", alice_id))
            .add_header(header::AUTHORIZATION, bearer(&admin_token))
            .json(&json!({ "first_name": "Alicia" }))
            .await;
        admin_edit.assert_status(StatusCode::OK);
        let body: Value = admin_edit.json();
        assert_eq!(body["data"]["first_name"], "Alicia");
    }

    #[tokio::test]
    async fn test_comment_create_and_list() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, bob_id) = register(&server, "bob", "bob@example.com").await;
        let post_id = create_post(&server, &token_a, alice_id, "Comment on me").await;

        create_comment(&server, &token_b, bob_id, post_id, "First!").await;

        // Creating a comment as someone else is rejected.
        let impersonated = server
            .post(&format!("/api/v1/posts/{}/comments", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .json(&json!({ "author": alice_id, "body": "Not me" }))
            .await;
        impersonated.assert_status(StatusCode::BAD_REQUEST);

        // Anonymous listing works; the nested author payload is rendered.
        let response = server
            .get(&format!("/api/v1/posts/{}/comments", post_id))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let comments = body["data"].as_array().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["body"], "First!");
        assert_eq!(comments[0]["author"]["username"], "bob");
        assert_eq!(comments[0]["post"], post_id.to_string());
        assert_eq!(comments[0]["liked"], false);

        // The post's comment count reflects the new comment.
        let post = server.get(&format!("/api/v1/posts/{}", post_id)).await;
        let body: Value = post.json();
        assert_eq!(body["data"]["comments_count"], 1);
    }

    #[tokio::test]
    async fn test_comment_update_flips_edited_and_is_author_only() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, bob_id) = register(&server, "bob", "bob@example.com").await;
        let post_id = create_post(&server, &token_a, alice_id, "Host post").await;
        let comment_id = create_comment(&server, &token_b, bob_id, post_id, "Typo herre").await;

        // The post author owns the post, not the comment.
        let by_post_author = server
            .put(&format!("/api/v1/posts/{}/comments/{}", post_id, comment_id))
            .add_header(header::AUTHORIZATION, bearer(&token_a))
            .json(&json!({ "body": "Fixed for you" }))
            .await;
        by_post_author.assert_status(StatusCode::FORBIDDEN);

        let by_author = server
            .put(&format!("/api/v1/posts/{}/comments/{}", post_id, comment_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .json(&json!({ "body": "Typo here" }))
            .await;
        by_author.assert_status(StatusCode::OK);
        let body: Value = by_author.json();
        assert_eq!(body["data"]["edited"], true);
        assert_eq!(body["data"]["body"], "Typo here");
    }

    #[tokio::test]
    async fn test_comment_deletion_permissions() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, bob_id) = register(&server, "bob", "bob@example.com").await;
        let (token_c, _) = register(&server, "carol", "carol@example.com").await;
        let post_id = create_post(&server, &token_a, alice_id, "Moderated post").await;

        // An unrelated user may not delete.
        let c1 = create_comment(&server, &token_b, bob_id, post_id, "one").await;
        let stranger = server
            .delete(&format!("/api/v1/posts/{}/comments/{}", post_id, c1))
            .add_header(header::AUTHORIZATION, bearer(&token_c))
            .await;
        stranger.assert_status(StatusCode::FORBIDDEN);

        // The comment author may delete their own comment.
        let by_author = server
            .delete(&format!("/api/v1/posts/{}/comments/{}", post_id, c1))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .await;
        by_author.assert_status(StatusCode::OK);

        // The post author may moderate comments under their post.
        let c2 = create_comment(&server, &token_b, bob_id, post_id, "two").await;
        let by_post_author = server
            .delete(&format!("/api/v1/posts/{}/comments/{}", post_id, c2))
            .add_header(header::AUTHORIZATION, bearer(&token_a))
            .await;
        by_post_author.assert_status(StatusCode::OK);

        // A superuser may delete anything.
        let c3 = create_comment(&server, &token_b, bob_id, post_id, "three").await;
        create_superuser_in_db(&state, "admin", "admin@example.com", "admin-password").await;
        let login = server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "admin@example.com", "password": "admin-password" }))
            .await;
        let admin_token = login.json::<Value>()["data"]["access"]
            .as_str()
            .unwrap()
            .to_string();
        let by_admin = server
            .delete(&format!("/api/v1/posts/{}/comments/{}", post_id, c3))
            .add_header(header::AUTHORIZATION, bearer(&admin_token))
            .await;
        by_admin.assert_status(StatusCode::OK);

        let remaining = server
            .get(&format!("/api/v1/posts/{}/comments", post_id))
            .await;
        let body: Value = remaining.json();
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_comment_likes_idempotent() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, bob_id) = register(&server, "bob", "bob@example.com").await;
        let post_id = create_post(&server, &token_a, alice_id, "Host").await;
        let comment_id = create_comment(&server, &token_b, bob_id, post_id, "Nice").await;

        let path = format!("/api/v1/posts/{}/comments/{}/like", post_id, comment_id);

        let like = server
            .post(&path)
            .add_header(header::AUTHORIZATION, bearer(&token_a))
            .await;
        like.assert_status(StatusCode::OK);
        assert_eq!(like.json::<Value>()["data"]["likes_count"], 1);

        let like_again = server
            .post(&path)
            .add_header(header::AUTHORIZATION, bearer(&token_a))
            .await;
        assert_eq!(like_again.json::<Value>()["data"]["likes_count"], 1);

        let unlike = server
            .delete(&path)
            .add_header(header::AUTHORIZATION, bearer(&token_a))
            .await;
        assert_eq!(unlike.json::<Value>()["data"]["likes_count"], 0);

        let unlike_again = server
            .delete(&path)
            .add_header(header::AUTHORIZATION, bearer(&token_a))
            .await;
        unlike_again.assert_status(StatusCode::OK);
        assert_eq!(unlike_again.json::<Value>()["data"]["likes_count"], 0);
    }

    #[tokio::test]
    async fn test_comment_under_wrong_post_not_found() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        let post_a = create_post(&server, &token, author, "Post A").await;
        let post_b = create_post(&server, &token, author, "Post B").await;
        let comment_id = create_comment(&server, &token, author, post_a, "On A").await;

        let response = server
            .get(&format!("/api/v1/posts/{}/comments/{}", post_b, comment_id))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_posts_filter_by_author() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, bob_id) = register(&server, "bob", "bob@example.com").await;
        create_post(&server, &token_a, alice_id, "Alice 1").await;
        create_post(&server, &token_a, alice_id, "Alice 2").await;
        create_post(&server, &token_b, bob_id, "Bob 1").await;

        let response = server
            .get(&format!("/api/v1/posts?author_public_id={}", alice_id))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let posts = body["data"].as_array().unwrap();
        assert_eq!(posts.len(), 2);
        for post in posts {
            assert_eq!(post["author"]["username"], "alice");
        }

        // An unknown author yields an empty page.
        let unknown = server
            .get(&format!("/api/v1/posts?author_public_id={}", Uuid::new_v4()))
            .await;
        unknown.assert_status(StatusCode::OK);
        assert_eq!(unknown.json::<Value>()["data"].as_array().unwrap().len(), 0);

        // A malformed author filter is rejected, not treated as missing.
        let malformed = server.get("/api/v1/posts?author_public_id=42").await;
        malformed.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_users_pagination() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, _) = register(&server, "alice", "alice@example.com").await;
        register(&server, "bob", "bob@example.com").await;
        register(&server, "carol", "carol@example.com").await;

        let page = server
            .get("/api/v1/users?limit=2")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        page.assert_status(StatusCode::OK);
        assert_eq!(page.json::<Value>()["data"].as_array().unwrap().len(), 2);

        let rest = server
            .get("/api/v1/users?limit=2&offset=2")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        rest.assert_status(StatusCode::OK);
        assert_eq!(rest.json::<Value>()["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_default_avatar_substitution() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, alice_id) = register(&server, "alice", "alice@example.com").await;

        let response = server
            .get(&format!("/api/v1/users/{}", alice_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        // No avatar set: the configured default is substituted verbatim
        // (debug mode off, no origin rewriting).
        assert_eq!(body["data"]["avatar"], "/media/default-avatar.png");

        // An explicitly set avatar is rendered as stored.
        let patched = server
            .patch(&format!("/api/v1/users/{}", alice_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "avatar": "https://cdn.example.com/alice.png" }))
            .await;
        patched.assert_status(StatusCode::OK);
        assert_eq!(
            patched.json::<Value>()["data"]["avatar"],
            "https://cdn.example.com/alice.png"
        );
    }

    #[tokio::test]
    async fn test_debug_mode_rewrites_avatar_to_absolute_url() {
        let mut settings = test_settings();
        settings.debug = true;
        let state = setup_test_app_state_with_settings(settings).await;
        let server = TestServer::new(create_router(state)).unwrap();

        let (token, alice_id) = register(&server, "alice", "alice@example.com").await;

        let response = server
            .get(&format!("/api/v1/users/{}", alice_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .add_header(header::HOST, HeaderValue::from_static("testserver"))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        let avatar = body["data"]["avatar"].as_str().unwrap();
        assert!(
            avatar.starts_with("http://"),
            "expected an absolute avatar URL, got {}",
            avatar
        );
        assert!(avatar.ends_with("/media/default-avatar.png"));
    }

    #[tokio::test]
    async fn test_post_list_cache_is_invalidated_by_mutations() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token, author) = register(&server, "alice", "alice@example.com").await;
        create_post(&server, &token, author, "First").await;

        // Prime the anonymous list cache.
        let first = server.get("/api/v1/posts").await;
        assert_eq!(first.json::<Value>()["data"].as_array().unwrap().len(), 1);

        // A create must invalidate it.
        create_post(&server, &token, author, "Second").await;
        let second = server.get("/api/v1/posts").await;
        assert_eq!(second.json::<Value>()["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_like_counts_stay_fresh() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let (token_a, alice_id) = register(&server, "alice", "alice@example.com").await;
        let (token_b, _) = register(&server, "bob", "bob@example.com").await;
        let post_id = create_post(&server, &token_a, alice_id, "Counted").await;

        // Prime both Bob's and the anonymous list cache.
        server
            .get("/api/v1/posts")
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .await;
        server.get("/api/v1/posts").await;

        let like = server
            .post(&format!("/api/v1/posts/{}/like", post_id))
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .await;
        like.assert_status(StatusCode::OK);

        // Bob's view reflects both the count and his own edge.
        let bobs = server
            .get("/api/v1/posts")
            .add_header(header::AUTHORIZATION, bearer(&token_b))
            .await;
        let body: Value = bobs.json();
        assert_eq!(body["data"][0]["likes_count"], 1);
        assert_eq!(body["data"][0]["liked"], true);

        // The anonymous view shares the count but never the edge.
        let anon = server.get("/api/v1/posts").await;
        let body: Value = anon.json();
        assert_eq!(body["data"][0]["likes_count"], 1);
        assert_eq!(body["data"][0]["liked"], false);
    }
}
