use anyhow::{bail, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, Database, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

use model::entities::user;

use crate::auth::password::hash_password;

/// Create a user with the superuser and staff flags set.
///
/// Registration over the API can only create regular users; this command
/// is the administrative path.
pub async fn create_superuser(
    database_url: &str,
    email: &str,
    username: &str,
    password: &str,
) -> Result<()> {
    info!("Creating superuser {}", username);

    let db = Database::connect(database_url).await?;

    let existing = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(email))
                .add(user::Column::Username.eq(username)),
        )
        .one(&db)
        .await?;
    if existing.is_some() {
        bail!("a user with this email or username already exists");
    }

    if password.len() < 8 {
        bail!("superuser password must be at least 8 characters long");
    }

    let now = Utc::now().fixed_offset();
    let superuser = user::ActiveModel {
        public_id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        bio: Set(String::new()),
        avatar: Set(None),
        is_active: Set(true),
        is_staff: Set(true),
        is_superuser: Set(true),
        created: Set(now),
        updated: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    info!(
        "Superuser {} created with public id {}",
        superuser.username, superuser.public_id
    );
    Ok(())
}
