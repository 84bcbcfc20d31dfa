//! Queries against the `user_profiles` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::UserProfile;

const PROFILE_COLUMNS: &str =
    "user_id, email, username, first_name, last_name, full_name, phone_number, avatar";

pub async fn find(db: &PgPool, user_id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn username_taken(db: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM user_profiles WHERE username = $1")
            .bind(username)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

/// Email registered for `username`, used to allow login by username.
pub async fn email_for_username(
    db: &PgPool,
    username: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT email FROM user_profiles WHERE username = $1")
            .bind(username)
            .fetch_optional(db)
            .await?;
    Ok(row.map(|(email,)| email))
}

/// Whether `err` is the unique violation on `user_profiles.username`.
pub fn username_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                && db_err.constraint() == Some("user_profiles_username_key")
        }
        _ => false,
    }
}

pub async fn insert(db: &PgPool, profile: &UserProfile) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_profiles (user_id, email, username, first_name, last_name, full_name, phone_number, avatar)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(profile.user_id)
    .bind(&profile.email)
    .bind(&profile.username)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.full_name)
    .bind(&profile.phone_number)
    .bind(&profile.avatar)
    .execute(db)
    .await?;
    Ok(())
}

/// Writes the editable fields of `profile` back.
pub async fn save(db: &PgPool, profile: &UserProfile) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_profiles
         SET first_name = $1, last_name = $2, full_name = $3, phone_number = $4, updated_at = NOW()
         WHERE user_id = $5",
    )
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.full_name)
    .bind(&profile.phone_number)
    .bind(profile.user_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn set_avatar(db: &PgPool, user_id: Uuid, avatar_url: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE user_profiles SET avatar = $1, updated_at = NOW() WHERE user_id = $2")
        .bind(avatar_url)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}
