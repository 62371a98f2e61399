use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

const USER_COLUMNS: &str = "user_id, display_name, avatar_url, bio, refresh_token, created_at";

impl User {
    pub async fn find_by_id(pool: &PgPool, user_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// OAuth回调时的用户落库：首次登录插入，老用户更新资料。
    /// refresh token只在提供方下发了新值时覆盖。
    pub async fn upsert_from_oauth(
        pool: &PgPool,
        user_id: &str,
        display_name: &str,
        avatar_url: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_id, display_name, avatar_url, refresh_token)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                avatar_url = COALESCE(EXCLUDED.avatar_url, users.avatar_url),
                refresh_token = COALESCE(EXCLUDED.refresh_token, users.refresh_token)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(display_name)
        .bind(avatar_url)
        .bind(refresh_token)
        .fetch_one(pool)
        .await
    }

    pub async fn update_profile(
        pool: &PgPool,
        user_id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET display_name = COALESCE($1, display_name),
                bio = COALESCE($2, bio)
            WHERE user_id = $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(display_name)
        .bind(bio)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update_avatar(
        pool: &PgPool,
        user_id: &str,
        avatar_url: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET avatar_url = $1
            WHERE user_id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(avatar_url)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
