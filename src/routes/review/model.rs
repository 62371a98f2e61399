use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// 评论及其作者展示字段（昵称、头像）
#[derive(Debug, Serialize, FromRow)]
pub struct ReviewWithAuthor {
    pub review_id: Uuid,
    pub user_id: String,
    pub album_id: String,
    pub rating: i16,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: Option<i64>,
    pub body: Option<String>,
}

const REVIEW_COLUMNS: &str =
    "r.review_id, r.user_id, r.album_id, r.rating, r.body, r.created_at, r.updated_at";

impl ReviewWithAuthor {
    pub async fn list_for_album(pool: &PgPool, album_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReviewWithAuthor>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS}, u.display_name, u.avatar_url
            FROM reviews r
            JOIN users u ON u.user_id = r.user_id
            WHERE r.album_id = $1
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(album_id)
        .fetch_all(pool)
        .await
    }

    /// 每个用户每张专辑一条评论，重复提交覆盖旧评论
    pub async fn upsert(
        pool: &PgPool,
        user_id: &str,
        album_id: &str,
        rating: i16,
        body: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ReviewWithAuthor>(&format!(
            r#"
            WITH r AS (
                INSERT INTO reviews (review_id, user_id, album_id, rating, body)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id, album_id) DO UPDATE SET
                    rating = EXCLUDED.rating,
                    body = EXCLUDED.body,
                    updated_at = now()
                RETURNING *
            )
            SELECT {REVIEW_COLUMNS}, u.display_name, u.avatar_url
            FROM r
            JOIN users u ON u.user_id = r.user_id
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(album_id)
        .bind(rating)
        .bind(body)
        .fetch_one(pool)
        .await
    }
}
