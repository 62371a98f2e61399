use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
pub struct List {
    pub list_id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_ranked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ListItem {
    pub album_id: String,
    pub position: i32,
}

/// 列表详情响应：列表字段平铺 + 按位置降序的条目
#[derive(Debug, Serialize)]
pub struct ListWithItems {
    #[serde(flatten)]
    pub list: List,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_ranked: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_ranked: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub order: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub album_id: Option<String>,
}

impl List {
    pub async fn create(
        pool: &PgPool,
        user_id: &str,
        title: &str,
        description: Option<&str>,
        is_ranked: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            INSERT INTO lists (list_id, user_id, title, description, is_ranked)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING list_id, user_id, title, description, is_ranked, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(is_ranked)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, list_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            SELECT list_id, user_id, title, description, is_ranked, created_at, updated_at
            FROM lists
            WHERE list_id = $1
            "#,
        )
        .bind(list_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        list_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        is_ranked: Option<bool>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            UPDATE lists
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                is_ranked = COALESCE($3, is_ranked),
                updated_at = now()
            WHERE list_id = $4
            RETURNING list_id, user_id, title, description, is_ranked, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(is_ranked)
        .bind(list_id)
        .fetch_one(pool)
        .await
    }

    /// 条目固定按位置降序返回，位置越大排名越靠前
    pub async fn items(pool: &PgPool, list_id: Uuid) -> Result<Vec<ListItem>, sqlx::Error> {
        sqlx::query_as::<_, ListItem>(
            r#"
            SELECT album_id, position
            FROM list_items
            WHERE list_id = $1
            ORDER BY position DESC
            "#,
        )
        .bind(list_id)
        .fetch_all(pool)
        .await
    }

    pub async fn item_album_ids(pool: &PgPool, list_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT album_id FROM list_items WHERE list_id = $1 ORDER BY position DESC",
        )
        .bind(list_id)
        .fetch_all(pool)
        .await
    }

    pub async fn add_item(
        pool: &PgPool,
        list_id: Uuid,
        album_id: &str,
    ) -> Result<ListItem, sqlx::Error> {
        sqlx::query_as::<_, ListItem>(
            r#"
            INSERT INTO list_items (list_id, album_id, position)
            VALUES ($1, $2, (SELECT COUNT(*) + 1 FROM list_items WHERE list_id = $1))
            RETURNING album_id, position
            "#,
        )
        .bind(list_id)
        .bind(album_id)
        .fetch_one(pool)
        .await
    }

    /// 全量重排：位置按提交顺序取count..1，一条带CASE表达式的
    /// 批量UPDATE完成，要么全部生效要么全部不生效。
    pub async fn reorder(
        pool: &PgPool,
        list_id: Uuid,
        ordered_ids: &[String],
    ) -> Result<(), sqlx::Error> {
        if ordered_ids.is_empty() {
            return Ok(());
        }

        let count = ordered_ids.len() as i32;
        let mut query =
            QueryBuilder::<sqlx::Postgres>::new("UPDATE list_items SET position = CASE album_id ");
        for (index, album_id) in ordered_ids.iter().enumerate() {
            query
                .push("WHEN ")
                .push_bind(album_id)
                .push(" THEN ")
                .push_bind(count - index as i32)
                .push(" ");
        }
        query.push("END WHERE list_id = ").push_bind(list_id);

        query.build().execute(pool).await?;
        Ok(())
    }
}
