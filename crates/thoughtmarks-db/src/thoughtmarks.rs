//! Thoughtmark repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use thoughtmarks_core::{
    CreateThoughtmarkRequest, Error, Result, Thoughtmark, ThoughtmarkRepository,
    UpdateThoughtmarkRequest,
};

use crate::escape_like;

/// Columns fetched for a thoughtmark row, bin name joined in for display.
const SELECT_THOUGHTMARK: &str = r#"
    SELECT t.id, t.title, t.content, t.tags, t.bin_id, b.name AS bin_name,
           t.user_id, t.is_deleted, t.deleted_at_utc, t.embedding,
           t.created_at_utc, t.updated_at_utc
    FROM thoughtmarks t
    LEFT JOIN bins b ON t.bin_id = b.id
"#;

fn row_to_thoughtmark(r: sqlx::postgres::PgRow) -> Thoughtmark {
    Thoughtmark {
        id: r.get("id"),
        title: r.get("title"),
        content: r.get("content"),
        tags: r.get("tags"),
        bin_id: r.get("bin_id"),
        bin_name: r.get("bin_name"),
        user_id: r.get("user_id"),
        is_deleted: r.get("is_deleted"),
        deleted_at_utc: r.get("deleted_at_utc"),
        embedding: r.get("embedding"),
        created_at_utc: r.get("created_at_utc"),
        updated_at_utc: r.get("updated_at_utc"),
    }
}

/// PostgreSQL implementation of [`ThoughtmarkRepository`].
pub struct PgThoughtmarkRepository {
    pool: Pool<Postgres>,
}

impl PgThoughtmarkRepository {
    /// Create a new PgThoughtmarkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fetch a freshly written row back with its bin name joined.
    async fn fetch(&self, id: i32) -> Result<Thoughtmark> {
        let row = sqlx::query(&format!("{SELECT_THOUGHTMARK} WHERE t.id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row_to_thoughtmark(row))
    }
}

#[async_trait]
impl ThoughtmarkRepository for PgThoughtmarkRepository {
    async fn create(
        &self,
        user_id: i32,
        req: CreateThoughtmarkRequest,
        embedding: Option<String>,
    ) -> Result<Thoughtmark> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO thoughtmarks (title, content, tags, bin_id, user_id, embedding)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.tags)
        .bind(req.bin_id)
        .bind(user_id)
        .bind(&embedding)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.fetch(id).await
    }

    async fn get(&self, id: i32) -> Result<Option<Thoughtmark>> {
        let row = sqlx::query(&format!("{SELECT_THOUGHTMARK} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(row_to_thoughtmark))
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Thoughtmark>> {
        let rows = sqlx::query(&format!(
            "{SELECT_THOUGHTMARK}
             WHERE t.user_id = $1 AND NOT t.is_deleted
             ORDER BY t.created_at_utc DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(row_to_thoughtmark).collect())
    }

    async fn list_for_bin(&self, bin_id: i32) -> Result<Vec<Thoughtmark>> {
        let rows = sqlx::query(&format!(
            "{SELECT_THOUGHTMARK}
             WHERE t.bin_id = $1 AND NOT t.is_deleted
             ORDER BY t.created_at_utc DESC"
        ))
        .bind(bin_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(row_to_thoughtmark).collect())
    }

    async fn list_deleted(&self, user_id: i32) -> Result<Vec<Thoughtmark>> {
        let rows = sqlx::query(&format!(
            "{SELECT_THOUGHTMARK}
             WHERE t.user_id = $1 AND t.is_deleted
             ORDER BY t.created_at_utc DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(row_to_thoughtmark).collect())
    }

    async fn update(&self, id: i32, req: UpdateThoughtmarkRequest) -> Result<Option<Thoughtmark>> {
        // Tri-state bin_id/embedding: the flag marks "write this field" and
        // the bound value may be NULL, which clears it.
        let updated: Option<i32> = sqlx::query_scalar(
            "UPDATE thoughtmarks SET
                title = CASE WHEN $2 THEN $3 ELSE title END,
                content = CASE WHEN $4 THEN $5 ELSE content END,
                tags = CASE WHEN $6 THEN $7 ELSE tags END,
                bin_id = CASE WHEN $8 THEN $9 ELSE bin_id END,
                embedding = CASE WHEN $10 THEN $11 ELSE embedding END,
                updated_at_utc = NOW()
             WHERE id = $1
             RETURNING id",
        )
        .bind(id)
        .bind(req.title.is_some())
        .bind(&req.title)
        .bind(req.content.is_some())
        .bind(&req.content)
        .bind(req.tags.is_some())
        .bind(req.tags.clone().unwrap_or_default())
        .bind(req.bin_id.is_some())
        .bind(req.bin_id.flatten())
        .bind(req.embedding.is_some())
        .bind(req.embedding.clone().flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match updated {
            Some(id) => Ok(Some(self.fetch(id).await?)),
            None => Ok(None),
        }
    }

    async fn soft_delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE thoughtmarks
             SET is_deleted = TRUE, deleted_at_utc = NOW(), updated_at_utc = NOW()
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn restore(&self, id: i32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE thoughtmarks
             SET is_deleted = FALSE, deleted_at_utc = NULL, updated_at_utc = NOW()
             WHERE id = $1 AND is_deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn search(
        &self,
        user_id: i32,
        query: &str,
        tags: Option<&[String]>,
    ) -> Result<Vec<Thoughtmark>> {
        let pattern = format!("%{}%", escape_like(query));

        let rows = match tags.filter(|t| !t.is_empty()) {
            Some(tags) => {
                sqlx::query(&format!(
                    "{SELECT_THOUGHTMARK}
                     WHERE t.user_id = $1 AND NOT t.is_deleted
                       AND (t.title ILIKE $2 ESCAPE '\\' OR t.content ILIKE $2 ESCAPE '\\')
                       AND t.tags && $3
                     ORDER BY t.created_at_utc DESC"
                ))
                .bind(user_id)
                .bind(&pattern)
                .bind(tags)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "{SELECT_THOUGHTMARK}
                     WHERE t.user_id = $1 AND NOT t.is_deleted
                       AND (t.title ILIKE $2 ESCAPE '\\' OR t.content ILIKE $2 ESCAPE '\\')
                     ORDER BY t.created_at_utc DESC"
                ))
                .bind(user_id)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(row_to_thoughtmark).collect())
    }
}
