//! Bin repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};

use thoughtmarks_core::defaults::{BIN_COLOR, BIN_ICON};
use thoughtmarks_core::{
    Bin, BinOrderUpdate, BinRepository, BinWithCount, CreateBinRequest, Error, Result,
    UpdateBinRequest,
};

const BIN_COLUMNS: &str = "id, name, description, color, icon, sort_order, user_id, created_at_utc";

fn row_to_bin(r: sqlx::postgres::PgRow) -> Bin {
    Bin {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
        color: r.get("color"),
        icon: r.get("icon"),
        sort_order: r.get("sort_order"),
        user_id: r.get("user_id"),
        created_at_utc: r.get("created_at_utc"),
    }
}

fn row_to_bin_with_count(r: sqlx::postgres::PgRow) -> BinWithCount {
    BinWithCount {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
        color: r.get("color"),
        icon: r.get("icon"),
        sort_order: r.get("sort_order"),
        user_id: r.get("user_id"),
        created_at_utc: r.get("created_at_utc"),
        thoughtmark_count: r.get("thoughtmark_count"),
    }
}

/// Insert a bin inside an existing transaction. Used by user creation to
/// seed the default bins atomically with the user row.
pub(crate) async fn insert_bin_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i32,
    name: &str,
    description: Option<&str>,
    color: &str,
    icon: &str,
    sort_order: i32,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO bins (name, description, color, icon, sort_order, user_id)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(name)
    .bind(description)
    .bind(color)
    .bind(icon)
    .bind(sort_order)
    .bind(user_id)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// PostgreSQL implementation of [`BinRepository`].
pub struct PgBinRepository {
    pool: Pool<Postgres>,
}

impl PgBinRepository {
    /// Create a new PgBinRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BinRepository for PgBinRepository {
    async fn create(&self, user_id: i32, req: CreateBinRequest) -> Result<Bin> {
        let row = sqlx::query(&format!(
            "INSERT INTO bins (name, description, color, icon, sort_order, user_id)
             VALUES ($1, $2, $3, $4,
                     COALESCE((SELECT MAX(sort_order) + 1 FROM bins WHERE user_id = $5), 0),
                     $5)
             RETURNING {BIN_COLUMNS}"
        ))
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.color.as_deref().unwrap_or(BIN_COLOR))
        .bind(req.icon.as_deref().unwrap_or(BIN_ICON))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row_to_bin(row))
    }

    async fn get(&self, id: i32) -> Result<Option<Bin>> {
        let row = sqlx::query(&format!("SELECT {BIN_COLUMNS} FROM bins WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(row_to_bin))
    }

    async fn get_with_count(&self, id: i32) -> Result<Option<BinWithCount>> {
        let row = sqlx::query(
            r#"
            SELECT b.id, b.name, b.description, b.color, b.icon, b.sort_order,
                   b.user_id, b.created_at_utc,
                   COALESCE((SELECT COUNT(*) FROM thoughtmarks t
                             WHERE t.bin_id = b.id AND NOT t.is_deleted), 0) AS thoughtmark_count
            FROM bins b
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(row_to_bin_with_count))
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<BinWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.name, b.description, b.color, b.icon, b.sort_order,
                   b.user_id, b.created_at_utc,
                   COALESCE((SELECT COUNT(*) FROM thoughtmarks t
                             WHERE t.bin_id = b.id AND NOT t.is_deleted), 0) AS thoughtmark_count
            FROM bins b
            WHERE b.user_id = $1
            ORDER BY b.sort_order, b.created_at_utc
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(row_to_bin_with_count).collect())
    }

    async fn update(&self, id: i32, req: UpdateBinRequest) -> Result<Option<Bin>> {
        let row = sqlx::query(&format!(
            "UPDATE bins SET
                name = CASE WHEN $2 THEN $3 ELSE name END,
                description = CASE WHEN $4 THEN $5 ELSE description END,
                color = CASE WHEN $6 THEN $7 ELSE color END,
                icon = CASE WHEN $8 THEN $9 ELSE icon END,
                sort_order = CASE WHEN $10 THEN $11 ELSE sort_order END
             WHERE id = $1
             RETURNING {BIN_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name.is_some())
        .bind(&req.name)
        .bind(req.description.is_some())
        .bind(req.description.clone().flatten())
        .bind(req.color.is_some())
        .bind(&req.color)
        .bind(req.icon.is_some())
        .bind(&req.icon)
        .bind(req.sort_order.is_some())
        .bind(req.sort_order.unwrap_or(0))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(row_to_bin))
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        // thoughtmarks.bin_id is ON DELETE SET NULL, so contents become unfiled
        let result = sqlx::query("DELETE FROM bins WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn reorder(&self, user_id: i32, updates: &[BinOrderUpdate]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for update in updates {
            sqlx::query("UPDATE bins SET sort_order = $1 WHERE id = $2 AND user_id = $3")
                .bind(update.sort_order)
                .bind(update.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
