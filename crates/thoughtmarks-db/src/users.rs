//! User repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use thoughtmarks_core::defaults::DEFAULT_BINS;
use thoughtmarks_core::{CreateUserRequest, Error, Result, User, UserRepository};

use crate::bins::insert_bin_tx;

const USER_COLUMNS: &str = "id, email, display_name, firebase_uid, created_at_utc";

fn row_to_user(r: sqlx::postgres::PgRow) -> User {
    User {
        id: r.get("id"),
        email: r.get("email"),
        display_name: r.get("display_name"),
        firebase_uid: r.get("firebase_uid"),
        created_at_utc: r.get("created_at_utc"),
    }
}

/// PostgreSQL implementation of [`UserRepository`].
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, req: CreateUserRequest) -> Result<User> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "INSERT INTO users (email, display_name, firebase_uid)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&req.email)
        .bind(&req.display_name)
        .bind(&req.firebase_uid)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let user = row_to_user(row);

        // Seed the starter bins in display order, in the same transaction.
        for (i, (name, description, color, icon)) in DEFAULT_BINS.iter().enumerate() {
            insert_bin_tx(&mut tx, user.id, name, Some(description), color, icon, i as i32)
                .await?;
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "users",
            op = "create",
            user_id = user.id,
            "User created with default bins"
        );
        Ok(user)
    }

    async fn get(&self, id: i32) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(row_to_user))
    }

    async fn get_by_firebase_uid(&self, uid: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE firebase_uid = $1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(row_to_user))
    }
}
