//! # thoughtmarks-db
//!
//! PostgreSQL database layer for Thoughtmarks.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, bins, and thoughtmarks
//! - Embedded sqlx migrations (feature `migrations`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use thoughtmarks_core::CreateThoughtmarkRequest;
//! use thoughtmarks_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/thoughtmarks").await?;
//!
//!     let tm = db.thoughtmarks.create(1, CreateThoughtmarkRequest {
//!         title: "Hello".to_string(),
//!         content: "First note".to_string(),
//!         ..Default::default()
//!     }, None).await?;
//!
//!     println!("Created thoughtmark: {}", tm.id);
//!     Ok(())
//! }
//! ```

pub mod bins;
pub mod pool;
pub mod thoughtmarks;
pub mod users;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use thoughtmarks_core::*;

pub use bins::PgBinRepository;
pub use pool::{create_pool, PoolConfig};
pub use thoughtmarks::PgThoughtmarkRepository;
pub use users::PgUserRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// User repository.
    pub users: PgUserRepository,
    /// Bin repository.
    pub bins: PgBinRepository,
    /// Thoughtmark repository.
    pub thoughtmarks: PgThoughtmarkRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            bins: PgBinRepository::new(pool.clone()),
            thoughtmarks: PgThoughtmarkRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    ///
    /// Pool sizing is read from the environment, see [`PoolConfig::from_env`].
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url, PoolConfig::from_env()).await?;
        Ok(Self::new(pool))
    }

    /// Connect to test database (for integration tests).
    #[cfg(any(test, feature = "integration"))]
    pub async fn connect_test() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| crate::test_fixtures::DEFAULT_TEST_DATABASE_URL.to_string());
        Self::connect(&database_url).await
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_handles_wildcards() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("under_score"), "under\\_score");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn escape_like_escapes_backslash_first() {
        // A pre-escaped wildcard must not collapse back into a live one.
        assert_eq!(escape_like("\\%"), "\\\\\\%");
    }
}
