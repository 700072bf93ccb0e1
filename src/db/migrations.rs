//! Catalog lifecycle and schema migrations.

use crate::error::CatalogError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::Catalog;

impl Catalog {
    /// Open (or create) the catalog at `path`
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Catalog(CatalogError::ConnectionFailed(format!(
                    "Failed to create catalog directory: {}",
                    e
                )))
            })?;
        }

        // Connect with foreign key enforcement and WAL mode
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Catalog(CatalogError::ConnectionFailed(format!(
                    "Failed to parse catalog path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Catalog(CatalogError::ConnectionFailed(format!(
                "Failed to connect to catalog: {}",
                e
            )))
        })?;

        let catalog = Self { pool };

        // Run migrations
        catalog.run_migrations().await?;

        Ok(catalog)
    }

    /// Run catalog migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Catalog(CatalogError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        // Create schema version table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        // Check current version
        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Catalog(CatalogError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?
                .flatten();

        let current_version = current_version.unwrap_or(0);

        // Apply migrations
        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: Create initial schema
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying catalog migration v1");

        // Wrap migration in a transaction so partial failures don't leave the
        // catalog in a broken state
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Catalog(CatalogError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            Self::create_updates_schema(conn).await?;
            Self::create_assets_schema(conn).await?;
            Self::create_metadata_schema(conn).await?;
            Self::record_migration(conn, 1).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Catalog(CatalogError::MigrationFailed(format!(
                            "Failed to commit migration v1: {}",
                            e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        Ok(())
    }

    async fn create_updates_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS updates (
                id TEXT PRIMARY KEY NOT NULL,
                scope_key TEXT NOT NULL,
                status INTEGER NOT NULL,
                launch_asset_key TEXT,
                has_skipped_assets INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::MigrationFailed(format!(
                "Failed to create updates table: {}",
                e
            )))
        })?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_updates_scope_key ON updates(scope_key)")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Catalog(CatalogError::MigrationFailed(format!(
                    "Failed to create updates index: {}",
                    e
                )))
            })?;

        Ok(())
    }

    async fn create_assets_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assets (
                key TEXT PRIMARY KEY NOT NULL,
                url TEXT,
                content_hash TEXT,
                relative_path TEXT,
                is_launch_asset INTEGER NOT NULL DEFAULT 0,
                download_time INTEGER
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::MigrationFailed(format!(
                "Failed to create assets table: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS updates_assets (
                update_id TEXT NOT NULL REFERENCES updates(id) ON DELETE CASCADE,
                asset_key TEXT NOT NULL REFERENCES assets(key) ON DELETE CASCADE,
                PRIMARY KEY (update_id, asset_key)
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::MigrationFailed(format!(
                "Failed to create updates_assets table: {}",
                e
            )))
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_updates_assets_asset_key ON updates_assets(asset_key)",
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::MigrationFailed(format!(
                "Failed to create updates_assets index: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn create_metadata_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS manifest_metadata (
                scope_key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Catalog(CatalogError::MigrationFailed(format!(
                "Failed to create manifest_metadata table: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn record_migration(conn: &mut SqliteConnection, version: i64) -> Result<()> {
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Catalog(CatalogError::MigrationFailed(format!(
                    "Failed to record migration v{}: {}",
                    version, e
                )))
            })?;

        Ok(())
    }

    /// Close the catalog, flushing the connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
