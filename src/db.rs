use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use diesel::{Connection, SqliteConnection};
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use tokio::sync::{Mutex, MutexGuard};

pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;

const SCHEMA_SQL: &str = include_str!("../migrations/2025-11-08-143022_create_tables/up.sql");

/// Handle to the embedded store: one shared SQLite connection, opened with
/// foreign-key enforcement so cascade deletes and referential integrity live
/// in the storage layer. The handle is constructed once at the composition
/// root and cloned into each operation; requests serialize on the connection
/// the same way they would on a single embedded-engine handle.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<DbConnection>>,
}

impl Store {
    /// Opens (creating if necessary) the data file at `database_path`.
    /// Migrations are expected to have run already, see [`run_migrations`].
    pub async fn open(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let conn = Self::establish(database_path).await?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory store with the full schema applied. Each
    /// call returns a completely isolated database, which is what tests
    /// want.
    pub async fn open_in_memory() -> Result<Self> {
        let mut conn = Self::establish(":memory:").await?;
        conn.batch_execute(SCHEMA_SQL)
            .await
            .context("Failed to apply schema to in-memory store")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn establish(database_path: &str) -> Result<DbConnection> {
        let mut conn = DbConnection::establish(database_path)
            .await
            .with_context(|| format!("Failed to open SQLite store at {database_path}"))?;

        conn.batch_execute("PRAGMA foreign_keys = ON")
            .await
            .context("Failed to enable foreign key enforcement")?;

        Ok(conn)
    }

    pub async fn conn(&self) -> MutexGuard<'_, DbConnection> {
        self.conn.lock().await
    }
}

/// Applies pending embedded migrations against the data file. SQLite's
/// migration harness is synchronous, so this runs on the blocking pool.
pub async fn run_migrations(migrations: EmbeddedMigrations, database_path: &str) -> Result<usize> {
    if let Some(parent) = Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let database_path = database_path.to_owned();
    let count = tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut conn = SqliteConnection::establish(&database_path)
            .with_context(|| format!("Failed to open SQLite store at {database_path}"))?;
        let versions = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow!("Failed to run migrations: {err}"))?;
        Ok(versions.len())
    })
    .await
    .context("Migration task panicked")??;

    Ok(count)
}
