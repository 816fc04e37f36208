use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

/// Tables and indexes, created idempotently at startup.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS part_types (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        description TEXT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS parts (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        part_type_id  INTEGER NOT NULL REFERENCES part_types(id),
        current_count INTEGER NOT NULL DEFAULT 0 CHECK (current_count >= 0),
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        part_id          INTEGER NOT NULL REFERENCES parts(id),
        transaction_type TEXT NOT NULL CHECK (transaction_type IN ('add', 'remove')),
        quantity         INTEGER NOT NULL CHECK (quantity > 0),
        user_name        TEXT NOT NULL,
        reason           TEXT NULL,
        description      TEXT NULL,
        created_at       TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_parts_part_type_id ON parts (part_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_part_id ON transactions (part_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions (created_at)",
];

#[derive(Clone)]
pub struct DbClient {
    pub pool: SqlitePool,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_seconds));
        if !config.is_in_memory() {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

        // Every connection to an in-memory url opens its own empty database,
        // so pin exactly one connection for the lifetime of the pool.
        pool_options = if config.is_in_memory() {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;

        Ok(Self { pool })
    }

    /// Connects to a fresh in-memory database with the schema in place.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let client = Self::new(&DatabaseConfig::in_memory()).await?;
        client.ensure_schema().await?;
        Ok(client)
    }

    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        info!("Ensuring inventory schema...");
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        info!("Inventory schema ready.");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
