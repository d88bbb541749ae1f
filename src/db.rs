use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePool;
use sqlx::sqlite::SqliteQueryAs;

/// Key the user directory is stored under.
pub static USERS_KEY: &str = "timeclock-users";

/// A stored value together with the version it was written at.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub value: String,
    pub version: u64,
}

pub async fn setup_pool(db_url: &str) -> Result<SqlitePool> {
    SqlitePool::new(db_url)
        .await
        .with_context(|| format!("Failed to open database {}", db_url))
}

pub async fn setup_db(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            version INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn read_value(pool: &SqlitePool, key: &str) -> Result<Option<Record>> {
    let row: Option<(String, i64)> = sqlx::query_as("SELECT value, version FROM kv WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(value, version)| Record {
        value,
        version: version as u64,
    }))
}

/// Store `value` under `key` unless the stored version is already at or
/// past `version`. Returns whether the write took place.
pub async fn write_value(pool: &SqlitePool, key: &str, value: &str, version: u64) -> Result<bool> {
    let affected = sqlx::query(
        "INSERT INTO kv(key, value, version) VALUES(?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value=excluded.value, version=excluded.version
        WHERE excluded.version > kv.version",
    )
    .bind(key)
    .bind(value)
    .bind(version as i64)
    .execute(pool)
    .await?;

    Ok(affected > 0)
}
