use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// String-keyed option persistence. Values are stored as plain text;
/// typed settings live in [`super::Settings`] and convert at this edge.
/// Writes are last-write-wins.
#[derive(Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
}

impl SettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsStore { pool }
    }

    pub async fn bootstrap(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS options (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("failed to create options table")?;
        Ok(())
    }

    pub async fn get_option(&self, name: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM options WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("failed to read option {}", name))?;
        Ok(value)
    }

    pub async fn set_option(&self, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO options (name, value) VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write option {}", name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SettingsStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SettingsStore::new(pool);
        store.bootstrap().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_missing_option_reads_as_none() {
        let store = store().await;
        assert_eq!(store.get_option("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let store = store().await;
        store.set_option("show_in_toolbar", "true").await.unwrap();
        assert_eq!(
            store.get_option("show_in_toolbar").await.unwrap(),
            Some("true".to_string())
        );
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = store().await;
        store.set_option("refresh_interval_seconds", "30").await.unwrap();
        store.set_option("refresh_interval_seconds", "120").await.unwrap();
        assert_eq!(
            store.get_option("refresh_interval_seconds").await.unwrap(),
            Some("120".to_string())
        );
    }
}
