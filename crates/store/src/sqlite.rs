//! SQLite-backed fingerprint store.
//!
//! The `identity` primary key plus `INSERT ... ON CONFLICT DO NOTHING` gives
//! the atomic claim primitive the dedup engine needs; no additional locking
//! is required around the decision.

use std::{path::Path, time::Duration};

use {
    async_trait::async_trait,
    sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    tracing::debug,
};

use crate::{
    DeliveryRecord, DeliveryStatus, Error, FingerprintStore, InsertOutcome, MediaIdentity, Result,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS delivery_records (
    identity          TEXT PRIMARY KEY,
    source_channel_id INTEGER NOT NULL,
    first_seen_at     INTEGER NOT NULL,
    target_message_id INTEGER,
    status            TEXT NOT NULL DEFAULT 'pending',
    suppression_count INTEGER NOT NULL DEFAULT 0,
    removed_links     INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_delivery_records_status_seen
    ON delivery_records (status, first_seen_at);
"#;

#[derive(sqlx::FromRow)]
struct RecordRow {
    identity: String,
    source_channel_id: i64,
    first_seen_at: i64,
    target_message_id: Option<i64>,
    status: String,
    suppression_count: i64,
    removed_links: i64,
}

impl TryFrom<RecordRow> for DeliveryRecord {
    type Error = Error;

    fn try_from(row: RecordRow) -> Result<Self> {
        let status = DeliveryStatus::parse(&row.status).ok_or_else(|| Error::Corrupt {
            identity: row.identity.clone(),
            message: format!("unknown status {:?}", row.status),
        })?;
        Ok(Self {
            identity: row.identity,
            source_channel_id: row.source_channel_id,
            first_seen_at: row.first_seen_at,
            target_message_id: row.target_message_id,
            status,
            suppression_count: row.suppression_count,
            removed_links: row.removed_links,
        })
    }
}

/// SQLite-backed [`FingerprintStore`].
#[derive(Clone)]
pub struct SqliteFingerprintStore {
    pool: sqlx::SqlitePool,
}

impl SqliteFingerprintStore {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, ensuring the schema exists.
    pub async fn with_pool(pool: sqlx::SqlitePool) -> Result<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Single-connection in-memory store for tests.
    pub async fn in_memory() -> Result<Self> {
        // One connection only: each new `:memory:` connection would otherwise
        // see its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }
}

#[async_trait]
impl FingerprintStore for SqliteFingerprintStore {
    async fn lookup(&self, identity: &MediaIdentity) -> Result<Option<DeliveryRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            "SELECT identity, source_channel_id, first_seen_at, target_message_id, status, \
             suppression_count, removed_links FROM delivery_records WHERE identity = ?",
        )
        .bind(identity.as_key())
        .fetch_optional(&self.pool)
        .await?;
        row.map(DeliveryRecord::try_from).transpose()
    }

    async fn insert_if_absent(
        &self,
        identity: &MediaIdentity,
        provisional: DeliveryRecord,
    ) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"INSERT INTO delivery_records
                   (identity, source_channel_id, first_seen_at, target_message_id, status,
                    suppression_count, removed_links)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(identity) DO NOTHING"#,
        )
        .bind(identity.as_key())
        .bind(provisional.source_channel_id)
        .bind(provisional.first_seen_at)
        .bind(provisional.target_message_id)
        .bind(provisional.status.as_str())
        .bind(provisional.suppression_count)
        .bind(provisional.removed_links)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            debug!(identity = %identity, "claimed delivery slot");
            return Ok(InsertOutcome {
                inserted: true,
                existing: None,
            });
        }
        Ok(InsertOutcome {
            inserted: false,
            existing: self.lookup(identity).await?,
        })
    }

    async fn finalize(&self, identity: &MediaIdentity, target_message_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE delivery_records SET status = 'delivered', target_message_id = ? \
             WHERE identity = ? AND status = 'pending'",
        )
        .bind(target_message_id)
        .bind(identity.as_key())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_provisional(&self, identity: &MediaIdentity) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM delivery_records WHERE identity = ? AND status = 'pending'")
                .bind(identity.as_key())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_suppression(&self, identity: &MediaIdentity) -> Result<()> {
        sqlx::query(
            "UPDATE delivery_records SET suppression_count = suppression_count + 1 \
             WHERE identity = ?",
        )
        .bind(identity.as_key())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_abandoned(&self, cutoff_ms: i64) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM delivery_records WHERE status = 'pending' AND first_seen_at < ?",
        )
        .bind(cutoff_ms)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM delivery_records")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
