use async_trait::async_trait;
use chrono::{DateTime, Utc};
use musika_core::ingest::entity::{ScrapeLog, ScrapeLogEntry};
use musika_core::store::error::StoreError;
use musika_core::store::port::ScrapeLogStore;
use sqlx::SqlitePool;

type LogRow = (
    i64,
    DateTime<Utc>,
    String,
    String,
    i64,
    Option<String>,
    i64,
    Option<String>,
);

/// `ScrapeLogStore` 的 SQLite 实现。
///
/// # Invariants
/// * `scrape_logs` 只追加，从不更新或删除。
pub struct SqliteScrapeLogStore {
    pool: SqlitePool,
}

impl SqliteScrapeLogStore {
    /// 创建存储实例并确保表结构就绪。
    pub async fn new() -> Result<Self, StoreError> {
        Ok(Self {
            pool: crate::db::connect().await?,
        })
    }
}

#[async_trait]
impl ScrapeLogStore for SqliteScrapeLogStore {
    /// # Summary
    /// 追加一条抓取日志，写入时间戳取当前时刻。
    ///
    /// # Arguments
    /// * `entry` - 日志草稿。
    ///
    /// # Returns
    /// * `Result<i64, StoreError>` - 新日志行的 ID。
    async fn record(&self, entry: &ScrapeLogEntry) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO scrape_logs
                (scrape_timestamp, status, source_url, records_parsed, error_message,
                 execution_time_ms, raw_snapshot)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Utc::now())
        .bind(entry.status.to_string())
        .bind(&entry.source_url)
        .bind(entry.records_parsed)
        .bind(&entry.error_message)
        .bind(entry.execution_time_ms)
        .bind(&entry.raw_snapshot)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// # Summary
    /// 按时间倒序列出最近的抓取日志。
    ///
    /// # Arguments
    /// * `limit` - 返回条数上限。
    ///
    /// # Returns
    /// * `Result<Vec<ScrapeLog>, StoreError>`
    async fn recent(&self, limit: u32) -> Result<Vec<ScrapeLog>, StoreError> {
        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT id, scrape_timestamp, status, source_url, records_parsed, error_message, \
             execution_time_ms, raw_snapshot \
             FROM scrape_logs ORDER BY scrape_timestamp DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(ScrapeLog {
                    id: row.0,
                    scrape_timestamp: row.1,
                    status: row.2.parse().map_err(StoreError::Database)?,
                    source_url: row.3,
                    records_parsed: row.4,
                    error_message: row.5,
                    execution_time_ms: row.6,
                    raw_snapshot: row.7,
                })
            })
            .collect()
    }
}
