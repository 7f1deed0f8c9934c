use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use musika_core::ingest::entity::{CommitStats, ReconciledBatch};
use musika_core::market::entity::{DailyPrice, MarketSnapshot, Security};
use musika_core::store::error::StoreError;
use musika_core::store::port::{
    IngestStore, MarketReadStore, MoverDirection, MoverRow, PriceHistoryQuery, SecurityFilter,
};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

/// 证券行的原始列形态。
type SecurityRow = (
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// 行情行的原始列形态，十进制列以 TEXT 形式取回。
type PriceRow = (
    i64,
    i64,
    NaiveDate,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
    String,
    DateTime<Utc>,
);

/// 快照行的原始列形态。
type SnapshotRow = (
    i64,
    NaiveDate,
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    i64,
    i64,
    String,
    DateTime<Utc>,
);

const SECURITY_COLUMNS: &str =
    "id, symbol, name, security_type, sector, currency, is_active, created_at, updated_at";

const PRICE_COLUMNS: &str = "id, security_id, trade_date, price, change_pct, market_cap, \
     open_price, high_price, low_price, close_price, volume, data_source, created_at";

/// `IngestStore` 与 `MarketReadStore` 的 SQLite 实现。
///
/// # Summary
/// 行情数据的写读两面共享同一组表：采集批次在单个事务内提交，
/// 对外查询直接走同一个数据库文件。
///
/// # Invariants
/// * `daily_prices` 的 (security_id, trade_date) 与 `market_snapshots` 的
///   trade_date 唯一约束由表结构强制。
/// * 覆盖更新只改动行情字段，`created_at` 一经写入不再变化。
pub struct SqliteMarketStore {
    pool: SqlitePool,
}

impl SqliteMarketStore {
    /// 创建存储实例并确保表结构就绪。
    pub async fn new() -> Result<Self, StoreError> {
        Ok(Self {
            pool: crate::db::connect().await?,
        })
    }
}

fn security_from_row(row: SecurityRow) -> Result<Security, StoreError> {
    Ok(Security {
        id: row.0,
        symbol: row.1,
        name: row.2,
        security_type: row.3.parse().map_err(StoreError::Database)?,
        sector: row.4,
        currency: row.5.parse().map_err(StoreError::Database)?,
        is_active: row.6,
        created_at: row.7,
        updated_at: row.8,
    })
}

fn price_from_row(row: PriceRow) -> DailyPrice {
    DailyPrice {
        id: row.0,
        security_id: row.1,
        trade_date: row.2,
        price: Decimal::from_str(&row.3).unwrap_or_default(),
        change_pct: Decimal::from_str(&row.4).unwrap_or_default(),
        market_cap: parse_optional_decimal(row.5),
        open_price: parse_optional_decimal(row.6),
        high_price: parse_optional_decimal(row.7),
        low_price: parse_optional_decimal(row.8),
        close_price: parse_optional_decimal(row.9),
        volume: row.10,
        data_source: row.11,
        created_at: row.12,
    }
}

fn snapshot_from_row(row: SnapshotRow) -> MarketSnapshot {
    MarketSnapshot {
        id: row.0,
        trade_date: row.1,
        total_trades: row.2,
        total_turnover: parse_optional_decimal(row.3),
        market_cap: parse_optional_decimal(row.4),
        foreign_purchases: parse_optional_decimal(row.5),
        foreign_sales: parse_optional_decimal(row.6),
        advances: row.7,
        declines: row.8,
        unchanged: row.9,
        data_source: row.10,
        created_at: row.11,
    }
}

fn parse_optional_decimal(text: Option<String>) -> Option<Decimal> {
    text.as_deref().and_then(|t| Decimal::from_str(t).ok())
}

#[async_trait]
impl IngestStore for SqliteMarketStore {
    /// # Summary
    /// 加载全部证券作为核对索引。
    ///
    /// # Logic
    /// 全表读取 `securities`，含已停用证券，避免停用标的被误判为新证券。
    ///
    /// # Returns
    /// * `Result<Vec<Security>, StoreError>`
    async fn security_index(&self) -> Result<Vec<Security>, StoreError> {
        let rows = sqlx::query_as::<_, SecurityRow>(&format!(
            "SELECT {SECURITY_COLUMNS} FROM securities"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter().map(security_from_row).collect()
    }

    /// # Summary
    /// 在单个事务内提交一个核对批次。
    ///
    /// # Logic
    /// 1. 逐一 Upsert 暂存的新证券并取回分配的 ID。
    /// 2. 以 (security_id, trade_date) 为键 Upsert 全部行情行，
    ///    冲突时覆盖行情字段并保留 `created_at`。
    /// 3. 以 trade_date 为键 Upsert 市场快照。
    /// 4. 提交事务；任何一步失败整体回滚。
    ///
    /// # Arguments
    /// * `batch` - 核对完成的采集批次。
    ///
    /// # Returns
    /// * `Result<CommitStats, StoreError>` - 提交统计。
    async fn commit_batch(&self, batch: &ReconciledBatch) -> Result<CommitStats, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;
        let now = Utc::now();
        let mut stats = CommitStats::default();
        let mut assigned: HashMap<String, i64> = HashMap::new();

        for staged in &batch.new_securities {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO securities (symbol, name, security_type, currency, is_active, created_at, updated_at)
                VALUES (?, ?, ?, ?, 1, ?, ?)
                ON CONFLICT (symbol) DO UPDATE SET
                    name = COALESCE(excluded.name, securities.name),
                    updated_at = excluded.updated_at
                RETURNING id
                "#,
            )
            .bind(&staged.symbol)
            .bind(&staged.name)
            .bind(staged.security_type.to_string())
            .bind(staged.currency.to_string())
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

            assigned.insert(staged.symbol.clone(), id);
            stats.securities_created += 1;
        }

        for draft in &batch.prices {
            let security_id = match draft.security_id {
                Some(id) => id,
                None => *assigned.get(&draft.symbol).ok_or_else(|| {
                    StoreError::Transaction(format!(
                        "No security id assigned for symbol {}",
                        draft.symbol
                    ))
                })?,
            };

            sqlx::query(
                r#"
                INSERT INTO daily_prices (security_id, trade_date, price, change_pct, market_cap, data_source, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (security_id, trade_date) DO UPDATE SET
                    price = excluded.price,
                    change_pct = excluded.change_pct,
                    market_cap = excluded.market_cap,
                    data_source = excluded.data_source
                "#,
            )
            .bind(security_id)
            .bind(batch.trade_date)
            .bind(draft.price.to_string())
            .bind(draft.change_pct.to_string())
            .bind(draft.market_cap.map(|d| d.to_string()))
            .bind(&batch.data_source)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

            stats.prices_upserted += 1;
        }

        if let Some(snapshot) = &batch.snapshot {
            sqlx::query(
                r#"
                INSERT INTO market_snapshots
                    (trade_date, total_trades, total_turnover, market_cap, foreign_purchases,
                     foreign_sales, advances, declines, unchanged, data_source, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (trade_date) DO UPDATE SET
                    total_trades = excluded.total_trades,
                    total_turnover = excluded.total_turnover,
                    market_cap = excluded.market_cap,
                    foreign_purchases = excluded.foreign_purchases,
                    foreign_sales = excluded.foreign_sales,
                    advances = excluded.advances,
                    declines = excluded.declines,
                    unchanged = excluded.unchanged,
                    data_source = excluded.data_source
                "#,
            )
            .bind(batch.trade_date)
            .bind(snapshot.total_trades)
            .bind(snapshot.total_turnover.map(|d| d.to_string()))
            .bind(snapshot.market_cap.map(|d| d.to_string()))
            .bind(snapshot.foreign_purchases.map(|d| d.to_string()))
            .bind(snapshot.foreign_sales.map(|d| d.to_string()))
            .bind(snapshot.advances)
            .bind(snapshot.declines)
            .bind(snapshot.unchanged)
            .bind(&batch.data_source)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

            stats.snapshot_written = true;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        info!(
            trade_date = %batch.trade_date,
            securities_created = stats.securities_created,
            prices_upserted = stats.prices_upserted,
            snapshot_written = stats.snapshot_written,
            "Committed ingest batch"
        );
        Ok(stats)
    }
}

#[async_trait]
impl MarketReadStore for SqliteMarketStore {
    /// # Summary
    /// 按条件列出证券。
    ///
    /// # Logic
    /// 根据过滤条件动态拼接 WHERE 子句，按代码升序返回。
    ///
    /// # Arguments
    /// * `filter` - 列表过滤条件。
    ///
    /// # Returns
    /// * `Result<Vec<Security>, StoreError>`
    async fn list_securities(&self, filter: &SecurityFilter) -> Result<Vec<Security>, StoreError> {
        let mut sql = format!("SELECT {SECURITY_COLUMNS} FROM securities WHERE 1 = 1");
        if filter.active_only {
            sql.push_str(" AND is_active = 1");
        }
        if filter.security_type.is_some() {
            sql.push_str(" AND security_type = ?");
        }
        if filter.sector.is_some() {
            sql.push_str(" AND sector = ?");
        }
        sql.push_str(" ORDER BY symbol ASC");

        let mut query = sqlx::query_as::<_, SecurityRow>(&sql);
        if let Some(security_type) = filter.security_type {
            query = query.bind(security_type.to_string());
        }
        if let Some(sector) = &filter.sector {
            query = query.bind(sector.clone());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter().map(security_from_row).collect()
    }

    /// # Summary
    /// 按规范化代码查询单只证券。
    async fn get_security(&self, symbol: &str) -> Result<Option<Security>, StoreError> {
        sqlx::query_as::<_, SecurityRow>(&format!(
            "SELECT {SECURITY_COLUMNS} FROM securities WHERE symbol = ?"
        ))
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .map(security_from_row)
        .transpose()
    }

    /// # Summary
    /// 查询单只证券的历史行情。
    ///
    /// # Logic
    /// 按交易日倒序查询 `daily_prices`，应用可选区间并按 limit 截断。
    ///
    /// # Arguments
    /// * `security_id` - 证券 ID。
    /// * `query` - 区间与条数限制。
    ///
    /// # Returns
    /// * `Result<Vec<DailyPrice>, StoreError>`
    async fn price_history(
        &self,
        security_id: i64,
        query: &PriceHistoryQuery,
    ) -> Result<Vec<DailyPrice>, StoreError> {
        let mut sql = format!("SELECT {PRICE_COLUMNS} FROM daily_prices WHERE security_id = ?");
        if query.start_date.is_some() {
            sql.push_str(" AND trade_date >= ?");
        }
        if query.end_date.is_some() {
            sql.push_str(" AND trade_date <= ?");
        }
        sql.push_str(" ORDER BY trade_date DESC LIMIT ?");

        let mut stmt = sqlx::query_as::<_, PriceRow>(&sql).bind(security_id);
        if let Some(start) = query.start_date {
            stmt = stmt.bind(start);
        }
        if let Some(end) = query.end_date {
            stmt = stmt.bind(end);
        }
        stmt = stmt.bind(i64::from(query.limit));

        let rows = stmt
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(price_from_row).collect())
    }

    /// # Summary
    /// 查询单只证券最近一个交易日的行情。
    async fn latest_price(&self, security_id: i64) -> Result<Option<DailyPrice>, StoreError> {
        let row = sqlx::query_as::<_, PriceRow>(&format!(
            "SELECT {PRICE_COLUMNS} FROM daily_prices WHERE security_id = ? \
             ORDER BY trade_date DESC LIMIT 1"
        ))
        .bind(security_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(row.map(price_from_row))
    }

    /// # Summary
    /// 查询市场快照。
    ///
    /// # Arguments
    /// * `trade_date` - 指定交易日；None 表示最近一个有快照的交易日。
    ///
    /// # Returns
    /// * `Result<Option<MarketSnapshot>, StoreError>`
    async fn market_summary(
        &self,
        trade_date: Option<NaiveDate>,
    ) -> Result<Option<MarketSnapshot>, StoreError> {
        const COLUMNS: &str = "id, trade_date, total_trades, total_turnover, market_cap, \
             foreign_purchases, foreign_sales, advances, declines, unchanged, data_source, created_at";

        let row = match trade_date {
            Some(date) => {
                sqlx::query_as::<_, SnapshotRow>(&format!(
                    "SELECT {COLUMNS} FROM market_snapshots WHERE trade_date = ?"
                ))
                .bind(date)
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, SnapshotRow>(&format!(
                    "SELECT {COLUMNS} FROM market_snapshots ORDER BY trade_date DESC LIMIT 1"
                ))
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(row.map(snapshot_from_row))
    }

    /// # Summary
    /// 查询最近交易日的涨跌榜。
    ///
    /// # Logic
    /// 1. 以 `daily_prices` 中最大的 trade_date 为基准日。
    /// 2. 十进制列以 TEXT 存储，比较与排序前 CAST 为 REAL。
    ///
    /// # Arguments
    /// * `direction` - 榜单方向。
    /// * `limit` - 返回条数上限。
    ///
    /// # Returns
    /// * `Result<Vec<MoverRow>, StoreError>`
    async fn top_movers(
        &self,
        direction: MoverDirection,
        limit: u32,
    ) -> Result<Vec<MoverRow>, StoreError> {
        let sql = match direction {
            MoverDirection::Gainers => {
                "SELECT s.symbol, p.price, p.change_pct \
                 FROM daily_prices p JOIN securities s ON s.id = p.security_id \
                 WHERE p.trade_date = (SELECT MAX(trade_date) FROM daily_prices) \
                   AND CAST(p.change_pct AS REAL) > 0 \
                 ORDER BY CAST(p.change_pct AS REAL) DESC LIMIT ?"
            }
            MoverDirection::Losers => {
                "SELECT s.symbol, p.price, p.change_pct \
                 FROM daily_prices p JOIN securities s ON s.id = p.security_id \
                 WHERE p.trade_date = (SELECT MAX(trade_date) FROM daily_prices) \
                   AND CAST(p.change_pct AS REAL) < 0 \
                 ORDER BY CAST(p.change_pct AS REAL) ASC LIMIT ?"
            }
        };

        let rows = sqlx::query_as::<_, (String, String, String)>(sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| MoverRow {
                symbol: r.0,
                price: Decimal::from_str(&r.1).unwrap_or_default(),
                change_pct: Decimal::from_str(&r.2).unwrap_or_default(),
            })
            .collect())
    }
}
