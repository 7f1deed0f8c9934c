use musika_core::store::error::StoreError;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::fs;

/// 中心数据库文件名，位于配置的数据根目录下。
const DEFAULT_DB: &str = "musika.db";

/// 全部表结构。DDL 幂等，任何存储实例先建都可以。
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS securities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL UNIQUE,
    name TEXT,
    security_type TEXT NOT NULL DEFAULT 'equity',
    sector TEXT,
    currency TEXT NOT NULL DEFAULT 'ZWG',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    security_id INTEGER NOT NULL REFERENCES securities (id),
    trade_date DATE NOT NULL,
    price TEXT NOT NULL,
    change_pct TEXT NOT NULL,
    market_cap TEXT,
    open_price TEXT,
    high_price TEXT,
    low_price TEXT,
    close_price TEXT,
    volume INTEGER,
    data_source TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    UNIQUE (security_id, trade_date)
);

CREATE INDEX IF NOT EXISTS idx_daily_prices_trade_date ON daily_prices (trade_date);

CREATE TABLE IF NOT EXISTS market_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trade_date DATE NOT NULL UNIQUE,
    total_trades INTEGER,
    total_turnover TEXT,
    market_cap TEXT,
    foreign_purchases TEXT,
    foreign_sales TEXT,
    advances INTEGER NOT NULL DEFAULT 0,
    declines INTEGER NOT NULL DEFAULT 0,
    unchanged INTEGER NOT NULL DEFAULT 0,
    data_source TEXT NOT NULL,
    created_at DATETIME NOT NULL
);

CREATE TABLE IF NOT EXISTS scrape_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scrape_timestamp DATETIME NOT NULL,
    status TEXT NOT NULL,
    source_url TEXT NOT NULL,
    records_parsed INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    execution_time_ms INTEGER NOT NULL DEFAULT 0,
    raw_snapshot TEXT
);

CREATE TABLE IF NOT EXISTS api_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key_hash TEXT NOT NULL UNIQUE,
    key_prefix TEXT NOT NULL,
    user_email TEXT NOT NULL,
    tier TEXT NOT NULL DEFAULT 'free',
    requests_today INTEGER NOT NULL DEFAULT 0,
    requests_month INTEGER NOT NULL DEFAULT 0,
    daily_limit INTEGER NOT NULL,
    monthly_limit INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at DATETIME NOT NULL,
    last_used_at DATETIME
);

CREATE INDEX IF NOT EXISTS idx_api_keys_prefix ON api_keys (key_prefix);
"#;

/// # Summary
/// 打开中心数据库连接池并初始化表结构。
///
/// # Logic
/// 1. 确保数据根目录存在。
/// 2. 配置 SQLite 连接选项：自动建库、WAL 日志、写忙等待。
/// 3. 连接后执行幂等 DDL。
///
/// # Returns
/// * `Result<SqlitePool, StoreError>` - 就绪的连接池或数据库错误。
pub(crate) async fn connect() -> Result<SqlitePool, StoreError> {
    let root = crate::config::get_root_dir();
    fs::create_dir_all(&root).map_err(|e| StoreError::InitError(e.to_string()))?;

    let options = SqliteConnectOptions::new()
        .filename(root.join(DEFAULT_DB))
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(10))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

    // DDL 为多语句脚本，走非预编译路径执行
    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

    Ok(pool)
}
