use super::error::StoreError;
use crate::auth::entity::{ApiKey, IssuedKey, QuotaDecision};
use crate::common::{SecurityType, Tier};
use crate::config::TierLimits;
use crate::ingest::entity::{CommitStats, ReconciledBatch, ScrapeLog, ScrapeLogEntry};
use crate::market::entity::{DailyPrice, MarketSnapshot, Security};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 证券列表查询条件。
#[derive(Debug, Clone, Default)]
pub struct SecurityFilter {
    // 仅返回在挂牌状态的证券
    pub active_only: bool,
    // 按类别过滤
    pub security_type: Option<SecurityType>,
    // 按行业板块过滤
    pub sector: Option<String>,
}

/// # Summary
/// 历史行情查询条件。
#[derive(Debug, Clone)]
pub struct PriceHistoryQuery {
    // 起始交易日（含）
    pub start_date: Option<NaiveDate>,
    // 截止交易日（含）
    pub end_date: Option<NaiveDate>,
    // 返回行数上限，按交易日倒序截取
    pub limit: u32,
}

impl Default for PriceHistoryQuery {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            limit: 30,
        }
    }
}

/// # Summary
/// 涨跌榜方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverDirection {
    // 涨幅榜：change_pct > 0，降序
    Gainers,
    // 跌幅榜：change_pct < 0，升序
    Losers,
}

/// # Summary
/// 涨跌榜单行：最近一个交易日内涨跌幅居前的证券。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoverRow {
    pub symbol: String,
    pub price: Decimal,
    pub change_pct: Decimal,
}

/// # Summary
/// 计数器滚动清零的时间窗口。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetWindow {
    // 清零 requests_today
    Daily,
    // 清零 requests_month
    Monthly,
}

/// # Summary
/// 密钥池的整体使用统计，供运维查看。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyUsageStats {
    // 密钥总数
    pub total_keys: i64,
    // 仍然有效的密钥数
    pub active_keys: i64,
    // 今日全部密钥的请求总量
    pub requests_today: i64,
    // 本月全部密钥的请求总量
    pub requests_month: i64,
    // 今日用量最高的持有者（邮箱与请求数）
    pub top_users: Vec<KeyUsageRow>,
}

/// # Summary
/// 使用统计中的单行：一个持有者的当日用量。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyUsageRow {
    pub user_email: String,
    pub requests_today: i64,
}

/// # Summary
/// 采集写入接口：证券索引加载与批次的原子提交。
///
/// # Invariants
/// - `commit_batch` 的全部写入必须在单个事务内完成；任一步失败即整体回滚。
/// - (security_id, trade_date) 与 trade_date 的唯一约束由存储引擎强制，
///   重复提交同一交易日只产生覆盖更新。
#[async_trait]
pub trait IngestStore: Send + Sync {
    /// # Summary
    /// 加载全部证券作为核对索引。
    ///
    /// # Logic
    /// 1. 读取 `securities` 全表，含已停用证券。
    /// 2. 调用方自行构建规范化代码到 ID 的映射。
    ///
    /// # Returns
    /// 返回证券列表或 `StoreError`。
    async fn security_index(&self) -> Result<Vec<Security>, StoreError>;

    /// # Summary
    /// 在单个事务内提交一个核对批次。
    ///
    /// # Logic
    /// 1. 按代码逐一 Upsert 暂存的新证券并取回分配的 ID。
    /// 2. 以 (security_id, trade_date) 为键 Upsert 全部行情行：
    ///    冲突时覆盖 price / change_pct / market_cap / data_source，保留 created_at。
    /// 3. 以 trade_date 为键 Upsert 市场快照。
    /// 4. 提交事务；任何一步失败则回滚且不留下任何写入。
    ///
    /// # Arguments
    /// * `batch`: 核对完成的采集批次。
    ///
    /// # Returns
    /// 成功返回提交统计，失败返回 `StoreError`。
    async fn commit_batch(&self, batch: &ReconciledBatch) -> Result<CommitStats, StoreError>;
}

/// # Summary
/// 抓取审计日志接口。日志表只追加，从不更新或删除。
///
/// # Invariants
/// - 审计写入独立于批次事务：提交失败后日志本身仍须落盘。
#[async_trait]
pub trait ScrapeLogStore: Send + Sync {
    /// # Summary
    /// 追加一条抓取日志。
    ///
    /// # Logic
    /// 1. 以当前时间为 scrape_timestamp 插入 `scrape_logs`。
    ///
    /// # Arguments
    /// * `entry`: 日志草稿。
    ///
    /// # Returns
    /// 返回新日志行的 ID。
    async fn record(&self, entry: &ScrapeLogEntry) -> Result<i64, StoreError>;

    /// # Summary
    /// 按时间倒序列出最近的抓取日志。
    ///
    /// # Arguments
    /// * `limit`: 返回条数上限。
    ///
    /// # Returns
    /// 返回日志行列表。
    async fn recent(&self, limit: u32) -> Result<Vec<ScrapeLog>, StoreError>;
}

/// # Summary
/// 行情读取接口，服务于对外 API 的全部查询。
#[async_trait]
pub trait MarketReadStore: Send + Sync {
    /// # Summary
    /// 按条件列出证券。
    ///
    /// # Arguments
    /// * `filter`: 列表过滤条件。
    ///
    /// # Returns
    /// 按代码升序返回证券列表。
    async fn list_securities(&self, filter: &SecurityFilter) -> Result<Vec<Security>, StoreError>;

    /// # Summary
    /// 按规范化代码查询单只证券。
    ///
    /// # Arguments
    /// * `symbol`: 规范化证券代码。
    ///
    /// # Returns
    /// 存在返回 `Some(Security)`，否则返回 `None`。
    async fn get_security(&self, symbol: &str) -> Result<Option<Security>, StoreError>;

    /// # Summary
    /// 查询单只证券的历史行情。
    ///
    /// # Logic
    /// 1. 按交易日倒序查询 `daily_prices`。
    /// 2. 应用可选的日期区间并按 limit 截断。
    ///
    /// # Arguments
    /// * `security_id`: 证券 ID。
    /// * `query`: 区间与条数限制。
    ///
    /// # Returns
    /// 返回行情行列表。
    async fn price_history(
        &self,
        security_id: i64,
        query: &PriceHistoryQuery,
    ) -> Result<Vec<DailyPrice>, StoreError>;

    /// # Summary
    /// 查询单只证券最近一个交易日的行情。
    ///
    /// # Arguments
    /// * `security_id`: 证券 ID。
    ///
    /// # Returns
    /// 存在返回最新行情行，否则返回 `None`。
    async fn latest_price(&self, security_id: i64) -> Result<Option<DailyPrice>, StoreError>;

    /// # Summary
    /// 查询市场快照。
    ///
    /// # Arguments
    /// * `trade_date`: 指定交易日；None 表示最近一个有快照的交易日。
    ///
    /// # Returns
    /// 存在返回快照，否则返回 `None`。
    async fn market_summary(
        &self,
        trade_date: Option<NaiveDate>,
    ) -> Result<Option<MarketSnapshot>, StoreError>;

    /// # Summary
    /// 查询最近交易日的涨跌榜。
    ///
    /// # Logic
    /// 1. 以 `daily_prices` 中最大的 trade_date 为基准。
    /// 2. 按方向过滤涨跌幅符号并排序截取。
    ///
    /// # Arguments
    /// * `direction`: 榜单方向。
    /// * `limit`: 返回条数上限。
    ///
    /// # Returns
    /// 返回榜单行列表。
    async fn top_movers(
        &self,
        direction: MoverDirection,
        limit: u32,
    ) -> Result<Vec<MoverRow>, StoreError>;
}

/// # Summary
/// API 密钥存储接口：签发、检索、配额消费与运维操作。
///
/// # Invariants
/// - 明文密钥绝不入库，只保留 SHA-256 摘要与公开前缀。
/// - 配额检查与计数递增必须是同一条条件更新语句，
///   并发请求不得因先检查后递增的竞争而越过上限。
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// # Summary
    /// 签发一把新密钥。
    ///
    /// # Logic
    /// 1. 生成随机明文密钥并计算其 SHA-256 摘要。
    /// 2. 连同前缀、等级与配额上限插入 `api_keys`。
    /// 3. 明文仅随返回值出现一次。
    ///
    /// # Arguments
    /// * `email`: 持有者邮箱。
    /// * `tier`: 服务等级。
    /// * `limits`: 该等级适用的配额上限。
    ///
    /// # Returns
    /// 返回明文密钥与已入库的记录。
    async fn create_key(
        &self,
        email: &str,
        tier: Tier,
        limits: TierLimits,
    ) -> Result<IssuedKey, StoreError>;

    /// # Summary
    /// 按公开前缀检索仍然有效的候选密钥。
    ///
    /// # Logic
    /// 1. 查询 `key_prefix` 精确匹配且 `is_active = 1` 的行。
    /// 2. 摘要比对由调用方完成，前缀冲突时可能返回多行。
    ///
    /// # Arguments
    /// * `prefix`: 明文密钥的前 8 位。
    ///
    /// # Returns
    /// 返回候选密钥列表。
    async fn find_active_by_prefix(&self, prefix: &str) -> Result<Vec<ApiKey>, StoreError>;

    /// # Summary
    /// 原子地消费一次配额。
    ///
    /// # Logic
    /// 1. 执行单条条件更新：仅当密钥有效且两个计数均低于上限时，
    ///    同时递增两个计数并刷新 last_used_at。
    /// 2. 更新未命中时回读该行，区分吊销与具体耗尽的窗口。
    ///
    /// # Arguments
    /// * `key_id`: 密钥 ID。
    ///
    /// # Returns
    /// 返回裁决结果；被拒绝时计数保持原值。
    async fn consume_quota(&self, key_id: i64) -> Result<QuotaDecision, StoreError>;

    /// # Summary
    /// 按签发时间倒序列出全部密钥。
    async fn list_keys(&self) -> Result<Vec<ApiKey>, StoreError>;

    /// # Summary
    /// 启用或吊销一把密钥。
    ///
    /// # Arguments
    /// * `key_id`: 密钥 ID。
    /// * `active`: 目标状态。
    ///
    /// # Returns
    /// 命中时返回持有者邮箱，密钥不存在时返回 `None`。
    async fn set_active(&self, key_id: i64, active: bool) -> Result<Option<String>, StoreError>;

    /// # Summary
    /// 汇总密钥池的使用统计。
    async fn usage_stats(&self) -> Result<KeyUsageStats, StoreError>;

    /// # Summary
    /// 滚动清零指定窗口的使用计数。
    ///
    /// # Logic
    /// 1. 单条 UPDATE 将对应计数列整表清零，与请求路径互不阻塞。
    ///
    /// # Arguments
    /// * `window`: 日窗口或月窗口。
    ///
    /// # Returns
    /// 返回受影响的行数。
    async fn reset_counters(&self, window: ResetWindow) -> Result<u64, StoreError>;
}
