use crate::common::{Currency, SecurityType};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// # Summary
/// 核对阶段暂存的新证券：页面上首次出现、库中尚无记录的代码。
/// 实际的数据库 ID 在提交事务内插入时才分配。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedSecurity {
    // 规范化证券代码
    pub symbol: String,
    // 显示名称
    pub name: Option<String>,
    // 按板块与后缀启发式推断的类别
    pub security_type: SecurityType,
    // 配置的默认计价货币
    pub currency: Currency,
}

/// # Summary
/// 待提交的日线行情草稿。
///
/// # Invariants
/// - `security_id` 为 None 表示对应 `StagedSecurity`，提交时按 `symbol` 回填。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceDraft {
    // 规范化证券代码
    pub symbol: String,
    // 已有证券的 ID；新证券为 None
    pub security_id: Option<i64>,
    // 最新价
    pub price: Decimal,
    // 涨跌幅（百分数）
    pub change_pct: Decimal,
    // 市值
    pub market_cap: Option<Decimal>,
}

/// # Summary
/// 待提交的市场快照草稿。
/// 上涨/下跌/持平家数由同批次行情草稿的涨跌幅符号推导。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDraft {
    pub total_trades: Option<i64>,
    pub total_turnover: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub foreign_purchases: Option<Decimal>,
    pub foreign_sales: Option<Decimal>,
    pub advances: i64,
    pub declines: i64,
    pub unchanged: i64,
}

/// # Summary
/// 核对完成、可整体提交的采集批次。
///
/// # Invariants
/// - `prices` 中每个规范化代码至多出现一次；页面重复行已按后行覆盖并记入 `duplicates`。
/// - 整个批次在单个数据库事务内提交，不存在部分写入。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledBatch {
    // 本批次归属的交易日
    pub trade_date: NaiveDate,
    // 写入各行时标记的数据来源
    pub data_source: String,
    // 需要新建的证券
    pub new_securities: Vec<StagedSecurity>,
    // 全部行情草稿（含新证券的行）
    pub prices: Vec<PriceDraft>,
    // 市场快照草稿（页面活动区块缺失时为 None）
    pub snapshot: Option<SnapshotDraft>,
    // 批次内重复出现过的规范化代码
    pub duplicates: Vec<String>,
}

/// # Summary
/// 一次批次提交的统计结果。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CommitStats {
    // 新建的证券数
    pub securities_created: usize,
    // 写入（新增或覆盖）的行情行数
    pub prices_upserted: usize,
    // 是否写入了市场快照
    pub snapshot_written: bool,
}

/// # Summary
/// 抓取运行的最终状态。
///
/// # Invariants
/// - 持久化与序列化形式均为小写字符串（success / partial / failed）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    // 全部可解析行均已提交
    Success,
    // 提交成功但存在被跳过的行
    Partial,
    // 抓取、解析或提交失败，数据表未被改动
    Failed,
}

impl FromStr for ScrapeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(ScrapeStatus::Success),
            "partial" => Ok(ScrapeStatus::Partial),
            "failed" => Ok(ScrapeStatus::Failed),
            _ => Err(format!("Unknown ScrapeStatus: {}", s)),
        }
    }
}

impl std::fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeStatus::Success => write!(f, "success"),
            ScrapeStatus::Partial => write!(f, "partial"),
            ScrapeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// # Summary
/// 待写入审计日志的抓取记录草稿。写入时间戳由存储层填充。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeLogEntry {
    // 运行状态
    pub status: ScrapeStatus,
    // 抓取的源地址
    pub source_url: String,
    // 成功解析的记录数
    pub records_parsed: i64,
    // 失败原因（成功时为 None）
    pub error_message: Option<String>,
    // 运行耗时（毫秒）
    pub execution_time_ms: i64,
    // 解析产出的完整 JSON 快照，供人工回放
    pub raw_snapshot: Option<String>,
}

/// # Summary
/// 审计日志行：每次抓取运行恰好一条，只追加，从不修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeLog {
    pub id: i64,
    pub scrape_timestamp: DateTime<Utc>,
    pub status: ScrapeStatus,
    pub source_url: String,
    pub records_parsed: i64,
    pub error_message: Option<String>,
    pub execution_time_ms: i64,
    pub raw_snapshot: Option<String>,
}

/// # Summary
/// 一次流水线运行对调用方的汇总结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    // 最终状态（与审计日志一致）
    pub status: ScrapeStatus,
    // 本次数据归属的交易日（未走到核对阶段时为 None）
    pub trade_date: Option<NaiveDate>,
    // 成功解析的记录数
    pub records_parsed: usize,
    // 页面上见到的候选行总数
    pub rows_seen: usize,
    // 被跳过的行数
    pub rows_skipped: usize,
    // 新建的证券数
    pub securities_created: usize,
    // 写入的行情行数
    pub prices_upserted: usize,
    // 运行耗时（毫秒）
    pub execution_time_ms: i64,
    // 失败原因
    pub error: Option<String>,
}
