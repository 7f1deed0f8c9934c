use crate::common::{Currency, SecurityType};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 挂牌证券实体，采集过程中首次见到某代码时创建。
///
/// # Invariants
/// - `symbol` 为规范化后的唯一自然键，生命周期内不变。
/// - 证券只停用（`is_active = false`），从不删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    // 数据库主键
    pub id: i64,
    // 规范化证券代码（唯一）
    pub symbol: String,
    // 显示名称
    pub name: Option<String>,
    // 证券类别
    pub security_type: SecurityType,
    // 所属行业板块
    pub sector: Option<String>,
    // 计价货币
    pub currency: Currency,
    // 是否仍在挂牌
    pub is_active: bool,
    // 首次入库时间
    pub created_at: DateTime<Utc>,
    // 最近更新时间
    pub updated_at: DateTime<Utc>,
}

/// # Summary
/// 单只证券的日线行情行。
///
/// # Invariants
/// - (security_id, trade_date) 全表唯一；同日重跑采集只更新不新增。
/// - OHLCV 字段在仅有首页数据时为空，后续数据源可补充。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPrice {
    // 数据库主键
    pub id: i64,
    // 所属证券
    pub security_id: i64,
    // 交易日
    pub trade_date: NaiveDate,
    // 收盘/最新价
    pub price: Decimal,
    // 涨跌幅（百分数）
    pub change_pct: Decimal,
    // 市值
    pub market_cap: Option<Decimal>,
    // 开盘价
    pub open_price: Option<Decimal>,
    // 最高价
    pub high_price: Option<Decimal>,
    // 最低价
    pub low_price: Option<Decimal>,
    // 收盘价
    pub close_price: Option<Decimal>,
    // 成交量
    pub volume: Option<i64>,
    // 数据来源标记
    pub data_source: String,
    // 首次写入时间（覆盖更新时保留）
    pub created_at: DateTime<Utc>,
}

/// # Summary
/// 全市场单日汇总快照。
///
/// # Invariants
/// - `trade_date` 全表唯一。
/// - 上涨/下跌/持平家数由同批次行情行的涨跌幅推导，与行情行共享同一事务。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    // 数据库主键
    pub id: i64,
    // 交易日（唯一）
    pub trade_date: NaiveDate,
    // 成交笔数
    pub total_trades: Option<i64>,
    // 成交总额
    pub total_turnover: Option<Decimal>,
    // 全市场市值
    pub market_cap: Option<Decimal>,
    // 外资买入总额
    pub foreign_purchases: Option<Decimal>,
    // 外资卖出总额
    pub foreign_sales: Option<Decimal>,
    // 上涨家数
    pub advances: i64,
    // 下跌家数
    pub declines: i64,
    // 持平家数
    pub unchanged: i64,
    // 数据来源标记
    pub data_source: String,
    // 首次写入时间
    pub created_at: DateTime<Utc>,
}
