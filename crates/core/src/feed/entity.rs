use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 抓取到的原始页面，未经任何解析。
///
/// # Invariants
/// - `body` 保持抓取时的原样，解析失败时整体存入审计日志以供回放。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    // 实际请求的页面地址
    pub url: String,
    // 页面原始内容
    pub body: String,
    // 抓取完成时间
    pub fetched_at: DateTime<Utc>,
}

/// # Summary
/// 行情行所在的页面板块。板块决定新证券的默认类别归属。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingSection {
    // 涨幅榜
    TopGainers,
    // 跌幅榜
    TopLosers,
    // ETF 板块
    Etfs,
    // REIT 板块
    Reits,
}

/// # Summary
/// 页面上解析出的单行证券行情。
///
/// # Invariants
/// - `symbol` 为页面原文，尚未规范化；核对阶段统一处理。
/// - 数值字段已从本地化文本（千分位、百分号、括号负数）还原为精确十进制。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedListing {
    // 证券代码原文
    pub symbol: String,
    // 显示名称（页面可能缺省）
    pub name: Option<String>,
    // 最新价
    pub price: Decimal,
    // 涨跌幅（百分数，-2.3 表示下跌 2.3%）
    pub change_pct: Decimal,
    // 市值（部分板块缺省）
    pub market_cap: Option<Decimal>,
    // 来源板块
    pub section: ListingSection,
}

/// # Summary
/// 页面的市场活动区块：全市场当日汇总数字。
///
/// # Invariants
/// - 所有字段均可缺省；缺什么存什么，不做推算。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketActivity {
    // 区块中的交易日原文（例如 "05 DEC 2025"）
    pub trade_date_text: Option<String>,
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
}

/// # Summary
/// 一次页面解析的完整产出：全部行情行、市场活动汇总与行计数。
///
/// # Invariants
/// - `rows_seen` >= `listings.len()`；差值即 `rows_skipped`。
/// - 单行解析失败只计入 `rows_skipped`，绝不中断整页解析。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeResult {
    // 成功解析的行情行
    pub listings: Vec<ParsedListing>,
    // 市场活动汇总（区块缺失时为 None）
    pub activity: Option<MarketActivity>,
    // 页面上见到的候选行总数
    pub rows_seen: usize,
    // 因缺列或数值不可解析而跳过的行数
    pub rows_skipped: usize,
}

impl ScrapeResult {
    /// 成功解析的记录数。
    pub fn records_parsed(&self) -> usize {
        self.listings.len()
    }

    /// 整页没有任何可用数据时为真。
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty() && self.activity.is_none()
    }
}
