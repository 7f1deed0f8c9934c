//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为面向客户端 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。
//! 精确十进制数值一律以字符串形式输出，避免浮点精度损失。

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use musika_core::auth::entity::ApiKey;
use musika_core::market::entity::{DailyPrice, MarketSnapshot, Security};
use musika_core::store::port::MoverRow;

// ============================================================
//  证券相关 DTO
// ============================================================

/// 挂牌证券 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SecurityResponse {
    /// 证券代码
    #[schema(example = "DELTA")]
    pub symbol: String,
    /// 证券名称
    #[schema(example = "Delta Corporation Limited")]
    pub name: Option<String>,
    /// 类别 (equity / etf / reit)
    #[schema(example = "equity")]
    pub security_type: String,
    /// 行业板块
    #[schema(example = "Consumer Staples")]
    pub sector: Option<String>,
    /// 计价货币
    #[schema(example = "ZWG")]
    pub currency: String,
    /// 是否仍在挂牌
    #[schema(example = true)]
    pub is_active: bool,
}

/// 日线行情 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceResponse {
    /// 证券代码
    #[schema(example = "DELTA")]
    pub symbol: String,
    /// 交易日 (ISO 8601)
    #[schema(example = "2025-12-05")]
    pub trade_date: String,
    /// 收盘/最新价
    #[schema(example = "150.25")]
    pub price: String,
    /// 涨跌幅 (百分数)
    #[schema(example = "1.20")]
    pub change_pct: String,
    /// 市值
    #[schema(example = "1250000000.00")]
    pub market_cap: Option<String>,
    /// 成交量
    #[schema(example = 150000_i64)]
    pub volume: Option<i64>,
    /// 数据来源标记
    #[schema(example = "homepage_scrape")]
    pub data_source: String,
}

// ============================================================
//  市场相关 DTO
// ============================================================

/// 全市场单日汇总 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarketSummaryResponse {
    /// 交易日 (ISO 8601)
    #[schema(example = "2025-12-05")]
    pub trade_date: String,
    /// 当日成交笔数
    #[schema(example = 342_i64)]
    pub total_trades: Option<i64>,
    /// 当日成交额
    #[schema(example = "1234567.89")]
    pub total_turnover: Option<String>,
    /// 全市场市值
    #[schema(example = "98765432100.00")]
    pub market_cap: Option<String>,
    /// 外资买入额
    #[schema(example = "50000.00")]
    pub foreign_purchases: Option<String>,
    /// 外资卖出额
    #[schema(example = "32000.00")]
    pub foreign_sales: Option<String>,
    /// 上涨家数
    #[schema(example = 12_i64)]
    pub advances: i64,
    /// 下跌家数
    #[schema(example = 8_i64)]
    pub declines: i64,
    /// 持平家数
    #[schema(example = 3_i64)]
    pub unchanged: i64,
}

/// 涨跌榜单行 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MoverResponse {
    /// 证券代码
    #[schema(example = "DELTA")]
    pub symbol: String,
    /// 最新价
    #[schema(example = "150.25")]
    pub price: String,
    /// 涨跌幅 (百分数)
    #[schema(example = "4.80")]
    pub change_pct: String,
    /// 方向 ("gainer" 或 "loser")
    #[schema(example = "gainer")]
    pub movement_type: String,
}

// ============================================================
//  账户相关 DTO
// ============================================================

/// 调用方密钥用量 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    /// 服务等级
    #[schema(example = "free")]
    pub tier: String,
    /// 今日已用请求数
    #[schema(example = 42_i64)]
    pub requests_today: i64,
    /// 日配额上限
    #[schema(example = 100_i64)]
    pub daily_limit: i64,
    /// 本月已用请求数
    #[schema(example = 731_i64)]
    pub requests_month: i64,
    /// 月配额上限
    #[schema(example = 5000_i64)]
    pub monthly_limit: i64,
}

// ============================================================
//  系统 DTO
// ============================================================

/// 服务标识 DTO，根路径返回
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfoResponse {
    /// 服务状态
    #[schema(example = "online")]
    pub status: String,
    /// 服务名称
    #[schema(example = "ZSE Market Data API")]
    pub api: String,
    /// 服务版本
    #[schema(example = "0.1.0")]
    pub version: String,
    /// 文档路径
    #[schema(example = "/swagger-ui")]
    pub docs: String,
}

/// 健康检查 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    #[schema(example = "healthy")]
    pub status: String,
    /// 数据库连通性 ("connected" 或 "disconnected")
    #[schema(example = "connected")]
    pub database: String,
    /// 检查时间 (ISO 8601)
    #[schema(example = "2025-12-05T15:40:00Z")]
    pub timestamp: String,
}

// ============================================================
//  通用响应 DTO
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// 构建失败响应 (不含泛型载荷)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 机器可读错误代码
    pub code: String,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误代码与描述构建
    pub fn from_parts(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            error: msg.into(),
        }
    }
}

// ============================================================
//  领域模型 → DTO 惯用转换 (impl From<T>)
// ============================================================

impl From<&Security> for SecurityResponse {
    fn from(s: &Security) -> Self {
        Self {
            symbol: s.symbol.clone(),
            name: s.name.clone(),
            security_type: s.security_type.to_string(),
            sector: s.sector.clone(),
            currency: s.currency.to_string(),
            is_active: s.is_active,
        }
    }
}

impl PriceResponse {
    /// 行情行归属的代码由调用方解析路径后补入。
    pub fn from_price(symbol: &str, p: &DailyPrice) -> Self {
        Self {
            symbol: symbol.to_string(),
            trade_date: p.trade_date.to_string(),
            price: p.price.to_string(),
            change_pct: p.change_pct.to_string(),
            market_cap: p.market_cap.map(|c| c.to_string()),
            volume: p.volume,
            data_source: p.data_source.clone(),
        }
    }
}

impl From<&MarketSnapshot> for MarketSummaryResponse {
    fn from(s: &MarketSnapshot) -> Self {
        Self {
            trade_date: s.trade_date.to_string(),
            total_trades: s.total_trades,
            total_turnover: s.total_turnover.map(|v| v.to_string()),
            market_cap: s.market_cap.map(|v| v.to_string()),
            foreign_purchases: s.foreign_purchases.map(|v| v.to_string()),
            foreign_sales: s.foreign_sales.map(|v| v.to_string()),
            advances: s.advances,
            declines: s.declines,
            unchanged: s.unchanged,
        }
    }
}

impl MoverResponse {
    /// 榜单方向在查询时已知，由调用方标注。
    pub fn from_row(row: &MoverRow, movement_type: &str) -> Self {
        Self {
            symbol: row.symbol.clone(),
            price: row.price.to_string(),
            change_pct: row.change_pct.to_string(),
            movement_type: movement_type.to_string(),
        }
    }
}

impl From<&ApiKey> for UsageResponse {
    fn from(k: &ApiKey) -> Self {
        Self {
            tier: k.tier.to_string(),
            requests_today: k.requests_today,
            daily_limit: k.daily_limit,
            requests_month: k.requests_month,
            monthly_limit: k.monthly_limit,
        }
    }
}
