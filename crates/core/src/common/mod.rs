pub mod time;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// # Summary
/// 证券类别枚举，标记挂牌标的的产品形态。
///
/// # Invariants
/// - 持久化与序列化形式均为小写字符串（equity / etf / reit / index）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SecurityType {
    // 普通股票
    Equity,
    // 交易所交易基金
    Etf,
    // 房地产投资信托
    Reit,
    // 指数
    Index,
}

impl FromStr for SecurityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equity" => Ok(SecurityType::Equity),
            "etf" => Ok(SecurityType::Etf),
            "reit" => Ok(SecurityType::Reit),
            "index" => Ok(SecurityType::Index),
            _ => Err(format!("Unknown SecurityType: {}", s)),
        }
    }
}

impl std::fmt::Display for SecurityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityType::Equity => write!(f, "equity"),
            SecurityType::Etf => write!(f, "etf"),
            SecurityType::Reit => write!(f, "reit"),
            SecurityType::Index => write!(f, "index"),
        }
    }
}

/// # Summary
/// 计价货币枚举。ZSE 挂牌标的以津巴布韦金元 (ZWG) 计价，
/// 少数标的以美元 (USD) 计价。
///
/// # Invariants
/// - 持久化与序列化形式均为大写 ISO 风格代码。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Zwg,
    Usd,
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ZWG" => Ok(Currency::Zwg),
            "USD" => Ok(Currency::Usd),
            _ => Err(format!("Unknown Currency: {}", s)),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Zwg => write!(f, "ZWG"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

/// # Summary
/// API 密钥服务等级枚举，决定适用的配额档位。
///
/// # Invariants
/// - 各档位的具体配额数值由配置层提供，本枚举只表达档位身份。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "enterprise" => Ok(Tier::Enterprise),
            _ => Err(format!("Unknown Tier: {}", s)),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Pro => write!(f, "pro"),
            Tier::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// # Summary
/// 规范化证券代码：去除首尾空白并统一为大写。
///
/// # Logic
/// 1. 页面上的代码可能带有多余空白或大小写混排（" delta " / "Delta"）。
/// 2. 核对与存储一律使用规范化后的形式，保证同一标的只有一个身份。
///
/// # Arguments
/// * `raw`: 页面上提取的原始代码文本。
///
/// # Returns
/// 规范化后的证券代码。
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}
