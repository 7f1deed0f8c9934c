use crate::common::{Currency, Tier};
use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub ingest: IngestConfig,
    pub scheduler: SchedulerConfig,
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

/// 抓取器配置：目标地址、超时与重试策略。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    // 交易所首页地址
    pub source_url: String,
    // 单次请求超时（秒）
    pub timeout_secs: u64,
    // 瞬时故障的最大重试次数
    pub max_retries: u32,
    // 首次重试前的退避时长（毫秒），之后逐次翻倍
    pub retry_backoff_ms: u64,
    // 请求使用的 User-Agent 头
    pub user_agent: String,
}

/// 采集核对配置：新证券的默认属性与类别启发式。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    // 写入行情行时标记的数据来源
    pub data_source: String,
    // 新证券的默认计价货币
    pub default_currency: Currency,
    // 代码以这些后缀结尾时归类为 ETF
    pub etf_suffixes: Vec<String>,
    // 代码以这些后缀结尾时归类为 REIT
    pub reit_suffixes: Vec<String>,
}

/// 定时采集配置：收盘后触发一次抓取。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    // 本地时间的触发小时
    pub hour: u32,
    // 本地时间的触发分钟
    pub minute: u32,
    // 仅在周一至周五触发
    pub weekdays_only: bool,
}

/// 单个服务等级的配额上限。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierLimits {
    pub daily: i64,
    pub monthly: i64,
}

/// 各服务等级的配额表。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub free: TierLimits,
    pub pro: TierLimits,
    pub enterprise: TierLimits,
}

impl QuotaConfig {
    /// 返回指定等级适用的配额上限。
    pub fn limits_for(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Free => self.free,
            Tier::Pro => self.pro,
            Tier::Enterprise => self.enterprise,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                data_dir: "data".to_string(),
            },
            feed: FeedConfig {
                source_url: "https://www.zse.co.zw".to_string(),
                timeout_secs: 10,
                max_retries: 3,
                retry_backoff_ms: 500,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3"
                    .to_string(),
            },
            ingest: IngestConfig {
                data_source: "homepage_scrape".to_string(),
                default_currency: Currency::Zwg,
                etf_suffixes: vec!["ETF".to_string()],
                reit_suffixes: vec!["REIT".to_string()],
            },
            scheduler: SchedulerConfig {
                hour: 15,
                minute: 30,
                weekdays_only: true,
            },
            quota: QuotaConfig {
                free: TierLimits {
                    daily: 100,
                    monthly: 5_000,
                },
                pro: TierLimits {
                    daily: 1_000,
                    monthly: 50_000,
                },
                enterprise: TierLimits {
                    daily: 10_000,
                    monthly: 1_000_000,
                },
            },
        }
    }
}
