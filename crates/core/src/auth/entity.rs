use crate::common::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 明文密钥的固定前缀，便于从请求头快速识别本服务签发的密钥。
pub const KEY_SCHEME: &str = "zse_";

/// 存入 `key_prefix` 列的明文前缀长度。
/// 前缀是密钥的公开标识：可安全展示，也用于验证时的候选行检索。
pub const KEY_PREFIX_LEN: usize = 8;

/// # Summary
/// API 密钥实体。明文密钥只在签发瞬间存在，库中仅保留其单向哈希。
///
/// # Invariants
/// - `key_hash` 为明文密钥的 SHA-256 十六进制摘要，全表唯一。
/// - `requests_today` / `requests_month` 只通过条件更新递增，由外部滚动任务清零。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    // 数据库主键
    pub id: i64,
    // 明文密钥的 SHA-256 摘要（十六进制）
    pub key_hash: String,
    // 明文前 8 位，公开标识
    pub key_prefix: String,
    // 持有者邮箱
    pub user_email: String,
    // 服务等级
    pub tier: Tier,
    // 今日已用请求数
    pub requests_today: i64,
    // 本月已用请求数
    pub requests_month: i64,
    // 日配额上限
    pub daily_limit: i64,
    // 月配额上限
    pub monthly_limit: i64,
    // 是否有效（吊销即置 false）
    pub is_active: bool,
    // 签发时间
    pub created_at: DateTime<Utc>,
    // 最近一次通过鉴权的时间
    pub last_used_at: Option<DateTime<Utc>>,
}

/// # Summary
/// 刚签发的密钥：明文只随本结构返回一次，之后无法再取回。
#[derive(Debug, Clone)]
pub struct IssuedKey {
    // 明文密钥，展示一次后即丢弃
    pub secret: String,
    // 已入库的密钥记录
    pub record: ApiKey,
}

/// # Summary
/// 单次配额消费的裁决结果。
/// 检查与递增合并为一次条件更新，并发请求不会越过上限。
#[derive(Debug, Clone)]
pub enum QuotaDecision {
    // 已放行并完成计数，携带更新后的密钥行
    Granted(ApiKey),
    // 日配额已满，计数未变
    DailyExhausted,
    // 月配额已满，计数未变
    MonthlyExhausted,
    // 密钥在裁决时已被吊销或删除
    Revoked,
}
