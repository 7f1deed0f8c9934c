use thiserror::Error;

/// # Summary
/// 鉴权与限流错误枚举，逐请求生效，绝不影响采集侧状态。
///
/// # Invariants
/// - 缺失与无效密钥统一以 401 对外呈现，配额耗尽以 429 呈现。
/// - 错误信息不泄露密钥哈希等内部细节。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    // 请求未携带 X-API-Key 头
    #[error("API key required")]
    MissingKey,
    // 密钥未知、格式不符或已吊销
    #[error("Invalid API key")]
    InvalidKey,
    // 日配额已耗尽
    #[error("Daily rate limit exceeded")]
    DailyLimitExceeded,
    // 月配额已耗尽
    #[error("Monthly rate limit exceeded")]
    MonthlyLimitExceeded,
}

impl AuthError {
    /// 机器可读的原因代码，随错误响应返回。
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingKey => "missing_key",
            AuthError::InvalidKey => "invalid_key",
            AuthError::DailyLimitExceeded | AuthError::MonthlyLimitExceeded => "rate_limited",
        }
    }
}
