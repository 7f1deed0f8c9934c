use thiserror::Error;

/// # Summary
/// 页面抓取错误枚举，区分可重试与不可重试两类失败。
///
/// # Invariants
/// - `Transient` 仅在重试次数耗尽后对外抛出。
#[derive(Error, Debug)]
pub enum FetchError {
    // 瞬时网络故障（连接重置、超时、5xx、429），重试耗尽后抛出
    #[error("Transient fetch failure after {attempts} attempts: {reason}")]
    Transient { attempts: u32, reason: String },
    // 确定性失败（其余 4xx、响应畸形），不重试直接抛出
    #[error("Permanent fetch failure: {0}")]
    Permanent(String),
}

/// # Summary
/// 页面解析错误枚举。
/// 单行失败只计数跳过，不构成错误；仅整页无可用数据时报错。
#[derive(Error, Debug)]
pub enum ParseError {
    // 页面上没有解析出任何行情行，也没有市场活动区块
    #[error("No recognizable market data in page")]
    EmptyOrUnrecognized,
}
