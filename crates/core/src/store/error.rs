use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理数据库连接、读写与事务失败等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 单条语句执行失败
    #[error("Database error: {0}")]
    Database(String),
    /// 事务开启或提交失败；调用方可确认未发生部分写入
    #[error("Transaction failed: {0}")]
    Transaction(String),
    /// 记录未找到
    #[error("Not found")]
    NotFound,
    /// 初始化存储失败
    #[error("Initialization error: {0}")]
    InitError(String),
}
