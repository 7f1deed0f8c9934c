//! # `musika-ingest` - 采集流水线
//!
//! 本 crate 把一次完整的行情采集串成流水线：
//! 抓取页面、解析行情、与证券索引核对、单事务提交、写入审计日志。
//!
//! ## 架构职责
//! - `reconcile`: 解析结果与存量证券的核对（纯函数，无 I/O）
//! - `pipeline`: 流水线编排，编译期仅依赖 `musika-core` 的端口定义
//!
//! ## 运行约定
//! - 流水线从不向调用方抛错：任何失败都折叠为 `Failed` 结果并留审计记录
//! - 每次运行恰好产生一条审计日志，无论成败

pub mod pipeline;
pub mod reconcile;
