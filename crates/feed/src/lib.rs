//! # `musika-feed` - 交易所数据源适配器
//!
//! 本 crate 实现 `musika-core` 的 `MarketFeed` 端口：
//! 从津巴布韦证券交易所 (ZSE) 首页抓取当日行情并解析为结构化结果。
//!
//! ## 架构职责
//! - `fetch`: 带超时与有界重试的 HTTP 抓取器
//! - `parse`: 对首页松散表格结构的容错解析（纯函数，无 I/O）
//! - `numeric`: 本地化数值文本的精确十进制还原
//! - `zse`: 组合抓取与解析，实现 `MarketFeed` 端口

pub mod fetch;
pub mod numeric;
pub mod parse;
pub mod zse;
