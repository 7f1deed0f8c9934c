//! # `musika-core` - 领域核心
//!
//! 本 crate 定义 Musika 行情采集系统的领域模型：实体、错误枚举与端口契约。
//! 不包含任何 I/O 实现，具体的抓取、存储与 HTTP 适配器分别位于
//! `musika-feed`、`musika-store` 与 `musika-api`。
//!
//! ## 领域划分
//! - `feed`: 数据源抓取与页面解析（原始页面、解析结果、抓取错误）
//! - `market`: 持久化行情实体（证券、日线价格、市场快照）
//! - `ingest`: 采集批次与审计日志（核对批次、抓取日志、运行结果）
//! - `auth`: API 密钥与配额（密钥实体、配额裁决、鉴权错误）
//! - `store`: 存储端口契约与存储层错误

pub mod auth;
pub mod common;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod market;
pub mod store;
