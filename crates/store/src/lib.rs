//! # `musika-store` - SQLite 持久化层
//!
//! 本 crate 实现 `musika-core` 定义的四个存储端口，全部数据落在
//! 数据根目录下的单个 SQLite 数据库文件中。
//!
//! ## 架构职责
//! - `market`: 行情数据的事务性写入与对外查询（`IngestStore` / `MarketReadStore`）
//! - `scrape_log`: 只追加的抓取审计日志（`ScrapeLogStore`）
//! - `keys`: API 密钥签发、配额消费与运维操作（`KeyStore`）
//! - `config`: 数据根目录的进程级配置
//!
//! ## 存储约定
//! - 精确十进制一律以 TEXT 存储，读写两侧经由 `rust_decimal` 转换
//! - 枚举以小写字符串存储，与序列化形式一致
//! - 模式初始化是幂等的，由各存储实例在构建时执行

pub mod config;
mod db;
pub mod keys;
pub mod market;
pub mod scrape_log;
