//! # `musika-api` - HTTP API 网关
//!
//! 本 crate 是 ZSE 市场数据服务的 HTTP/REST 服务入口。
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 接收来自外部客户端或浏览器的 HTTP 请求
//! - 对 `/api/v1` 下的路由执行 API 密钥鉴权与配额消费
//! - 调用下层 `MarketReadStore` / `KeyStore` 完成查询
//! - 将领域模型转换为 DTO 返回给调用方

pub mod types;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
