//! # 系统路由控制器
//!
//! 根路径服务标识与健康检查，均无需鉴权。

use axum::Json;
use axum::extract::State;
use chrono::Utc;

use crate::server::AppState;
use crate::types::{HealthResponse, ServiceInfoResponse};
use musika_core::store::port::SecurityFilter;

/// 服务标识
#[utoipa::path(
    get,
    path = "/",
    tag = "系统 (System)",
    responses(
        (status = 200, description = "服务在线", body = ServiceInfoResponse)
    )
)]
pub async fn root() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        status: "online".to_string(),
        api: "ZSE Market Data API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/swagger-ui".to_string(),
    })
}

/// 健康检查
///
/// 附带一次轻量数据库探测，数据库不可达时 database 字段为 disconnected。
#[utoipa::path(
    get,
    path = "/health",
    tag = "系统 (System)",
    responses(
        (status = 200, description = "健康状态", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = SecurityFilter {
        active_only: true,
        ..SecurityFilter::default()
    };
    let database = match state.market_store.list_securities(&probe).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!("Health check database probe failed: {}", e);
            "disconnected"
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        database: database.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
