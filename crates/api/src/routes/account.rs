//! # 账户路由控制器
//!
//! 调用方查询自己密钥的配额与用量。
//! 数据直接取自鉴权中间件注入的密钥行，本次请求的消费已计入其中。

use axum::Json;

use crate::middleware::keyguard::CurrentKey;
use crate::types::{ApiResponse, UsageResponse};

/// 获取当前密钥的用量统计
///
/// 返回服务等级、今日/本月已用请求数与对应配额上限。
#[utoipa::path(
    get,
    path = "/api/v1/account/usage",
    tag = "账户 (Account)",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "成功获取用量", body = ApiResponse<UsageResponse>),
        (status = 401, description = "未认证"),
        (status = 429, description = "配额耗尽")
    )
)]
pub async fn get_api_usage(CurrentKey(key): CurrentKey) -> Json<ApiResponse<UsageResponse>> {
    Json(ApiResponse::ok(UsageResponse::from(&key)))
}
