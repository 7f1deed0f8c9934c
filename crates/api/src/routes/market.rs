//! # 市场汇总路由控制器
//!
//! 实现 `/api/v1/market` 路径下的全市场汇总与涨跌榜接口。

use axum::Json;
use axum::extract::{Query, State};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, MarketSummaryResponse, MoverResponse};
use musika_core::store::port::MoverDirection;

#[derive(Deserialize, ToSchema)]
pub struct SummaryQuery {
    pub trade_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct MoversQuery {
    pub direction: Option<String>,
    pub limit: Option<u32>,
}

/// 获取全市场单日汇总
///
/// 不带日期参数时返回最近一个有快照的交易日。
#[utoipa::path(
    get,
    path = "/api/v1/market/summary",
    tag = "市场 (Market)",
    security(("api_key" = [])),
    params(
        ("trade_date" = Option<String>, Query, description = "指定交易日，ISO 8601；缺省为最近交易日")
    ),
    responses(
        (status = 200, description = "成功获取市场汇总", body = ApiResponse<MarketSummaryResponse>),
        (status = 404, description = "无市场数据"),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_market_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<MarketSummaryResponse>>, ApiError> {
    let summary = state
        .market_store
        .market_summary(query.trade_date)
        .await?
        .ok_or_else(|| ApiError::NotFound("No market data found".to_string()))?;

    Ok(Json(ApiResponse::ok(MarketSummaryResponse::from(&summary))))
}

/// 获取最近交易日的涨跌榜
///
/// direction 可取 gainers / losers / both，both 时两个榜单拼接返回。
#[utoipa::path(
    get,
    path = "/api/v1/market/movers",
    tag = "市场 (Market)",
    security(("api_key" = [])),
    params(
        ("direction" = Option<String>, Query, description = "榜单方向 (gainers / losers / both)，默认 both"),
        ("limit" = Option<u32>, Query, description = "每个方向的条数上限，默认 5")
    ),
    responses(
        (status = 200, description = "成功获取涨跌榜", body = ApiResponse<Vec<MoverResponse>>),
        (status = 400, description = "无效的方向参数"),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_top_movers(
    State(state): State<AppState>,
    Query(query): Query<MoversQuery>,
) -> Result<Json<ApiResponse<Vec<MoverResponse>>>, ApiError> {
    let direction = query.direction.as_deref().unwrap_or("both");
    if !matches!(direction, "gainers" | "losers" | "both") {
        return Err(ApiError::BadRequest(format!(
            "Unknown direction: {} (expected gainers, losers or both)",
            direction
        )));
    }
    let limit = query.limit.unwrap_or(5);

    let mut movers = Vec::new();
    if matches!(direction, "gainers" | "both") {
        let rows = state
            .market_store
            .top_movers(MoverDirection::Gainers, limit)
            .await?;
        movers.extend(rows.iter().map(|r| MoverResponse::from_row(r, "gainer")));
    }
    if matches!(direction, "losers" | "both") {
        let rows = state
            .market_store
            .top_movers(MoverDirection::Losers, limit)
            .await?;
        movers.extend(rows.iter().map(|r| MoverResponse::from_row(r, "loser")));
    }

    Ok(Json(ApiResponse::ok(movers)))
}
