//! # 证券与行情路由控制器
//!
//! 实现 `/api/v1/securities` 路径下的 REST 接口。
//! 路径中的证券代码在查询前统一做规范化，未知代码一律返回 404。

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiResponse, PriceResponse, SecurityResponse};
use musika_core::common::{SecurityType, normalize_symbol};
use musika_core::market::entity::Security;
use musika_core::store::port::{PriceHistoryQuery, SecurityFilter};

#[derive(Deserialize, ToSchema)]
pub struct ListSecuritiesQuery {
    pub security_type: Option<String>,
    pub sector: Option<String>,
    pub active_only: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct PriceRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
}

/// 解析路径中的证券代码；未知代码统一返回 404。
async fn resolve_security(state: &AppState, raw_symbol: &str) -> Result<Security, ApiError> {
    let symbol = normalize_symbol(raw_symbol);
    state
        .market_store
        .get_security(&symbol)
        .await?
        .ok_or(ApiError::UnknownSymbol(symbol))
}

/// 获取挂牌证券列表
///
/// 默认只返回仍在挂牌的证券，可按类别与行业板块过滤。
#[utoipa::path(
    get,
    path = "/api/v1/securities",
    tag = "证券 (Securities)",
    security(("api_key" = [])),
    params(
        ("security_type" = Option<String>, Query, description = "按类别过滤 (equity / etf / reit)"),
        ("sector" = Option<String>, Query, description = "按行业板块过滤"),
        ("active_only" = Option<bool>, Query, description = "仅返回在挂牌证券，默认 true")
    ),
    responses(
        (status = 200, description = "成功获取证券列表", body = ApiResponse<Vec<SecurityResponse>>),
        (status = 400, description = "无效的类别参数"),
        (status = 401, description = "未认证"),
        (status = 429, description = "配额耗尽")
    )
)]
pub async fn list_securities(
    State(state): State<AppState>,
    Query(query): Query<ListSecuritiesQuery>,
) -> Result<Json<ApiResponse<Vec<SecurityResponse>>>, ApiError> {
    let security_type = match &query.security_type {
        Some(raw) => Some(raw.parse::<SecurityType>().map_err(ApiError::BadRequest)?),
        None => None,
    };

    let filter = SecurityFilter {
        active_only: query.active_only.unwrap_or(true),
        security_type,
        sector: query.sector.clone(),
    };

    let securities = state.market_store.list_securities(&filter).await?;
    let response: Vec<SecurityResponse> = securities.iter().map(SecurityResponse::from).collect();

    Ok(Json(ApiResponse::ok(response)))
}

/// 获取单只证券详情
#[utoipa::path(
    get,
    path = "/api/v1/securities/{symbol}",
    tag = "证券 (Securities)",
    security(("api_key" = [])),
    params(
        ("symbol" = String, Path, description = "证券代码 (大小写不敏感)")
    ),
    responses(
        (status = 200, description = "成功获取证券详情", body = ApiResponse<SecurityResponse>),
        (status = 404, description = "证券不存在"),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_security(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<SecurityResponse>>, ApiError> {
    let security = resolve_security(&state, &symbol).await?;
    Ok(Json(ApiResponse::ok(SecurityResponse::from(&security))))
}

/// 获取单只证券的历史行情
///
/// 按交易日倒序返回，可选日期区间，默认最多 30 行。
#[utoipa::path(
    get,
    path = "/api/v1/securities/{symbol}/prices",
    tag = "价格 (Prices)",
    security(("api_key" = [])),
    params(
        ("symbol" = String, Path, description = "证券代码"),
        ("start_date" = Option<String>, Query, description = "起始交易日 (含)，ISO 8601"),
        ("end_date" = Option<String>, Query, description = "截止交易日 (含)，ISO 8601"),
        ("limit" = Option<u32>, Query, description = "返回行数上限，默认 30")
    ),
    responses(
        (status = 200, description = "成功获取历史行情", body = ApiResponse<Vec<PriceResponse>>),
        (status = 404, description = "证券不存在或无行情数据"),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_security_prices(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<PriceRangeQuery>,
) -> Result<Json<ApiResponse<Vec<PriceResponse>>>, ApiError> {
    let security = resolve_security(&state, &symbol).await?;

    let history_query = PriceHistoryQuery {
        start_date: query.start_date,
        end_date: query.end_date,
        limit: query.limit.unwrap_or(30),
    };
    let prices = state
        .market_store
        .price_history(security.id, &history_query)
        .await?;
    if prices.is_empty() {
        return Err(ApiError::NotFound("No price data found".to_string()));
    }

    let response: Vec<PriceResponse> = prices
        .iter()
        .map(|p| PriceResponse::from_price(&security.symbol, p))
        .collect();

    Ok(Json(ApiResponse::ok(response)))
}

/// 获取单只证券最近一个交易日的行情
#[utoipa::path(
    get,
    path = "/api/v1/securities/{symbol}/latest",
    tag = "价格 (Prices)",
    security(("api_key" = [])),
    params(
        ("symbol" = String, Path, description = "证券代码")
    ),
    responses(
        (status = 200, description = "成功获取最新行情", body = ApiResponse<PriceResponse>),
        (status = 404, description = "证券不存在或无行情数据"),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_latest_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<PriceResponse>>, ApiError> {
    let security = resolve_security(&state, &symbol).await?;

    let price = state
        .market_store
        .latest_price(security.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No price data found".to_string()))?;

    Ok(Json(ApiResponse::ok(PriceResponse::from_price(
        &security.symbol,
        &price,
    ))))
}
