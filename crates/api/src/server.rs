//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 的 DI 容器持有并调用。

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{ApiKey as OpenApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use musika_core::store::port::{KeyStore, MarketReadStore};

use crate::routes::{account, market, securities, system};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - 两个存储接口在服务启动前由 DI 容器注入，生命周期与进程等同。
#[derive(Clone)]
pub struct AppState {
    /// 行情读取接口
    pub market_store: Arc<dyn MarketReadStore>,
    /// 密钥存储接口 (鉴权与配额消费)
    pub key_store: Arc<dyn KeyStore>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ZSE 市场数据 API",
        version = "0.1.0",
        description = "津巴布韦证券交易所 (ZSE) 每日行情数据的 RESTful API 网关。提供证券列表、历史行情、市场汇总与涨跌榜查询。",
        contact(name = "Musika Team"),
        license(name = "MIT")
    ),
    tags(
        (name = "系统 (System)", description = "服务标识与健康检查"),
        (name = "证券 (Securities)", description = "挂牌证券列表与详情"),
        (name = "价格 (Prices)", description = "历史与最新日线行情"),
        (name = "市场 (Market)", description = "全市场汇总与涨跌榜"),
        (name = "账户 (Account)", description = "调用方密钥用量查询")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// 为 OpenAPI 文档注入全局 X-API-Key 鉴权方案。
///
/// 注册后，Swagger UI 页面顶部将显示 🔒 Authorize 按钮，
/// 用户可以填入 API 密钥后对所有标记了 `security` 的接口进行鉴权测试。
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // 若 components 不存在则创建
        let components = openapi.components.get_or_insert_with(Default::default);

        // 注册名为 "api_key" 的请求头鉴权方案
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(OpenApiKey::Header(ApiKeyValue::with_description(
                "X-API-Key",
                "在此处填入签发的完整 API 密钥（zse_ 前缀）",
            ))),
        );
    }
}

// ============================================================
//  服务构建与启动
// ============================================================

/// 构建完整的 axum 应用路由树并启动 HTTP 监听。
///
/// # Arguments
/// * `state` - 由外部 DI 容器注入的共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:8000"`
pub async fn start_server(
    state: AppState,
    bind_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // 1. 无需鉴权的公开路由
    let public_router = OpenApiRouter::new()
        .routes(routes!(system::root))
        .routes(routes!(system::health_check));

    // 2. 需要 API 密钥鉴权的路由
    let protected_router = OpenApiRouter::new()
        .routes(routes!(securities::list_securities))
        .routes(routes!(securities::get_security))
        .routes(routes!(securities::get_security_prices))
        .routes(routes!(securities::get_latest_price))
        .routes(routes!(market::get_market_summary))
        .routes(routes!(market::get_top_movers))
        .routes(routes!(account::get_api_usage))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::keyguard::require_api_key,
        ));

    // 3. 合并所有路由与自动收集的 OpenAPI Doc
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(public_router)
        .merge(protected_router)
        .with_state(state)
        .split_for_parts();

    // 4. 配置 CORS (允许所有来源的只读访问)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 5. 合并 Swagger UI 路由并应用中间件
    let app: Router = router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors);

    // 6. 绑定端口并启动
    tracing::info!("🚀 ZSE Market Data API listening on {}", bind_addr);
    tracing::info!("📖 Swagger UI: http://{}/swagger-ui/", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// 等待 ctrl-c，收到后让 axum 优雅收尾。
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, stopping API server"),
        Err(e) => {
            // 信号监听失败时不强行退出，保持服务运行
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
