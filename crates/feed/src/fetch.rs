use chrono::Utc;
use musika_core::config::FeedConfig;
use musika_core::feed::entity::RawPage;
use musika_core::feed::error::FetchError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// 单次请求的失败分类，决定是否消耗重试额度。
enum AttemptError {
    // 连接失败、超时、5xx、429：退避后重试
    Transient(String),
    // 其余 4xx 或响应体不可读：立即放弃
    Permanent(String),
}

/// # Summary
/// ZSE 首页抓取器：带超时、有界重试与指数退避的 HTTP 客户端封装。
///
/// # Invariants
/// - 失败时不产生任何副作用，是否记录审计由调用方决定。
/// - `Transient` 错误只在全部尝试耗尽后对外抛出。
#[derive(Clone)]
pub struct ZseFetcher {
    /// 内部使用的 HTTP 客户端
    client: Client,
    // 首页地址
    source_url: String,
    // 总尝试次数上限
    max_retries: u32,
    // 首次重试前的退避时长，之后逐次翻倍
    initial_backoff: Duration,
}

impl ZseFetcher {
    /// # Summary
    /// 按配置构建抓取器。
    ///
    /// # Logic
    /// 1. 设置请求超时与伪装浏览器的 User-Agent 头。
    /// 2. 初始化 reqwest 客户端；TLS 后端不可用时直接报错。
    ///
    /// # Arguments
    /// * `cfg`: 抓取器配置。
    ///
    /// # Returns
    /// 成功返回抓取器实例，客户端构建失败返回 `FetchError::Permanent`。
    pub fn new(cfg: &FeedConfig) -> Result<Self, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let user_agent = reqwest::header::HeaderValue::from_str(&cfg.user_agent)
            .map_err(|e| FetchError::Permanent(format!("Invalid user agent: {}", e)))?;
        headers.insert(reqwest::header::USER_AGENT, user_agent);

        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Permanent(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            source_url: cfg.source_url.clone(),
            max_retries: cfg.max_retries.max(1),
            initial_backoff: Duration::from_millis(cfg.retry_backoff_ms),
        })
    }

    /// # Summary
    /// 抓取首页原文，瞬时故障自动重试。
    ///
    /// # Logic
    /// 1. 发起请求并按失败类型分类。
    /// 2. 瞬时故障按指数退避等待后重试，总次数有界。
    /// 3. 确定性失败立即返回，不消耗剩余尝试。
    ///
    /// # Returns
    /// 成功返回原始页面，失败返回 `FetchError`。
    pub async fn fetch_homepage(&self) -> Result<RawPage, FetchError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.attempt().await {
                Ok(page) => {
                    debug!(url = %self.source_url, attempt, "Homepage fetched");
                    return Ok(page);
                }
                Err(AttemptError::Permanent(reason)) => {
                    warn!(url = %self.source_url, %reason, "Permanent fetch failure");
                    return Err(FetchError::Permanent(reason));
                }
                Err(AttemptError::Transient(reason)) => {
                    if attempt >= self.max_retries {
                        warn!(
                            url = %self.source_url,
                            attempts = attempt,
                            %reason,
                            "Fetch retries exhausted"
                        );
                        return Err(FetchError::Transient {
                            attempts: attempt,
                            reason,
                        });
                    }
                    debug!(attempt, backoff = ?backoff, %reason, "Retrying fetch");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }

    /// 单次请求：返回页面或失败分类。
    async fn attempt(&self) -> Result<RawPage, AttemptError> {
        let response = self
            .client
            .get(&self.source_url)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(AttemptError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(AttemptError::Permanent(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Permanent(format!("Unreadable response body: {}", e)))?;

        Ok(RawPage {
            url: self.source_url.clone(),
            body,
            fetched_at: Utc::now(),
        })
    }
}
