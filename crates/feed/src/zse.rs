//! `MarketFeed` 端口的 ZSE 官网实现。

use crate::fetch::ZseFetcher;
use crate::parse;
use async_trait::async_trait;
use musika_core::config::FeedConfig;
use musika_core::feed::entity::{RawPage, ScrapeResult};
use musika_core::feed::error::{FetchError, ParseError};
use musika_core::feed::port::MarketFeed;
use tracing::info;

/// # Summary
/// 组合重试抓取器与容错解析器的行情源适配器。
///
/// # Invariants
/// - `fetch` 只做网络 I/O，`parse` 是纯函数，两步可独立测试。
pub struct ZseFeed {
    fetcher: ZseFetcher,
}

impl ZseFeed {
    /// 按行情源配置构建适配器；HTTP 客户端构建失败时报错。
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: ZseFetcher::new(config)?,
        })
    }
}

#[async_trait]
impl MarketFeed for ZseFeed {
    async fn fetch(&self) -> Result<RawPage, FetchError> {
        self.fetcher.fetch_homepage().await
    }

    fn parse(&self, page: &RawPage) -> Result<ScrapeResult, ParseError> {
        let result = parse::parse_homepage(&page.body)?;
        info!(
            url = %page.url,
            fetched_at = %page.fetched_at,
            records = result.records_parsed(),
            rows_seen = result.rows_seen,
            rows_skipped = result.rows_skipped,
            "Parsed ZSE homepage"
        );
        Ok(result)
    }
}
