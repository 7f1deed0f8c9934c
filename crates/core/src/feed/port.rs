use crate::feed::entity::{RawPage, ScrapeResult};
use crate::feed::error::{FetchError, ParseError};
use async_trait::async_trait;

/// # Summary
/// 行情数据源接口：抓取交易所页面并解析为结构化结果。
/// 抓取与解析拆为两步，便于流水线区分失败阶段并分别记录审计信息。
///
/// # Invariants
/// - `fetch` 失败时不得产生任何副作用。
/// - `parse` 必须是纯函数：不做 I/O，不修改自身状态。
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// # Summary
    /// 抓取交易所首页原文。
    ///
    /// # Logic
    /// 1. 对配置的源地址发起带超时的 HTTP 请求。
    /// 2. 瞬时故障按退避策略重试，次数有界。
    /// 3. 确定性失败立即返回，不消耗重试额度。
    ///
    /// # Returns
    /// 成功返回原始页面，失败返回 `FetchError`。
    async fn fetch(&self) -> Result<RawPage, FetchError>;

    /// # Summary
    /// 将原始页面解析为结构化抓取结果。
    ///
    /// # Logic
    /// 1. 定位各行情板块与市场活动区块，无法识别的板块忽略。
    /// 2. 逐行提取字段并做本地化数值还原；坏行计入跳过数。
    /// 3. 整页无任何可用数据时返回 `ParseError`。
    ///
    /// # Arguments
    /// * `page`: 抓取到的原始页面。
    ///
    /// # Returns
    /// 成功返回 `ScrapeResult`，失败返回 `ParseError`。
    fn parse(&self, page: &RawPage) -> Result<ScrapeResult, ParseError>;
}
