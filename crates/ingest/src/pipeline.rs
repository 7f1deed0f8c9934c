//! 抓取流水线：系统采集侧的应用服务层门面 (Facade)。
//! 编译期仅依赖 `musika-core` 中的 Trait 定义，所有具体实现通过构造函数注入。

use crate::reconcile::reconcile;
use musika_core::config::IngestConfig;
use musika_core::feed::entity::ScrapeResult;
use musika_core::feed::port::MarketFeed;
use musika_core::ingest::entity::{ScrapeLogEntry, ScrapeOutcome, ScrapeStatus};
use musika_core::store::port::{IngestStore, ScrapeLogStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// # Summary
/// 单次抓取运行的编排器：抓取、解析、核对、提交、审计五步串联。
///
/// # Invariants
/// - `run` 从不返回错误：任何阶段失败都折叠为 `Failed` 结果。
/// - 每次运行恰好写一条审计日志，无论成败。
/// - 提交前的任何失败都不触碰数据表。
/// - 解析成功后的失败在审计记录中保留解析产出快照，供事后重放。
pub struct ScrapePipeline {
    // 行情数据源接口
    feed: Arc<dyn MarketFeed>,
    // 采集写入接口
    store: Arc<dyn IngestStore>,
    // 审计日志接口
    audit: Arc<dyn ScrapeLogStore>,
    // 采集配置
    config: IngestConfig,
    // 审计记录中标注的源地址
    source_url: String,
}

impl ScrapePipeline {
    /// # Summary
    /// 创建 ScrapePipeline 实例。
    ///
    /// # Arguments
    /// * `feed` - 行情数据源的具体实现。
    /// * `store` - 采集写入接口的具体实现。
    /// * `audit` - 审计日志接口的具体实现。
    /// * `config` - 采集配置。
    /// * `source_url` - 审计记录中标注的源地址。
    ///
    /// # Returns
    /// * `Arc<Self>` - 可共享的流水线实例。
    pub fn new(
        feed: Arc<dyn MarketFeed>,
        store: Arc<dyn IngestStore>,
        audit: Arc<dyn ScrapeLogStore>,
        config: IngestConfig,
        source_url: String,
    ) -> Arc<Self> {
        Arc::new(Self {
            feed,
            store,
            audit,
            config,
            source_url,
        })
    }

    /// # Summary
    /// 执行一次完整的抓取运行。
    ///
    /// # Logic
    /// 1. 抓取首页原文，失败则折叠为 Failed 结果。
    /// 2. 解析为结构化抓取产出。
    /// 3. 加载证券索引并核对为批次。
    /// 4. 单事务提交批次。
    /// 5. 写审计日志：有跳过行记 Partial，否则 Success。
    ///
    /// # Returns
    /// 运行汇总结果，从不为 Err。
    pub async fn run(&self) -> ScrapeOutcome {
        let started = Instant::now();
        info!(url = %self.source_url, "Starting scrape run");

        let page = match self.feed.fetch().await {
            Ok(page) => page,
            Err(e) => {
                return self
                    .fail(started, format!("Fetch failed: {}", e), None)
                    .await;
            }
        };

        let parsed = match self.feed.parse(&page) {
            Ok(parsed) => parsed,
            Err(e) => {
                return self
                    .fail(started, format!("Parse failed: {}", e), None)
                    .await;
            }
        };

        let index = match self.store.security_index().await {
            Ok(index) => index,
            Err(e) => {
                return self
                    .fail(
                        started,
                        format!("Loading security index failed: {}", e),
                        Some(&parsed),
                    )
                    .await;
            }
        };

        let batch = reconcile(&parsed, &index, &self.config);

        let stats = match self.store.commit_batch(&batch).await {
            Ok(stats) => stats,
            Err(e) => {
                return self
                    .fail(started, format!("Commit failed: {}", e), Some(&parsed))
                    .await;
            }
        };

        let status = if parsed.rows_skipped > 0 {
            ScrapeStatus::Partial
        } else {
            ScrapeStatus::Success
        };
        let records_parsed = parsed.records_parsed();
        let execution_time_ms = elapsed_ms(started);

        self.record_log(ScrapeLogEntry {
            status,
            source_url: self.source_url.clone(),
            records_parsed: i64::try_from(records_parsed).unwrap_or(i64::MAX),
            error_message: None,
            execution_time_ms,
            raw_snapshot: serde_json::to_string(&parsed).ok(),
        })
        .await;

        info!(
            status = %status,
            trade_date = %batch.trade_date,
            records = records_parsed,
            securities_created = stats.securities_created,
            prices_upserted = stats.prices_upserted,
            elapsed_ms = execution_time_ms,
            "Scrape run finished"
        );

        ScrapeOutcome {
            status,
            trade_date: Some(batch.trade_date),
            records_parsed,
            rows_seen: parsed.rows_seen,
            rows_skipped: parsed.rows_skipped,
            securities_created: stats.securities_created,
            prices_upserted: stats.prices_upserted,
            execution_time_ms,
            error: None,
        }
    }

    /// 失败折叠：记错误日志、落一条 Failed 审计记录、返回失败结果。
    /// 解析成功后的失败把解析产出序列化进审计记录，数据不会无声丢失。
    async fn fail(
        &self,
        started: Instant,
        reason: String,
        parsed: Option<&ScrapeResult>,
    ) -> ScrapeOutcome {
        let execution_time_ms = elapsed_ms(started);
        error!(error = %reason, elapsed_ms = execution_time_ms, "Scrape run failed");

        let records_parsed = parsed.map_or(0, ScrapeResult::records_parsed);
        self.record_log(ScrapeLogEntry {
            status: ScrapeStatus::Failed,
            source_url: self.source_url.clone(),
            records_parsed: i64::try_from(records_parsed).unwrap_or(i64::MAX),
            error_message: Some(reason.clone()),
            execution_time_ms,
            raw_snapshot: parsed.and_then(|p| serde_json::to_string(p).ok()),
        })
        .await;

        ScrapeOutcome {
            status: ScrapeStatus::Failed,
            trade_date: None,
            records_parsed,
            rows_seen: parsed.map_or(0, |p| p.rows_seen),
            rows_skipped: parsed.map_or(0, |p| p.rows_skipped),
            securities_created: 0,
            prices_upserted: 0,
            execution_time_ms,
            error: Some(reason),
        }
    }

    /// 审计写入失败只记错误，不改变运行结果。
    async fn record_log(&self, entry: ScrapeLogEntry) {
        if let Err(e) = self.audit.record(&entry).await {
            error!(error = %e, "Failed to record scrape log");
        }
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
