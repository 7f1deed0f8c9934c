//! 流水线对接真实 SQLite 存储的端到端测试。
//!
//! 数据目录通过进程级 OnceLock 指定，因此全部场景跑在同一个测试函数里。

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use musika_core::config::AppConfig;
use musika_core::feed::entity::{
    ListingSection, MarketActivity, ParsedListing, RawPage, ScrapeResult,
};
use musika_core::feed::error::{FetchError, ParseError};
use musika_core::feed::port::MarketFeed;
use musika_core::ingest::entity::ScrapeStatus;
use musika_core::store::port::{MarketReadStore, ScrapeLogStore, SecurityFilter};
use musika_ingest::pipeline::ScrapePipeline;
use musika_store::market::SqliteMarketStore;
use musika_store::scrape_log::SqliteScrapeLogStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::tempdir;

const SOURCE_URL: &str = "https://zse.test";

struct StaticFeed {
    result: ScrapeResult,
}

#[async_trait]
impl MarketFeed for StaticFeed {
    async fn fetch(&self) -> Result<RawPage, FetchError> {
        Ok(RawPage {
            url: SOURCE_URL.to_string(),
            body: "<html></html>".to_string(),
            fetched_at: Utc::now(),
        })
    }

    fn parse(&self, _page: &RawPage) -> Result<ScrapeResult, ParseError> {
        Ok(self.result.clone())
    }
}

fn listing(symbol: &str, price: Decimal, change: Decimal, section: ListingSection) -> ParsedListing {
    ParsedListing {
        symbol: symbol.to_string(),
        name: Some(format!("{} Limited", symbol)),
        price,
        change_pct: change,
        market_cap: None,
        section,
    }
}

fn page_result(date_text: &str, delta_price: Decimal) -> ScrapeResult {
    ScrapeResult {
        listings: vec![
            listing("DELTA", delta_price, dec!(1.2), ListingSection::TopGainers),
            listing("ECO", dec!(75.10), dec!(-0.8), ListingSection::TopLosers),
            listing("MIZ.ETF", dec!(1.05), dec!(0.4), ListingSection::Etfs),
        ],
        activity: Some(MarketActivity {
            trade_date_text: Some(date_text.to_string()),
            total_trades: Some(342),
            total_turnover: Some(dec!(1234567.89)),
            ..MarketActivity::default()
        }),
        rows_seen: 3,
        rows_skipped: 0,
    }
}

#[tokio::test]
async fn test_pipeline_against_sqlite_store() {
    let tmp_dir = tempdir().unwrap();
    musika_store::config::set_root_dir(tmp_dir.path().to_path_buf());

    let store = Arc::new(SqliteMarketStore::new().await.unwrap());
    let audit = Arc::new(SqliteScrapeLogStore::new().await.unwrap());
    let config = AppConfig::default().ingest;

    // 1. 首次运行：三只证券全部新建
    let pipeline = ScrapePipeline::new(
        Arc::new(StaticFeed {
            result: page_result("05 DEC 2025", dec!(150.25)),
        }),
        store.clone(),
        audit.clone(),
        config.clone(),
        SOURCE_URL.to_string(),
    );
    let outcome = pipeline.run().await;

    assert_eq!(outcome.status, ScrapeStatus::Success);
    assert_eq!(outcome.trade_date, NaiveDate::from_ymd_opt(2025, 12, 5));
    assert_eq!(outcome.securities_created, 3);
    assert_eq!(outcome.prices_upserted, 3);

    let securities = store.list_securities(&SecurityFilter::default()).await.unwrap();
    assert_eq!(securities.len(), 3);

    let delta = store.get_security("DELTA").await.unwrap().unwrap();
    let latest = store.latest_price(delta.id).await.unwrap().unwrap();
    assert_eq!(latest.price, dec!(150.25));
    assert_eq!(latest.data_source, "homepage_scrape");

    let summary = store.market_summary(None).await.unwrap().unwrap();
    assert_eq!(summary.total_trades, Some(342));
    assert_eq!(summary.advances, 2);
    assert_eq!(summary.declines, 1);

    // 2. 同日重跑：只覆盖，不新建
    let rerun = ScrapePipeline::new(
        Arc::new(StaticFeed {
            result: page_result("05 DEC 2025", dec!(151.00)),
        }),
        store.clone(),
        audit.clone(),
        config.clone(),
        SOURCE_URL.to_string(),
    );
    let outcome = rerun.run().await;

    assert_eq!(outcome.status, ScrapeStatus::Success);
    assert_eq!(outcome.securities_created, 0);
    assert_eq!(outcome.prices_upserted, 3);

    let latest = store.latest_price(delta.id).await.unwrap().unwrap();
    assert_eq!(latest.price, dec!(151.00));
    let history = store
        .price_history(delta.id, &Default::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);

    // 3. 次日运行后历史增长
    let next_day = ScrapePipeline::new(
        Arc::new(StaticFeed {
            result: page_result("08 DEC 2025", dec!(149.10)),
        }),
        store.clone(),
        audit.clone(),
        config.clone(),
        SOURCE_URL.to_string(),
    );
    next_day.run().await;

    let history = store
        .price_history(delta.id, &Default::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].trade_date, NaiveDate::from_ymd_opt(2025, 12, 8).unwrap());

    // 4. 每次运行都落了一条审计日志
    let logs = audit.recent(10).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.status == ScrapeStatus::Success));
    assert!(logs.iter().all(|l| l.source_url == SOURCE_URL));
    assert!(logs[0].raw_snapshot.as_deref().unwrap().contains("DELTA"));
}
