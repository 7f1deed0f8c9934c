use chrono::NaiveDate;
use musika_core::common::{Currency, SecurityType};
use musika_core::ingest::entity::{
    PriceDraft, ReconciledBatch, ScrapeLogEntry, ScrapeStatus, SnapshotDraft, StagedSecurity,
};
use musika_core::store::port::{
    IngestStore, MarketReadStore, MoverDirection, PriceHistoryQuery, ScrapeLogStore,
    SecurityFilter,
};
use musika_store::config::set_root_dir;
use musika_store::market::SqliteMarketStore;
use musika_store::scrape_log::SqliteScrapeLogStore;
use rust_decimal_macros::dec;
use tempfile::tempdir;

fn batch_for(date: NaiveDate, prices: Vec<PriceDraft>) -> ReconciledBatch {
    ReconciledBatch {
        trade_date: date,
        data_source: "homepage_scrape".to_string(),
        new_securities: vec![],
        prices,
        snapshot: None,
        duplicates: vec![],
    }
}

#[tokio::test]
async fn test_market_store_full_integration() {
    // 1. 初始化临时测试环境
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    set_root_dir(tmp_dir.path().to_path_buf());

    let store = SqliteMarketStore::new()
        .await
        .expect("Failed to create market store");

    // 空库基线
    assert!(store.security_index().await.unwrap().is_empty());
    assert!(store.market_summary(None).await.unwrap().is_none());

    // 2. 提交首个批次：两只新证券、两行行情、一份快照
    let date = NaiveDate::from_ymd_opt(2025, 12, 5).unwrap();
    let batch = ReconciledBatch {
        trade_date: date,
        data_source: "homepage_scrape".to_string(),
        new_securities: vec![
            StagedSecurity {
                symbol: "DELTA".to_string(),
                name: Some("Delta Corporation".to_string()),
                security_type: SecurityType::Equity,
                currency: Currency::Zwg,
            },
            StagedSecurity {
                symbol: "MIZ.ETF".to_string(),
                name: None,
                security_type: SecurityType::Etf,
                currency: Currency::Zwg,
            },
        ],
        prices: vec![
            PriceDraft {
                symbol: "DELTA".to_string(),
                security_id: None,
                price: dec!(150.25),
                change_pct: dec!(1.2),
                market_cap: Some(dec!(1000000)),
            },
            PriceDraft {
                symbol: "MIZ.ETF".to_string(),
                security_id: None,
                price: dec!(1.05),
                change_pct: dec!(-0.8),
                market_cap: None,
            },
        ],
        snapshot: Some(SnapshotDraft {
            total_trades: Some(342),
            total_turnover: Some(dec!(1234567.89)),
            market_cap: None,
            foreign_purchases: None,
            foreign_sales: None,
            advances: 1,
            declines: 1,
            unchanged: 0,
        }),
        duplicates: vec![],
    };

    let stats = store.commit_batch(&batch).await.unwrap();
    assert_eq!(stats.securities_created, 2);
    assert_eq!(stats.prices_upserted, 2);
    assert!(stats.snapshot_written);

    // 3. 读取侧验证
    let index = store.security_index().await.unwrap();
    assert_eq!(index.len(), 2);

    let delta = store
        .get_security("DELTA")
        .await
        .unwrap()
        .expect("DELTA should exist");
    assert_eq!(delta.name.as_deref(), Some("Delta Corporation"));
    assert_eq!(delta.security_type, SecurityType::Equity);
    assert_eq!(delta.currency, Currency::Zwg);
    assert!(delta.is_active);
    assert!(store.get_security("UNKNOWN").await.unwrap().is_none());

    let latest = store
        .latest_price(delta.id)
        .await
        .unwrap()
        .expect("Latest price should exist");
    assert_eq!(latest.price, dec!(150.25));
    assert_eq!(latest.change_pct, dec!(1.2));
    assert_eq!(latest.market_cap, Some(dec!(1000000)));
    assert_eq!(latest.trade_date, date);
    assert_eq!(latest.data_source, "homepage_scrape");
    let first_created_at = latest.created_at;

    let etfs = store
        .list_securities(&SecurityFilter {
            active_only: true,
            security_type: Some(SecurityType::Etf),
            sector: None,
        })
        .await
        .unwrap();
    assert_eq!(etfs.len(), 1);
    assert_eq!(etfs[0].symbol, "MIZ.ETF");

    let summary = store
        .market_summary(None)
        .await
        .unwrap()
        .expect("Snapshot should exist");
    assert_eq!(summary.trade_date, date);
    assert_eq!(summary.total_trades, Some(342));
    assert_eq!(summary.total_turnover, Some(dec!(1234567.89)));
    assert_eq!(summary.advances, 1);
    assert_eq!(summary.declines, 1);

    let gainers = store.top_movers(MoverDirection::Gainers, 10).await.unwrap();
    assert_eq!(gainers.len(), 1);
    assert_eq!(gainers[0].symbol, "DELTA");
    assert_eq!(gainers[0].change_pct, dec!(1.2));

    let losers = store.top_movers(MoverDirection::Losers, 10).await.unwrap();
    assert_eq!(losers.len(), 1);
    assert_eq!(losers[0].symbol, "MIZ.ETF");

    // 4. 同日重跑：覆盖而非新增，created_at 保留
    let rerun = batch_for(
        date,
        vec![PriceDraft {
            symbol: "DELTA".to_string(),
            security_id: Some(delta.id),
            price: dec!(151.00),
            change_pct: dec!(1.7),
            market_cap: None,
        }],
    );
    let rerun_stats = store.commit_batch(&rerun).await.unwrap();
    assert_eq!(rerun_stats.securities_created, 0);
    assert_eq!(rerun_stats.prices_upserted, 1);

    let history = store
        .price_history(delta.id, &PriceHistoryQuery::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, dec!(151.00));
    assert_eq!(history[0].created_at, first_created_at);

    // 5. 第二个交易日与区间查询
    let date2 = NaiveDate::from_ymd_opt(2025, 12, 8).unwrap();
    let second_day = batch_for(
        date2,
        vec![PriceDraft {
            symbol: "DELTA".to_string(),
            security_id: Some(delta.id),
            price: dec!(149.00),
            change_pct: dec!(-1.3),
            market_cap: None,
        }],
    );
    store.commit_batch(&second_day).await.unwrap();

    let full = store
        .price_history(delta.id, &PriceHistoryQuery::default())
        .await
        .unwrap();
    assert_eq!(full.len(), 2);
    assert_eq!(full[0].trade_date, date2);

    let ranged = store
        .price_history(
            delta.id,
            &PriceHistoryQuery {
                start_date: None,
                end_date: Some(date),
                limit: 30,
            },
        )
        .await
        .unwrap();
    assert_eq!(ranged.len(), 1);
    assert_eq!(ranged[0].trade_date, date);

    let limited = store
        .price_history(
            delta.id,
            &PriceHistoryQuery {
                start_date: None,
                end_date: None,
                limit: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].trade_date, date2);

    // 涨跌榜只看最近交易日
    let gainers_now = store.top_movers(MoverDirection::Gainers, 10).await.unwrap();
    assert!(gainers_now.is_empty());
    let losers_now = store.top_movers(MoverDirection::Losers, 10).await.unwrap();
    assert_eq!(losers_now.len(), 1);
    assert_eq!(losers_now[0].change_pct, dec!(-1.3));

    assert!(store.market_summary(Some(date)).await.unwrap().is_some());
    let missing_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert!(store.market_summary(Some(missing_date)).await.unwrap().is_none());

    // 6. 审计日志：只追加，倒序读取
    let log_store = SqliteScrapeLogStore::new()
        .await
        .expect("Failed to create scrape log store");

    let first_id = log_store
        .record(&ScrapeLogEntry {
            status: ScrapeStatus::Success,
            source_url: "https://www.zse.co.zw".to_string(),
            records_parsed: 2,
            error_message: None,
            execution_time_ms: 1234,
            raw_snapshot: Some("{\"listings\":[]}".to_string()),
        })
        .await
        .unwrap();
    let second_id = log_store
        .record(&ScrapeLogEntry {
            status: ScrapeStatus::Failed,
            source_url: "https://www.zse.co.zw".to_string(),
            records_parsed: 0,
            error_message: Some("Transient fetch failure after 3 attempts".to_string()),
            execution_time_ms: 52,
            raw_snapshot: None,
        })
        .await
        .unwrap();
    assert!(second_id > first_id);

    let recent = log_store.recent(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, second_id);
    assert_eq!(recent[0].status, ScrapeStatus::Failed);
    assert!(recent[0].error_message.is_some());
    assert_eq!(recent[1].status, ScrapeStatus::Success);
    assert_eq!(recent[1].records_parsed, 2);

    let capped = log_store.recent(1).await.unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].id, second_id);
}
