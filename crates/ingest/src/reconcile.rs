//! 解析结果与存量证券索引的核对。
//!
//! 核对是纯函数：输入一次页面解析的产出与数据库中的证券全集，
//! 输出一个可单事务提交的批次。规范化、去重、类别推断与
//! 快照家数推导都发生在这里，存储层只负责原样落库。

use chrono::NaiveDate;
use musika_core::common::time::{extract_trade_date, today};
use musika_core::common::{SecurityType, normalize_symbol};
use musika_core::config::IngestConfig;
use musika_core::feed::entity::{ListingSection, ParsedListing, ScrapeResult};
use musika_core::ingest::entity::{PriceDraft, ReconciledBatch, SnapshotDraft, StagedSecurity};
use musika_core::market::entity::Security;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// # Summary
/// 把一次解析产出核对为可提交的批次。
///
/// # Logic
/// 1. 确定批次交易日：活动区块的日期原文可解析则用之，否则退回当天。
/// 2. 逐行规范化代码并去重：同一代码出现多次时后行覆盖前行并记入重复名单。
/// 3. 与证券索引比对：存量证券直接挂 ID，新代码按板块与后缀推断类别后暂存。
/// 4. 活动区块存在时构造快照草稿，上涨/下跌/持平家数由去重后的行情行推导。
///
/// # Arguments
/// * `result`: 页面解析产出。
/// * `index`: 数据库中的证券全集（含已停用）。
/// * `config`: 采集配置（数据来源标记、默认货币、类别后缀）。
///
/// # Returns
/// 核对完成的批次。
pub fn reconcile(
    result: &ScrapeResult,
    index: &[Security],
    config: &IngestConfig,
) -> ReconciledBatch {
    let trade_date = resolve_trade_date(result);

    let index_by_symbol: HashMap<&str, &Security> =
        index.iter().map(|s| (s.symbol.as_str(), s)).collect();

    // 后行覆盖前行：order 保持首次出现的顺序，rows 始终存最新一行
    let mut order: Vec<String> = Vec::new();
    let mut rows: HashMap<String, (&ParsedListing, SecurityType)> = HashMap::new();
    let mut duplicates: Vec<String> = Vec::new();

    for listing in &result.listings {
        let symbol = normalize_symbol(&listing.symbol);
        let security_type = infer_type(&symbol, listing.section, config);
        if rows.insert(symbol.clone(), (listing, security_type)).is_some() {
            warn!(symbol = %symbol, "Duplicate listing row, keeping the later occurrence");
            duplicates.push(symbol);
        } else {
            order.push(symbol);
        }
    }

    let mut new_securities = Vec::new();
    let mut prices = Vec::new();
    for symbol in &order {
        let (listing, security_type) = &rows[symbol];
        let security_id = index_by_symbol.get(symbol.as_str()).map(|s| s.id);
        if security_id.is_none() {
            new_securities.push(StagedSecurity {
                symbol: symbol.clone(),
                name: listing.name.clone(),
                security_type: *security_type,
                currency: config.default_currency,
            });
        }
        prices.push(PriceDraft {
            symbol: symbol.clone(),
            security_id,
            price: listing.price,
            change_pct: listing.change_pct,
            market_cap: listing.market_cap,
        });
    }

    let snapshot = result.activity.as_ref().map(|activity| {
        let mut draft = SnapshotDraft {
            total_trades: activity.total_trades,
            total_turnover: activity.total_turnover,
            market_cap: activity.market_cap,
            foreign_purchases: activity.foreign_purchases,
            foreign_sales: activity.foreign_sales,
            ..SnapshotDraft::default()
        };
        for price in &prices {
            if price.change_pct > Decimal::ZERO {
                draft.advances += 1;
            } else if price.change_pct < Decimal::ZERO {
                draft.declines += 1;
            } else {
                draft.unchanged += 1;
            }
        }
        draft
    });

    ReconciledBatch {
        trade_date,
        data_source: config.data_source.clone(),
        new_securities,
        prices,
        snapshot,
        duplicates,
    }
}

/// 批次交易日：页面日期原文可解析则用之，否则退回当天并告警。
fn resolve_trade_date(result: &ScrapeResult) -> NaiveDate {
    let parsed = result
        .activity
        .as_ref()
        .and_then(|a| a.trade_date_text.as_deref())
        .and_then(extract_trade_date);

    match parsed {
        Some(date) => date,
        None => {
            let fallback = today();
            warn!(date = %fallback, "No parseable trade date on page, falling back to today");
            fallback
        }
    }
}

/// 类别推断：ETF / REIT 板块直接定类，涨跌榜按代码后缀判断。
fn infer_type(symbol: &str, section: ListingSection, config: &IngestConfig) -> SecurityType {
    match section {
        ListingSection::Etfs => SecurityType::Etf,
        ListingSection::Reits => SecurityType::Reit,
        ListingSection::TopGainers | ListingSection::TopLosers => {
            if has_suffix(symbol, &config.etf_suffixes) {
                SecurityType::Etf
            } else if has_suffix(symbol, &config.reit_suffixes) {
                SecurityType::Reit
            } else {
                SecurityType::Equity
            }
        }
    }
}

/// 代码最后一个点号分段与任一后缀相同（忽略大小写）时为真。
fn has_suffix(symbol: &str, suffixes: &[String]) -> bool {
    symbol
        .rsplit_once('.')
        .is_some_and(|(_, tail)| suffixes.iter().any(|s| tail.eq_ignore_ascii_case(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use musika_core::common::Currency;
    use musika_core::config::AppConfig;
    use musika_core::feed::entity::MarketActivity;
    use rust_decimal_macros::dec;

    fn config() -> IngestConfig {
        AppConfig::default().ingest
    }

    fn listing(symbol: &str, price: Decimal, change: Decimal, section: ListingSection) -> ParsedListing {
        ParsedListing {
            symbol: symbol.to_string(),
            name: None,
            price,
            change_pct: change,
            market_cap: None,
            section,
        }
    }

    fn security(id: i64, symbol: &str) -> Security {
        let now: DateTime<Utc> = Utc::now();
        Security {
            id,
            symbol: symbol.to_string(),
            name: None,
            security_type: SecurityType::Equity,
            sector: None,
            currency: Currency::Zwg,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn activity_with_date(text: &str) -> MarketActivity {
        MarketActivity {
            trade_date_text: Some(text.to_string()),
            total_trades: Some(100),
            ..MarketActivity::default()
        }
    }

    #[test]
    fn test_known_symbol_gets_id_and_new_symbol_is_staged() {
        let result = ScrapeResult {
            listings: vec![
                listing("DELTA", dec!(150.25), dec!(1.2), ListingSection::TopGainers),
                listing(" newco ", dec!(10.00), dec!(-0.5), ListingSection::TopLosers),
            ],
            activity: Some(activity_with_date("05 DEC 2025")),
            rows_seen: 2,
            rows_skipped: 0,
        };
        let index = vec![security(7, "DELTA")];
        let batch = reconcile(&result, &index, &config());

        assert_eq!(batch.trade_date, NaiveDate::from_ymd_opt(2025, 12, 5).unwrap());
        assert_eq!(batch.prices.len(), 2);
        assert_eq!(batch.prices[0].symbol, "DELTA");
        assert_eq!(batch.prices[0].security_id, Some(7));
        assert_eq!(batch.prices[1].symbol, "NEWCO");
        assert_eq!(batch.prices[1].security_id, None);
        assert_eq!(batch.new_securities.len(), 1);
        assert_eq!(batch.new_securities[0].symbol, "NEWCO");
        assert_eq!(batch.new_securities[0].security_type, SecurityType::Equity);
        assert!(batch.duplicates.is_empty());
    }

    #[test]
    fn test_duplicate_symbol_later_row_wins() {
        let result = ScrapeResult {
            listings: vec![
                listing("CBZ", dec!(100.00), dec!(2.0), ListingSection::TopGainers),
                listing("cbz", dec!(101.50), dec!(3.5), ListingSection::TopGainers),
            ],
            activity: None,
            rows_seen: 2,
            rows_skipped: 0,
        };
        let batch = reconcile(&result, &[], &config());

        assert_eq!(batch.prices.len(), 1);
        assert_eq!(batch.prices[0].price, dec!(101.50));
        assert_eq!(batch.prices[0].change_pct, dec!(3.5));
        assert_eq!(batch.duplicates, vec!["CBZ".to_string()]);
        assert_eq!(batch.new_securities.len(), 1);
    }

    #[test]
    fn test_type_inference_by_section_and_suffix() {
        let result = ScrapeResult {
            listings: vec![
                listing("MIZ.ETF", dec!(1.05), dec!(0.8), ListingSection::Etfs),
                listing("TIG.REIT", dec!(2.40), dec!(-1.1), ListingSection::Reits),
                // 涨跌榜上的 ETF 代码按后缀归类
                listing("DZL.ETF", dec!(0.95), dec!(4.0), ListingSection::TopGainers),
                listing("HRE.REIT", dec!(3.10), dec!(-2.0), ListingSection::TopLosers),
                listing("DELTA", dec!(150.25), dec!(1.2), ListingSection::TopGainers),
            ],
            activity: None,
            rows_seen: 5,
            rows_skipped: 0,
        };
        let batch = reconcile(&result, &[], &config());

        let types: Vec<SecurityType> = batch
            .new_securities
            .iter()
            .map(|s| s.security_type)
            .collect();
        assert_eq!(
            types,
            vec![
                SecurityType::Etf,
                SecurityType::Reit,
                SecurityType::Etf,
                SecurityType::Reit,
                SecurityType::Equity,
            ]
        );
    }

    #[test]
    fn test_snapshot_breadth_derived_from_prices() {
        let result = ScrapeResult {
            listings: vec![
                listing("A", dec!(1.00), dec!(2.0), ListingSection::TopGainers),
                listing("B", dec!(2.00), dec!(0.5), ListingSection::TopGainers),
                listing("C", dec!(3.00), dec!(-1.0), ListingSection::TopLosers),
                listing("D", dec!(4.00), dec!(0), ListingSection::TopGainers),
            ],
            activity: Some(MarketActivity {
                total_trades: Some(342),
                total_turnover: Some(dec!(1234567.89)),
                ..MarketActivity::default()
            }),
            rows_seen: 4,
            rows_skipped: 0,
        };
        let batch = reconcile(&result, &[], &config());

        let snapshot = batch.snapshot.expect("activity should yield a snapshot");
        assert_eq!(snapshot.advances, 2);
        assert_eq!(snapshot.declines, 1);
        assert_eq!(snapshot.unchanged, 1);
        assert_eq!(snapshot.total_trades, Some(342));
    }

    #[test]
    fn test_no_activity_means_no_snapshot() {
        let result = ScrapeResult {
            listings: vec![listing("A", dec!(1.00), dec!(2.0), ListingSection::TopGainers)],
            activity: None,
            rows_seen: 1,
            rows_skipped: 0,
        };
        let batch = reconcile(&result, &[], &config());
        assert!(batch.snapshot.is_none());
    }

    #[test]
    fn test_unparseable_date_falls_back_to_today() {
        let result = ScrapeResult {
            listings: vec![listing("A", dec!(1.00), dec!(2.0), ListingSection::TopGainers)],
            activity: Some(activity_with_date("no date here")),
            rows_seen: 1,
            rows_skipped: 0,
        };
        let batch = reconcile(&result, &[], &config());
        assert_eq!(batch.trade_date, today());
    }

    #[test]
    fn test_data_source_is_stamped_from_config() {
        let result = ScrapeResult {
            listings: vec![listing("A", dec!(1.00), dec!(2.0), ListingSection::TopGainers)],
            activity: None,
            rows_seen: 1,
            rows_skipped: 0,
        };
        let batch = reconcile(&result, &[], &config());
        assert_eq!(batch.data_source, "homepage_scrape");
    }
}
