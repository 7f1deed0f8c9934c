//! ZSE 首页的容错解析。
//!
//! 首页以松散的表格布局呈现当日行情：涨幅榜、跌幅榜、ETF、REIT
//! 各占一张表，市场活动汇总以标签/数值对呈现。页面结构会漂移：
//! 列可能增减或换序、板块可能缺失、个别单元格可能是占位符。
//! 解析策略是整体容错：未识别的板块忽略，坏行计数跳过，绝不因
//! 单行失败中断整页。

use crate::numeric;
use musika_core::feed::entity::{ListingSection, MarketActivity, ParsedListing, ScrapeResult};
use musika_core::feed::error::ParseError;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// 页面板块的归类结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Listings(ListingSection),
    Activity,
}

/// 行情表的列位映射。
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    symbol: usize,
    name: Option<usize>,
    price: usize,
    change: usize,
    market_cap: Option<usize>,
}

/// # Summary
/// 将首页 HTML 解析为结构化抓取结果。纯函数，无 I/O。
///
/// # Logic
/// 1. 按文档顺序遍历标题与表格，标题决定后续表格的板块归属，
///    表格自身的 caption / 表头可覆盖归类。
/// 2. 行情表逐行提取代码、价格、涨跌幅（必填）与名称、市值（可选），
///    坏行计入跳过数。
/// 3. 市场活动表按标签/数值对提取汇总字段。
/// 4. 整页无任何行情行且无活动区块时返回 `ParseError`。
///
/// # Arguments
/// * `html`: 首页原文。
///
/// # Returns
/// 成功返回 `ScrapeResult`，无可用数据返回 `ParseError`。
pub fn parse_homepage(html: &str) -> Result<ScrapeResult, ParseError> {
    let document = Html::parse_document(html);
    let walker = selector("h1, h2, h3, h4, h5, h6, table");

    let mut result = ScrapeResult::default();
    let mut activity = MarketActivity::default();
    let mut saw_activity = false;
    // 最近一个标题的归类；每张表消费一次，防止后续表格被错误归属
    let mut current: Option<SectionKind> = None;
    let mut activity_heading = String::new();

    for element in document.select(&walker) {
        if element.value().name() == "table" {
            let kind = classify(&table_title_text(&element)).or(current);
            match kind {
                Some(SectionKind::Listings(section)) => {
                    parse_listing_table(&element, section, &mut result);
                }
                Some(SectionKind::Activity) => {
                    parse_activity_table(&element, &mut activity);
                    saw_activity = true;
                }
                // 未识别板块（指数表等），整表忽略
                None => {}
            }
            current = None;
        } else {
            let text = element_text(&element);
            current = classify(&text);
            if current == Some(SectionKind::Activity) {
                activity_heading = text;
            }
        }
    }

    // 活动区块常把交易日写在标题里（"MARKET ACTIVITY FOR 05 DEC 2025"）
    if saw_activity
        && activity.trade_date_text.is_none()
        && activity_heading.bytes().any(|b| b.is_ascii_digit())
    {
        activity.trade_date_text = Some(activity_heading);
    }

    if saw_activity && activity_has_content(&activity) {
        result.activity = Some(activity);
    }

    if result.is_empty() {
        return Err(ParseError::EmptyOrUnrecognized);
    }
    Ok(result)
}

/// 按关键词归类标题或表格自述文本。
fn classify(text: &str) -> Option<SectionKind> {
    let t = text.to_uppercase();
    if t.is_empty() {
        return None;
    }
    if t.contains("GAINER") {
        Some(SectionKind::Listings(ListingSection::TopGainers))
    } else if t.contains("LOSER") || t.contains("SHAKER") {
        Some(SectionKind::Listings(ListingSection::TopLosers))
    } else if t.contains("ETF") {
        Some(SectionKind::Listings(ListingSection::Etfs))
    } else if t.contains("REIT") {
        Some(SectionKind::Listings(ListingSection::Reits))
    } else if t.contains("MARKET ACTIVITY") || t.contains("TRADING ACTIVITY") {
        Some(SectionKind::Activity)
    } else {
        None
    }
}

/// 表格的自述文本：caption 加首行表头，供覆盖归类。
fn table_title_text(table: &ElementRef) -> String {
    let mut parts: Vec<String> = table
        .select(&selector("caption"))
        .map(|c| element_text(&c))
        .collect();
    if let Some(first_row) = table.select(&selector("tr")).next() {
        for cell in first_row.select(&selector("th")) {
            parts.push(element_text(&cell));
        }
    }
    parts.join(" ")
}

/// 解析一张行情表，产出追加到 `out`。
fn parse_listing_table(table: &ElementRef, section: ListingSection, out: &mut ScrapeResult) {
    let mut map: Option<ColumnMap> = None;

    for row in table.select(&selector("tr")) {
        let cells: Vec<(bool, String)> = row
            .select(&selector("td, th"))
            .map(|c| (c.value().name() == "th", element_text(&c)))
            .collect();
        if cells.is_empty() {
            continue;
        }
        let texts: Vec<String> = cells.iter().map(|(_, t)| t.clone()).collect();

        // 全 th 的行是表头：建立列位映射后跳过
        if cells.iter().all(|(is_th, _)| *is_th) {
            if map.is_none() {
                map = header_map(&texts);
            }
            continue;
        }
        if texts.len() < 2 {
            continue;
        }

        out.rows_seen += 1;
        let effective = map.or_else(|| positional_map(texts.len()));
        match effective.and_then(|m| parse_row(&texts, &m, section)) {
            Some(listing) => out.listings.push(listing),
            None => {
                out.rows_skipped += 1;
                debug!(?section, row = ?texts, "Skipping unparseable row");
            }
        }
    }
}

/// 按表头关键词建立列位映射；缺少任一必填列时返回 None 走位置回退。
fn header_map(headers: &[String]) -> Option<ColumnMap> {
    let mut symbol = None;
    let mut name = None;
    let mut price = None;
    let mut change = None;
    let mut market_cap = None;

    for (i, raw) in headers.iter().enumerate() {
        let t = raw.to_uppercase();
        if symbol.is_none()
            && (t.contains("SYMBOL")
                || t.contains("CODE")
                || t.contains("COUNTER")
                || t.contains("TICKER"))
        {
            symbol = Some(i);
        } else if name.is_none()
            && (t.contains("NAME") || t.contains("COMPANY") || t.contains("SECURITY"))
        {
            name = Some(i);
        } else if market_cap.is_none() && t.contains("CAP") {
            market_cap = Some(i);
        } else if change.is_none() && (t.contains('%') || t.contains("CHANGE")) {
            change = Some(i);
        } else if price.is_none()
            && (t.contains("PRICE") || t.contains("CLOSE") || t.contains("VALUE"))
        {
            price = Some(i);
        }
    }

    Some(ColumnMap {
        symbol: symbol?,
        name,
        price: price?,
        change: change?,
        market_cap,
    })
}

/// 无表头时按列数假定布局。
fn positional_map(cell_count: usize) -> Option<ColumnMap> {
    match cell_count {
        3 => Some(ColumnMap {
            symbol: 0,
            name: None,
            price: 1,
            change: 2,
            market_cap: None,
        }),
        4 => Some(ColumnMap {
            symbol: 0,
            name: Some(1),
            price: 2,
            change: 3,
            market_cap: None,
        }),
        n if n >= 5 => Some(ColumnMap {
            symbol: 0,
            name: Some(1),
            price: 2,
            change: 3,
            market_cap: Some(4),
        }),
        _ => None,
    }
}

/// 提取单行行情；任一必填字段缺失或不可解析即整行放弃。
fn parse_row(cells: &[String], map: &ColumnMap, section: ListingSection) -> Option<ParsedListing> {
    let symbol = cells.get(map.symbol)?.trim();
    if !symbol.chars().any(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let price = numeric::parse_decimal(cells.get(map.price)?)?;
    let change_pct = numeric::parse_percent(cells.get(map.change)?)?;
    let name = map
        .name
        .and_then(|i| cells.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let market_cap = map
        .market_cap
        .and_then(|i| cells.get(i))
        .and_then(|s| numeric::parse_decimal(s));

    Some(ParsedListing {
        symbol: symbol.to_string(),
        name,
        price,
        change_pct,
        market_cap,
        section,
    })
}

/// 解析市场活动表：优先逐行的标签/数值对，
/// 否则尝试两行布局（首行全为标签，次行对位取值）。
fn parse_activity_table(table: &ElementRef, activity: &mut MarketActivity) {
    let rows: Vec<Vec<String>> = table
        .select(&selector("tr"))
        .map(|row| {
            row.select(&selector("td, th"))
                .map(|c| element_text(&c))
                .collect()
        })
        .collect();

    let mut matched_pairs = false;
    for row in &rows {
        if row.len() >= 2 && apply_activity_field(activity, &row[0], &row[1]) {
            matched_pairs = true;
        }
    }

    if !matched_pairs && rows.len() == 2 && rows[0].len() == rows[1].len() {
        for (label, value) in rows[0].iter().zip(&rows[1]) {
            apply_activity_field(activity, label, value);
        }
    }
}

/// 按标签关键词填充活动字段；识别出标签即返回 true。
fn apply_activity_field(activity: &mut MarketActivity, label: &str, value: &str) -> bool {
    let l = label.to_uppercase();
    if l.contains("DATE") {
        activity.trade_date_text = Some(value.trim().to_string());
    } else if l.contains("TRADES") || l.contains("DEALS") {
        activity.total_trades = numeric::parse_count(value);
    } else if l.contains("TURNOVER") {
        activity.total_turnover = numeric::parse_decimal(value);
    } else if l.contains("FOREIGN") && (l.contains("PURCHASE") || l.contains("BUY")) {
        activity.foreign_purchases = numeric::parse_decimal(value);
    } else if l.contains("FOREIGN") && (l.contains("SALE") || l.contains("SELL")) {
        activity.foreign_sales = numeric::parse_decimal(value);
    } else if l.contains("CAP") {
        activity.market_cap = numeric::parse_decimal(value);
    } else {
        return false;
    }
    true
}

/// 活动区块至少带回一个字段时才算有内容。
fn activity_has_content(activity: &MarketActivity) -> bool {
    activity.trade_date_text.is_some()
        || activity.total_trades.is_some()
        || activity.total_turnover.is_some()
        || activity.market_cap.is_some()
        || activity.foreign_purchases.is_some()
        || activity.foreign_sales.is_some()
}

/// 提取元素的可见文本并折叠空白。
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// CSS 选择器常量在编译期写死，解析失败属于程序错误。
fn selector(css: &str) -> Selector {
    #[allow(clippy::unwrap_used)]
    Selector::parse(css).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FULL_PAGE: &str = r#"
    <html><body>
      <div class="widget">
        <h2>Top Gainers</h2>
        <table>
          <thead><tr><th>Symbol</th><th>Price (ZWG)</th><th>% Change</th></tr></thead>
          <tbody>
            <tr><td>DELTA</td><td>150.25</td><td>+1.2%</td></tr>
            <tr><td>CBZ</td><td>1,234.50</td><td>+4.0%</td></tr>
          </tbody>
        </table>
      </div>
      <div class="widget">
        <h2>Top Losers</h2>
        <table>
          <thead><tr><th>Symbol</th><th>Price (ZWG)</th><th>% Change</th></tr></thead>
          <tbody>
            <tr><td>ECO</td><td>88.00</td><td>(0.5%)</td></tr>
          </tbody>
        </table>
      </div>
      <div class="widget">
        <h2>ETFs</h2>
        <table>
          <thead><tr><th>Symbol</th><th>Name</th><th>Price</th><th>% Change</th><th>Market Cap</th></tr></thead>
          <tbody>
            <tr><td>MIZ.ETF</td><td>Morgan Income Zone</td><td>1.05</td><td>+0.8%</td><td>12,500,000.00</td></tr>
          </tbody>
        </table>
      </div>
      <div class="widget">
        <h2>REITs</h2>
        <table>
          <tbody>
            <tr><td>TIG.REIT</td><td>2.40</td><td>-1.1%</td></tr>
          </tbody>
        </table>
      </div>
      <div class="widget">
        <h2>Market Activity</h2>
        <table>
          <tr><th>Date</th><td>05 DEC 2025</td></tr>
          <tr><th>Total Trades</th><td>342</td></tr>
          <tr><th>Total Turnover</th><td>1,234,567.89</td></tr>
          <tr><th>Market Cap</th><td>98,765,432.10</td></tr>
          <tr><th>Foreign Purchases</th><td>12,000.00</td></tr>
          <tr><th>Foreign Sales</th><td>(3,500.00)</td></tr>
        </table>
      </div>
    </body></html>
    "#;

    #[test]
    fn test_parses_all_sections() {
        let result = parse_homepage(FULL_PAGE).unwrap();
        assert_eq!(result.listings.len(), 5);
        assert_eq!(result.rows_seen, 5);
        assert_eq!(result.rows_skipped, 0);

        let delta = &result.listings[0];
        assert_eq!(delta.symbol, "DELTA");
        assert_eq!(delta.price, dec!(150.25));
        assert_eq!(delta.change_pct, dec!(1.2));
        assert_eq!(delta.section, ListingSection::TopGainers);

        let cbz = &result.listings[1];
        assert_eq!(cbz.price, dec!(1234.50));

        let eco = &result.listings[2];
        assert_eq!(eco.symbol, "ECO");
        assert_eq!(eco.change_pct, dec!(-0.5));
        assert_eq!(eco.section, ListingSection::TopLosers);

        let etf = &result.listings[3];
        assert_eq!(etf.section, ListingSection::Etfs);
        assert_eq!(etf.name.as_deref(), Some("Morgan Income Zone"));
        assert_eq!(etf.market_cap, Some(dec!(12500000.00)));

        let reit = &result.listings[4];
        assert_eq!(reit.symbol, "TIG.REIT");
        assert_eq!(reit.section, ListingSection::Reits);
    }

    #[test]
    fn test_parses_market_activity() {
        let result = parse_homepage(FULL_PAGE).unwrap();
        let activity = result.activity.expect("activity block should parse");
        assert_eq!(activity.trade_date_text.as_deref(), Some("05 DEC 2025"));
        assert_eq!(activity.total_trades, Some(342));
        assert_eq!(activity.total_turnover, Some(dec!(1234567.89)));
        assert_eq!(activity.market_cap, Some(dec!(98765432.10)));
        assert_eq!(activity.foreign_purchases, Some(dec!(12000.00)));
        assert_eq!(activity.foreign_sales, Some(dec!(-3500.00)));
    }

    #[test]
    fn test_bad_row_skipped_not_fatal() {
        let html = r#"
        <h2>Top Gainers</h2>
        <table>
          <tr><td>DELTA</td><td>150.25</td><td>+1.2%</td></tr>
          <tr><td>BROKEN</td><td>-</td><td>N/A</td></tr>
          <tr><td></td><td>10.00</td><td>+1.0%</td></tr>
        </table>
        "#;
        let result = parse_homepage(html).unwrap();
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.rows_seen, 3);
        assert_eq!(result.rows_skipped, 2);
    }

    #[test]
    fn test_unknown_section_ignored() {
        let html = r#"
        <h2>ZSE Indices</h2>
        <table>
          <tr><td>All Share</td><td>205.11</td><td>+0.3%</td></tr>
        </table>
        <h2>Top Gainers</h2>
        <table>
          <tr><td>DELTA</td><td>150.25</td><td>+1.2%</td></tr>
        </table>
        "#;
        let result = parse_homepage(html).unwrap();
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].symbol, "DELTA");
    }

    #[test]
    fn test_caption_overrides_missing_heading() {
        let html = r#"
        <table>
          <caption>REITs</caption>
          <tr><td>TIG.REIT</td><td>2.40</td><td>-1.1%</td></tr>
        </table>
        "#;
        let result = parse_homepage(html).unwrap();
        assert_eq!(result.listings[0].section, ListingSection::Reits);
    }

    #[test]
    fn test_heading_consumed_by_one_table() {
        // 涨幅榜标题只作用于紧随其后的一张表，其后的无标题表格不得沿用
        let html = r#"
        <h2>Top Gainers</h2>
        <table>
          <tr><td>DELTA</td><td>150.25</td><td>+1.2%</td></tr>
        </table>
        <table>
          <tr><td>MYSTERY</td><td>9.99</td><td>+9.9%</td></tr>
        </table>
        "#;
        let result = parse_homepage(html).unwrap();
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].symbol, "DELTA");
    }

    #[test]
    fn test_activity_two_row_layout() {
        let html = r#"
        <h2>Market Activity</h2>
        <table>
          <tr><th>Total Trades</th><th>Total Turnover</th><th>Market Cap</th></tr>
          <tr><td>342</td><td>1,234,567.89</td><td>98,765,432.10</td></tr>
        </table>
        "#;
        let result = parse_homepage(html).unwrap();
        let activity = result.activity.expect("columnar activity should parse");
        assert_eq!(activity.total_trades, Some(342));
        assert_eq!(activity.total_turnover, Some(dec!(1234567.89)));
    }

    #[test]
    fn test_activity_date_from_heading() {
        let html = r#"
        <h2>MARKET ACTIVITY FOR FRIDAY 05 DEC 2025</h2>
        <table>
          <tr><th>Total Trades</th><td>42</td></tr>
        </table>
        "#;
        let result = parse_homepage(html).unwrap();
        let activity = result.activity.expect("activity should parse");
        assert!(
            activity
                .trade_date_text
                .as_deref()
                .is_some_and(|t| t.contains("05 DEC 2025"))
        );
    }

    #[test]
    fn test_empty_page_is_error() {
        let html = "<html><body><p>Maintenance in progress</p></body></html>";
        assert!(matches!(
            parse_homepage(html),
            Err(ParseError::EmptyOrUnrecognized)
        ));
    }

    #[test]
    fn test_reordered_columns_via_headers() {
        let html = r#"
        <h2>Top Gainers</h2>
        <table>
          <thead><tr><th>% Change</th><th>Symbol</th><th>Price</th></tr></thead>
          <tr><td>+1.2%</td><td>DELTA</td><td>150.25</td></tr>
        </table>
        "#;
        let result = parse_homepage(html).unwrap();
        assert_eq!(result.listings[0].symbol, "DELTA");
        assert_eq!(result.listings[0].price, dec!(150.25));
        assert_eq!(result.listings[0].change_pct, dec!(1.2));
    }
}
