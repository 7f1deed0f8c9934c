//! 本地化数值文本的还原。
//!
//! 交易所页面上的数字带有千分位逗号、百分号、前导正号与括号负数等
//! 排版痕迹（"1,234.50"、"+1.2%"、"(2.3%)"），占位符（"-"、"N/A"）
//! 表示数据缺失。本模块将这些文本还原为精确十进制，还原失败一律返回
//! None，由调用方决定该行是跳过还是整体缺省。

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

/// # Summary
/// 将本地化数值文本还原为精确十进制。
///
/// # Logic
/// 1. 占位符（"-"、"--"、"N/A"、空串）视为缺失。
/// 2. 括号包裹表示负数（会计排版），百分号与前导正号直接剥除。
/// 3. 去掉千分位逗号与内部空白后交给 `Decimal` 解析。
///
/// # Arguments
/// * `raw`: 页面单元格原文。
///
/// # Returns
/// 还原成功返回精确十进制，缺失或无法识别返回 None。
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let (text, negative) = clean(raw)?;
    let value = Decimal::from_str(&text).ok()?;
    Some(if negative { -value } else { value })
}

/// # Summary
/// 还原百分数文本（涨跌幅列）。
/// 与 `parse_decimal` 同一套清洗规则："(2.3%)" 还原为 -2.3。
pub fn parse_percent(raw: &str) -> Option<Decimal> {
    parse_decimal(raw)
}

/// # Summary
/// 还原整数计数文本（成交笔数等）。小数部分直接舍弃。
pub fn parse_count(raw: &str) -> Option<i64> {
    parse_decimal(raw)?.trunc().to_i64()
}

/// 清洗数值文本：返回可直接解析的数字串与负号标记。
fn clean(raw: &str) -> Option<(String, bool)> {
    let mut text = raw.trim();
    if text.is_empty() || is_placeholder(text) {
        return None;
    }

    let mut negative = false;

    // 会计排版的括号负数，百分号可能在括号内也可能在括号外
    if let Some(stripped) = text.strip_suffix('%') {
        text = stripped.trim();
    }
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        negative = true;
        text = inner.trim();
    }
    if let Some(stripped) = text.strip_suffix('%') {
        text = stripped.trim();
    }

    if let Some(stripped) = text.strip_prefix('-') {
        negative = true;
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix('+') {
        text = stripped;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    Some((cleaned, negative))
}

/// 页面用于表示缺失数据的占位符。
fn is_placeholder(text: &str) -> bool {
    matches!(text, "-" | "--" | "\u{2014}") || text.eq_ignore_ascii_case("n/a")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_thousands_separator() {
        assert_eq!(parse_decimal("1,234.50"), Some(dec!(1234.50)));
        assert_eq!(parse_decimal("1,234,567.89"), Some(dec!(1234567.89)));
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(parse_decimal("150.25"), Some(dec!(150.25)));
        assert_eq!(parse_decimal(" 88.00 "), Some(dec!(88.00)));
        assert_eq!(parse_decimal("0"), Some(dec!(0)));
    }

    #[test]
    fn test_signed_percentages() {
        assert_eq!(parse_percent("+1.2%"), Some(dec!(1.2)));
        assert_eq!(parse_percent("-0.5%"), Some(dec!(-0.5)));
        assert_eq!(parse_percent("1.2"), Some(dec!(1.2)));
    }

    #[test]
    fn test_parenthesized_negative() {
        assert_eq!(parse_percent("(2.3%)"), Some(dec!(-2.3)));
        assert_eq!(parse_percent("(2.3)%"), Some(dec!(-2.3)));
        assert_eq!(parse_decimal("(1,000.00)"), Some(dec!(-1000.00)));
    }

    #[test]
    fn test_placeholders_are_missing() {
        assert_eq!(parse_decimal("-"), None);
        assert_eq!(parse_decimal("--"), None);
        assert_eq!(parse_decimal("N/A"), None);
        assert_eq!(parse_decimal("n/a"), None);
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("12x34"), None);
        assert_eq!(parse_decimal("1.2.3"), None);
    }

    #[test]
    fn test_counts() {
        assert_eq!(parse_count("342"), Some(342));
        assert_eq!(parse_count("1,234"), Some(1234));
        assert_eq!(parse_count("N/A"), None);
    }
}
