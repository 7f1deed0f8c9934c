use chrono::{Local, NaiveDate};

/// # Summary
/// 从一段自由文本中提取交易日。
/// 交易所页面的活动区块以 "05 DEC 2025" 的格式嵌入日期，
/// 前后可能带有星期、标点或其他说明文字。
///
/// # Logic
/// 1. 按空白切分文本，剥除每个词元两侧的标点。
/// 2. 以三词元滑动窗口寻找 "日 月 年" 形态的候选。
/// 3. 交给 chrono 按 `%d %b %Y` 解析（月份名大小写不敏感）。
///
/// # Arguments
/// * `text`: 活动区块中的日期原文。
///
/// # Returns
/// 解析成功返回交易日，否则返回 None。
pub fn extract_trade_date(text: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|t| !t.is_empty())
        .collect();

    for window in tokens.windows(3) {
        let (day, month, year) = (window[0], window[1], window[2]);
        if !looks_like_day(day) || !looks_like_month(month) || !looks_like_year(year) {
            continue;
        }
        let candidate = format!("{} {} {}", day, month, year);
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, "%d %b %Y") {
            return Some(date);
        }
    }
    None
}

/// # Summary
/// 交易日缺失时的回退值：本地日历的今天。
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn looks_like_day(token: &str) -> bool {
    (1..=2).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_digit())
}

fn looks_like_month(token: &str) -> bool {
    (3..=9).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_alphabetic())
}

fn looks_like_year(token: &str) -> bool {
    token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit())
}
