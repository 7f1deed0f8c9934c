//! `ZseFeed` 的端到端测试：用本地桩服务器模拟 ZSE 官网，
//! 覆盖成功抓取、瞬时故障重试恢复、重试耗尽与确定性失败不重试。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use musika_core::config::FeedConfig;
use musika_core::feed::entity::ListingSection;
use musika_core::feed::error::FetchError;
use musika_core::feed::port::MarketFeed;
use musika_feed::zse::ZseFeed;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const HOMEPAGE: &str = r#"
<html><body>
  <h2>Top Gainers</h2>
  <table>
    <tr><td>DELTA</td><td>150.25</td><td>+1.2%</td></tr>
    <tr><td>CBZ</td><td>1,234.50</td><td>+4.0%</td></tr>
  </table>
  <h2>Market Activity</h2>
  <table>
    <tr><th>Date</th><td>05 DEC 2025</td></tr>
    <tr><th>Total Trades</th><td>342</td></tr>
  </table>
</body></html>
"#;

fn http_ok(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

fn http_status(code: u16, reason: &str) -> String {
    format!("HTTP/1.1 {code} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
}

/// 起一个桩服务器：按顺序对每个连接回放一条预设响应，并统计命中数。
async fn spawn_stub(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), hits)
}

/// reqwest 以 rustls-no-provider 特性构建，建客户端前需安装进程级默认加密后端。
fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn test_config(source_url: String, max_retries: u32) -> FeedConfig {
    FeedConfig {
        source_url,
        timeout_secs: 5,
        max_retries,
        retry_backoff_ms: 10,
        user_agent: "musika-feed-test/0.1".to_string(),
    }
}

#[tokio::test]
async fn test_fetch_and_parse_homepage() {
    install_crypto_provider();
    let (url, hits) = spawn_stub(vec![http_ok(HOMEPAGE)]).await;
    let feed = ZseFeed::new(&test_config(url.clone(), 3)).unwrap();

    let page = feed.fetch().await.unwrap();
    assert_eq!(page.url, url);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let result = feed.parse(&page).unwrap();
    assert_eq!(result.listings.len(), 2);
    assert_eq!(result.listings[0].symbol, "DELTA");
    assert_eq!(result.listings[0].section, ListingSection::TopGainers);
    let activity = result.activity.expect("activity block should parse");
    assert_eq!(activity.trade_date_text.as_deref(), Some("05 DEC 2025"));
    assert_eq!(activity.total_trades, Some(342));
}

#[tokio::test]
async fn test_retry_recovers_after_server_error() {
    install_crypto_provider();
    let (url, hits) = spawn_stub(vec![
        http_status(500, "Internal Server Error"),
        http_ok(HOMEPAGE),
    ])
    .await;
    let feed = ZseFeed::new(&test_config(url, 3)).unwrap();

    let page = feed.fetch().await.unwrap();
    assert!(page.body.contains("DELTA"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_transient_error_exhausts_attempts() {
    install_crypto_provider();
    let (url, hits) = spawn_stub(vec![
        http_status(503, "Service Unavailable"),
        http_status(503, "Service Unavailable"),
    ])
    .await;
    let feed = ZseFeed::new(&test_config(url, 2)).unwrap();

    let err = feed.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Transient { attempts: 2, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_permanent_error_does_not_retry() {
    install_crypto_provider();
    let (url, hits) = spawn_stub(vec![
        http_status(404, "Not Found"),
        http_status(404, "Not Found"),
    ])
    .await;
    let feed = ZseFeed::new(&test_config(url, 3)).unwrap();

    let err = feed.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Permanent(_)));
    // 确定性失败必须立即抛出，不得消耗剩余重试次数
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
