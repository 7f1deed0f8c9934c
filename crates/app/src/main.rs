use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDateTime, Weekday};
use clap::{Parser, Subcommand};
use musika_api::server::AppState;
use musika_core::common::Tier;
use musika_core::config::{AppConfig, SchedulerConfig};
use musika_core::ingest::entity::ScrapeStatus;
use musika_core::store::port::{KeyStore, ResetWindow};
use musika_feed::zse::ZseFeed;
use musika_ingest::pipeline::ScrapePipeline;
use musika_store::keys::SqliteKeyStore;
use musika_store::market::SqliteMarketStore;
use musika_store::scrape_log::SqliteScrapeLogStore;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "musika", about = "ZSE market data scraper and API service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server together with the weekday scrape scheduler.
    Serve,
    /// Run one scrape immediately and print the outcome.
    Scrape,
    /// API key administration.
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Reset per-key usage counters for the given window.
    ResetCounters {
        /// Counter window: daily or monthly.
        window: String,
    },
}

#[derive(Subcommand)]
enum KeysAction {
    /// Issue a new key; the secret is printed once and never stored.
    Create {
        email: String,
        /// Service tier: free, pro or enterprise.
        #[arg(long, default_value = "free")]
        tier: String,
    },
    /// List all keys, newest first.
    List,
    /// Re-enable a key by id.
    Activate { id: i64 },
    /// Revoke a key by id.
    Deactivate { id: i64 },
    /// Pool-wide usage statistics.
    Stats,
}

/// # Summary
/// 应用启动入口，解析命令行并分发到对应的运行模式。
///
/// # Logic
/// 1. 解析命令行参数，缺省等价于 `serve`。
/// 2. 加载配置（默认值 <- config/default.toml <- MUSIKA_* 环境变量）。
/// 3. 设置存储根目录，全进程只设置一次。
/// 4. serve/scrape 模式初始化全局日志（控制台 + 滚动文件）。
/// 5. 分发到对应的子命令处理函数。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config()?;
    musika_store::config::set_root_dir(PathBuf::from(&config.database.data_dir));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let _guard = init_tracing();
            run_serve(config).await
        }
        Commands::Scrape => {
            let _guard = init_tracing();
            run_scrape(config).await
        }
        Commands::Keys { action } => run_keys(&config, action).await,
        Commands::ResetCounters { window } => run_reset_counters(&window).await,
    }
}

/// 叠加配置源：内置默认值、config/default.toml（可缺省）、MUSIKA_* 环境变量。
fn load_config() -> Result<AppConfig, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(
            config::Environment::with_prefix("MUSIKA")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize()
}

/// 初始化全局日志：控制台层 + 按天滚动的文件层，级别由 RUST_LOG 控制。
/// 返回的 guard 在进程存活期间必须持有，否则文件日志会丢失。
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "musika.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    guard
}

/// # Summary
/// 常驻服务模式：API 服务器 + 定时采集调度器，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入。
///
/// # Logic
/// 1. 实例化基础设施层（Feed、Store）。
/// 2. 构造采集流水线并交给后台调度任务。
/// 3. 启动 API 服务器，内部监听 ctrl-c 优雅退出。
async fn run_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Musika starting...");

    // 1. 实例化基础设施层
    let feed = Arc::new(ZseFeed::new(&config.feed)?);
    let market_store = Arc::new(SqliteMarketStore::new().await?);
    let key_store = Arc::new(SqliteKeyStore::new().await?);
    let scrape_log = Arc::new(SqliteScrapeLogStore::new().await?);

    // 2. 构造采集流水线（注入 Core Trait 抽象）
    let pipeline = ScrapePipeline::new(
        feed,
        market_store.clone(),
        scrape_log,
        config.ingest.clone(),
        config.feed.source_url.clone(),
    );

    // 3. 后台调度：工作日的固定本地时刻触发一次抓取
    tokio::spawn(run_scheduler(pipeline, config.scheduler.clone()));

    // 4. 启动 API 服务器，阻塞到退出信号
    let state = AppState {
        market_store,
        key_store,
    };
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    musika_api::server::start_server(state, &bind_addr).await?;

    info!("Shutdown complete. Exiting...");
    Ok(())
}

/// 调度循环：睡到下一个触发时刻，跑一轮流水线，周而复始。
async fn run_scheduler(pipeline: Arc<ScrapePipeline>, config: SchedulerConfig) {
    info!(
        hour = config.hour,
        minute = config.minute,
        weekdays_only = config.weekdays_only,
        "Scheduler started. Waiting for jobs..."
    );

    loop {
        let delay = next_run_delay(&config, Local::now().naive_local());
        let wait = delay.to_std().unwrap_or(std::time::Duration::ZERO);
        info!(wait_secs = wait.as_secs(), "Next scrape scheduled");
        tokio::time::sleep(wait).await;

        let outcome = pipeline.run().await;
        if outcome.status == ScrapeStatus::Failed {
            error!(error = ?outcome.error, "Scheduled scrape failed");
        }
    }
}

/// # Summary
/// 计算距离下一个触发时刻的时长。
///
/// # Logic
/// 1. 候选时刻取当天配置的 时:分，已过则顺延一天。
/// 2. 只跑工作日时跳过周六周日。
///
/// # Arguments
/// * `config`: 调度配置。
/// * `now`: 当前本地时间。
///
/// # Returns
/// 距下一次触发的时长，恒为正。
fn next_run_delay(config: &SchedulerConfig, now: NaiveDateTime) -> ChronoDuration {
    let hour = config.hour.min(23);
    let minute = config.minute.min(59);
    let mut candidate = now.date().and_hms_opt(hour, minute, 0).unwrap_or(now);

    if candidate <= now {
        candidate += ChronoDuration::days(1);
    }
    if config.weekdays_only {
        while matches!(candidate.weekday(), Weekday::Sat | Weekday::Sun) {
            candidate += ChronoDuration::days(1);
        }
    }

    candidate - now
}

/// 单次采集模式：跑一轮流水线，打印结果，失败时退出码非零。
async fn run_scrape(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let feed = Arc::new(ZseFeed::new(&config.feed)?);
    let market_store = Arc::new(SqliteMarketStore::new().await?);
    let scrape_log = Arc::new(SqliteScrapeLogStore::new().await?);

    let pipeline = ScrapePipeline::new(
        feed,
        market_store,
        scrape_log,
        config.ingest.clone(),
        config.feed.source_url.clone(),
    );

    let outcome = pipeline.run().await;

    println!("Status:             {}", outcome.status);
    if let Some(trade_date) = outcome.trade_date {
        println!("Trade date:         {}", trade_date);
    }
    println!("Records parsed:     {}", outcome.records_parsed);
    println!("Rows skipped:       {}", outcome.rows_skipped);
    println!("Securities created: {}", outcome.securities_created);
    println!("Prices upserted:    {}", outcome.prices_upserted);
    println!("Elapsed:            {} ms", outcome.execution_time_ms);
    if let Some(reason) = &outcome.error {
        println!("Error:              {}", reason);
    }

    if outcome.status == ScrapeStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

/// 密钥管理模式：签发、列举、启停与统计，输出面向终端而非日志。
async fn run_keys(
    config: &AppConfig,
    action: KeysAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let key_store = SqliteKeyStore::new().await?;

    match action {
        KeysAction::Create { email, tier } => {
            let tier = Tier::from_str(&tier)?;
            let limits = config.quota.limits_for(tier);
            let issued = key_store.create_key(&email, tier, limits).await?;

            println!("API key created.");
            println!("  Id:            {}", issued.record.id);
            println!("  Email:         {}", issued.record.user_email);
            println!("  Tier:          {}", issued.record.tier);
            println!("  Daily limit:   {}", issued.record.daily_limit);
            println!("  Monthly limit: {}", issued.record.monthly_limit);
            println!();
            println!("  Key (save this, it will not be shown again):");
            println!("  {}", issued.secret);
            println!();
            println!(
                "  Example: curl -H \"X-API-Key: {}\" http://localhost:{}/api/v1/securities",
                issued.secret, config.server.port
            );
        }
        KeysAction::List => {
            let keys = key_store.list_keys().await?;
            if keys.is_empty() {
                println!("No API keys found.");
                return Ok(());
            }
            println!(
                "{:<5} {:<10} {:<30} {:<12} {:<12} {:<8} {}",
                "Id", "Prefix", "Email", "Tier", "Today", "Active", "Last used"
            );
            println!("{}", "-".repeat(96));
            for key in &keys {
                let usage = format!("{}/{}", key.requests_today, key.daily_limit);
                let last_used = key.last_used_at.map_or_else(
                    || "never".to_string(),
                    |t| t.format("%Y-%m-%d %H:%M").to_string(),
                );
                println!(
                    "{:<5} {:<10} {:<30} {:<12} {:<12} {:<8} {}",
                    key.id, key.key_prefix, key.user_email, key.tier, usage, key.is_active, last_used
                );
            }
        }
        KeysAction::Activate { id } => match key_store.set_active(id, true).await? {
            Some(email) => println!("Key #{} for {} activated.", id, email),
            None => println!("Key #{} not found.", id),
        },
        KeysAction::Deactivate { id } => match key_store.set_active(id, false).await? {
            Some(email) => println!("Key #{} for {} deactivated.", id, email),
            None => println!("Key #{} not found.", id),
        },
        KeysAction::Stats => {
            let stats = key_store.usage_stats().await?;
            println!("Total keys:     {}", stats.total_keys);
            println!("Active keys:    {}", stats.active_keys);
            println!("Requests today: {}", stats.requests_today);
            println!("Requests month: {}", stats.requests_month);
            if !stats.top_users.is_empty() {
                println!();
                println!("Top users today:");
                for row in &stats.top_users {
                    println!("  {:<40} {:>8}", row.user_email, row.requests_today);
                }
            }
        }
    }

    Ok(())
}

/// 计数器滚动清零：日窗口每天跑，月窗口每月一号跑，各自一条原子 UPDATE。
async fn run_reset_counters(window: &str) -> Result<(), Box<dyn std::error::Error>> {
    let reset = match window {
        "daily" => ResetWindow::Daily,
        "monthly" => ResetWindow::Monthly,
        other => {
            eprintln!("Unknown window '{}'. Valid: daily, monthly", other);
            std::process::exit(1);
        }
    };

    let key_store = SqliteKeyStore::new().await?;
    let affected = key_store.reset_counters(reset).await?;
    println!("Reset {} counters for {} keys.", window, affected);
    Ok(())
}
