//! Hydrobill - local companion for the water-utility billing desktop shell.
//!
//! Opens the embedded store and the cache mirror the desktop shell uses
//! offline, and offers a few maintenance commands: seeding demo data,
//! listing what the local store holds, and clearing cached data.

mod app;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use hydrobill_core::utils::{format_balance, format_date, truncate_string};
use hydrobill_core::Config;

// ============================================================================
// Constants
// ============================================================================

/// Prefix for the daily rolling log file in the cache directory
const LOG_FILE_PREFIX: &str = "hydrobill.log";

/// Column widths for the subscriber listing
const NAME_WIDTH: usize = 24;
const ADDRESS_WIDTH: usize = 28;

const USAGE: &str = "\
Usage: hydrobill [COMMAND]

Commands:
  --seed-demo           Insert demo subscribers, payments and readings
  --subscribers         List subscribers
  --payments            List payments
  --readings <ID>       List meter readings for a subscriber
  --clear-cache         Drop all cached data, including the disk mirror
  --help                Show this message

With no command, prints a summary of the local store and caches.";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`), and to a daily
/// rolling file when a log directory is available. The returned guard must
/// be held until exit so buffered file output is flushed.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = log_dir.and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .build(dir)
            .ok()
    });
    let (file_layer, guard) = match file_appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _log_guard = init_tracing(config.cache_dir().ok().map(|dir| dir.join("logs")));
    info!("Hydrobill starting");

    let mut app = App::new(&config)?;
    app.start_sweepers();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = run_command(&app, &args);

    app.shutdown().await;
    info!("Hydrobill shutting down");
    result
}

fn run_command(app: &App, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        None => print_summary(app),
        Some("--seed-demo") => {
            let report = app.seed_demo()?;
            println!(
                "Seeded demo data: {} inserted, {} already present",
                report.inserted, report.skipped
            );
            Ok(())
        }
        Some("--subscribers") => print_subscribers(app),
        Some("--payments") => print_payments(app),
        Some("--readings") => match args.get(1) {
            Some(subscriber_id) => print_readings(app, subscriber_id),
            None => bail!("Missing subscriber id\n\n{}", USAGE),
        },
        Some("--clear-cache") => {
            app.invalidate_all();
            println!("Cache cleared");
            Ok(())
        }
        Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => bail!("Unknown argument: {}\n\n{}", other, USAGE),
    }
}

fn print_summary(app: &App) -> Result<()> {
    let subscribers = app.subscribers()?;
    let in_debt = subscribers.iter().filter(|s| s.in_debt()).count();
    let payments = app.payments()?;

    match app.store.path() {
        Some(path) => println!("Local store: {}", path.display()),
        None => println!("Local store: in memory"),
    }
    println!("Subscribers: {} ({} in debt)", subscribers.len(), in_debt);
    println!("Payments:    {}", payments.len());
    println!();
    println!("Caches:");
    for (name, stats) in app.cache_stats() {
        let bound = stats
            .max_entries
            .map(|max| max.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        println!(
            "  {:<12} {} entries, {} expired, {}, {}",
            name,
            stats.entries,
            stats.expired,
            bound,
            if stats.mirrored { "mirrored" } else { "memory only" }
        );
    }
    Ok(())
}

fn print_subscribers(app: &App) -> Result<()> {
    let mut subscribers = app.subscribers()?;
    subscribers.sort_by(|a, b| a.id.cmp(&b.id));

    for s in &subscribers {
        println!(
            "{:<12} {:<name_w$} {:<addr_w$} {:>16}  {}",
            s.id,
            truncate_string(&s.full_name, NAME_WIDTH),
            truncate_string(&s.address, ADDRESS_WIDTH),
            format_balance(s.balance),
            s.status,
            name_w = NAME_WIDTH,
            addr_w = ADDRESS_WIDTH,
        );
    }
    if let Some(age) = app.subscribers_age() {
        println!("\n{} subscribers (cached {})", subscribers.len(), age);
    }
    Ok(())
}

fn print_payments(app: &App) -> Result<()> {
    let mut payments = app.payments()?;
    payments.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    for p in &payments {
        println!(
            "{:<14} {:<12} {:>12.2}  {:<12} {:<8} {}",
            p.id,
            p.subscriber_id,
            p.amount,
            format_date(p.date),
            p.method,
            p.comment
        );
    }
    Ok(())
}

fn print_readings(app: &App, subscriber_id: &str) -> Result<()> {
    let mut readings = app.readings(subscriber_id)?;
    if readings.is_empty() {
        println!("No meter readings for {}", subscriber_id);
        return Ok(());
    }
    readings.sort_by(|a, b| a.date.cmp(&b.date));

    for r in &readings {
        println!(
            "{:<12} {:>10.1}{}",
            format_date(r.date),
            r.value,
            if r.abnormal { "  ABNORMAL" } else { "" }
        );
    }
    Ok(())
}
