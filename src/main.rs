// bandwidth-gate: meant to be run periodically, e.g. from cron
//   */15 * * * * bandwidth-gate --sqlite-file usage.sqlite3 \
//       --transmission-url http://localhost:9091 --daily-limit 10g

mod config;
mod limiter;
mod rpc;
mod store;
mod usage;
mod utils;

use clap::Parser;
use config::LimiterConfig;
use limiter::{Limiter, LimiterError, RunReport};
use rpc::{EnforcementMode, TransmissionClient};
use std::path::PathBuf;
use std::sync::Arc;
use store::SampleStore;
use tracing_subscriber::EnvFilter;
use usage::{Decision, DeltaKind, LimitConfig};
use utils::constants::{DEFAULT_RETENTION, DEFAULT_RPC_TIMEOUT_SECS};
use utils::format::format_bytes;
use utils::logger::Logger;
use utils::validation::InputValidator;

/// bandwidth-gate - Transmission data cap enforcement
#[derive(Parser, Debug)]
#[clap(author, version, about = "Track Transmission transfer usage and pause transfers over a daily, weekly or monthly cap")]
pub struct Cli {
    /// SQLite file holding usage samples (created if missing)
    #[clap(long)]
    sqlite_file: PathBuf,

    /// Transmission RPC URL, e.g. http://localhost:9091
    #[clap(long)]
    transmission_url: String,

    /// Env file providing TRANSMISSION_USERNAME and TRANSMISSION_PASSWORD
    #[clap(long)]
    env_file: Option<PathBuf>,

    /// Cap for the current UTC day (e.g. 10g, 500M)
    #[clap(long, value_parser = InputValidator::parse_size)]
    daily_limit: Option<u64>,

    /// Cap for the current week, Monday to Monday UTC
    #[clap(long, value_parser = InputValidator::parse_size)]
    weekly_limit: Option<u64>,

    /// Cap for the current calendar month UTC
    #[clap(long, value_parser = InputValidator::parse_size)]
    monthly_limit: Option<u64>,

    /// How transfers are disabled once a cap is reached
    #[clap(long, value_enum, default_value_t = EnforcementMode::AltSpeed)]
    mode: EnforcementMode,

    /// Transmission RPC timeout in seconds
    #[clap(long, default_value_t = DEFAULT_RPC_TIMEOUT_SECS)]
    timeout: u64,

    /// Delete samples older than the longest configured window
    #[clap(long)]
    clear_old_data: bool,

    /// How long --clear-old-data keeps samples when no limit is set (e.g. 35d, 8w)
    #[clap(long, default_value = DEFAULT_RETENTION, value_parser = InputValidator::parse_duration)]
    retention: chrono::Duration,

    /// Enable debug logging
    #[clap(long)]
    debug: bool,

    /// Suppress the usage summary
    #[clap(long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli).await {
        Ok((report, limits)) => {
            if !cli.quiet {
                print_report(&report, &limits);
            }
        }
        Err(e) => {
            tracing::error!("{}", e);
            report_error(&e, &cli);
            std::process::exit(1);
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("bandwidth_gate=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bandwidth_gate=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<(RunReport, LimitConfig), LimiterError> {
    let config = LimiterConfig::from_cli(cli)?;

    if config.limits.is_empty() {
        tracing::warn!("No limit configured; transfers will always be enabled");
    }

    let client = TransmissionClient::new(
        &config.transmission_url,
        config.credentials.clone(),
        config.mode,
        config.rpc_timeout,
    )
    .map_err(LimiterError::RemoteFetch)?;
    tracing::debug!("Using Transmission RPC endpoint {}", client.endpoint());

    let store = Arc::new(SampleStore::open(&config.database_path).await?);

    let mut limiter = Limiter::new(store.clone(), Arc::new(client), config.limits);
    if config.clear_old_data {
        limiter = limiter.with_purge(config.retention);
    }

    let result = limiter.run().await;
    store.close().await;

    Ok((result?, config.limits))
}

fn print_report(report: &RunReport, limits: &LimitConfig) {
    Logger::section("Transfer usage");
    for total in &report.totals {
        let used = format_bytes(total.bytes);
        let value = match limits.limit_for(total.kind) {
            Some(limit) => format!("{} / {} since {}", used, format_bytes(limit), total.start.format("%Y-%m-%d")),
            None => format!("{} since {}", used, total.start.format("%Y-%m-%d")),
        };
        Logger::detail(&total.kind.to_string(), &value);
    }

    Logger::detail(
        "counter",
        &format!(
            "{} (+{} this run)",
            format_bytes(report.sample.cumulative_bytes),
            format_bytes(report.sample.delta_bytes)
        ),
    );

    if report.clock_skew {
        Logger::warning("Clock did not advance since the last sample; check the system time");
    }
    if report.delta_kind == DeltaKind::Baseline {
        Logger::info("First sample recorded; usage is counted from the next run");
    }
    if report.delta_kind == DeltaKind::Reset {
        Logger::warning("Transfer counter went backwards; counted the new reading as usage");
    }
    if let Some(purged) = report.purged.filter(|n| *n > 0) {
        Logger::info(&format!("Removed {} old samples", purged));
    }

    match report.decision {
        Decision::Enable => Logger::success("Within limits: transfers enabled"),
        Decision::Disable => {
            let windows: Vec<String> = report.exceeded.iter().map(|k| k.to_string()).collect();
            Logger::warning(&format!("Limit reached ({}): transfers disabled", windows.join(", ")));
        }
    }
}

fn report_error(error: &LimiterError, cli: &Cli) {
    match error {
        LimiterError::RemoteFetch(_) => Logger::error_with_hint(
            &error.to_string(),
            &format!("Is Transmission reachable at {}?", cli.transmission_url),
        ),
        LimiterError::Storage(_) => Logger::error_with_hint(
            &error.to_string(),
            &format!("Check that {} is a writable SQLite file", cli.sqlite_file.display()),
        ),
        LimiterError::Enforcement { .. } => Logger::error_with_hint(
            &error.to_string(),
            "Usage was recorded; enforcement is retried on the next run",
        ),
        LimiterError::Config(_) => Logger::error(&error.to_string()),
    }
}
