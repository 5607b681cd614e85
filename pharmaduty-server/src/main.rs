//! Pharmaduty server - command-line entry point.
//!
//! Parses configuration from arguments and environment, builds the
//! roster store (Redis REST in production, in-memory with optional
//! seeding for local work), and serves the gateway's HTTP surface until
//! interrupted.

mod error;
mod seed;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pharmaduty::gateway::{DirectoryGateway, GatewayConfig, RateLimitConfig};
use pharmaduty::schedule::ScheduleConfig;
use pharmaduty::server::{serve, AppState};
use pharmaduty::store::{MemoryStore, RedisRestConfig, RedisRestStore, RosterStore};

use crate::error::CliError;

/// On-duty pharmacy directory server.
#[derive(Debug, Parser)]
#[command(name = "pharmaduty", version, about)]
struct Args {
    /// Address to bind the HTTP listener to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Redis REST endpoint URL; omit to run on the in-memory store.
    #[arg(long, env = "PHARMADUTY_REDIS_URL")]
    redis_url: Option<String>,

    /// Redis REST bearer token.
    #[arg(long, env = "PHARMADUTY_REDIS_TOKEN", hide_env_values = true)]
    redis_token: Option<String>,

    /// Seed the in-memory store from a JSON file mapping date keys to
    /// pharmacy arrays. Only valid without --redis-url.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Requests allowed per client per window.
    #[arg(long, env = "PHARMADUTY_RATE_LIMIT", default_value_t = 6)]
    rate_limit_requests: u64,

    /// Rate-limit window length in seconds.
    #[arg(long, env = "PHARMADUTY_RATE_WINDOW_SECS", default_value_t = 60)]
    rate_limit_window_secs: u64,

    /// UTC offset of the schedule's wall clock, in hours.
    #[arg(long, env = "PHARMADUTY_UTC_OFFSET", default_value_t = 3)]
    utc_offset_hours: i32,

    /// Hour of the daily roster handover.
    #[arg(long, env = "PHARMADUTY_CUTOFF_HOUR", default_value_t = 8)]
    cutoff_hour: u32,

    /// Minute of the daily roster handover.
    #[arg(long, env = "PHARMADUTY_CUTOFF_MINUTE", default_value_t = 30)]
    cutoff_minute: u32,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    run(args).await
}

async fn run(args: Args) -> Result<(), CliError> {
    let schedule = ScheduleConfig::new(args.utc_offset_hours, args.cutoff_hour, args.cutoff_minute)?;

    let store = build_store(&args).await?;

    let gateway = Arc::new(DirectoryGateway::new(
        store,
        GatewayConfig {
            schedule,
            rate_limit: RateLimitConfig {
                max_requests: args.rate_limit_requests,
                window: Duration::from_secs(args.rate_limit_window_secs),
            },
        },
    ));

    println!("Pharmaduty Server v{}", pharmaduty::VERSION);
    println!("====================");
    println!();
    println!("Bind:       {}", args.bind);
    println!(
        "Store:      {}",
        if args.redis_url.is_some() {
            "Redis REST"
        } else {
            "in-memory"
        }
    );
    println!(
        "Rate limit: {} requests / {}s",
        args.rate_limit_requests, args.rate_limit_window_secs
    );
    println!(
        "Schedule:   UTC{:+} cutoff {:02}:{:02}",
        args.utc_offset_hours, args.cutoff_hour, args.cutoff_minute
    );
    println!();

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!(bind = %args.bind, "listening");

    serve(listener, AppState::new(gateway), shutdown_signal()).await?;

    info!("server stopped");
    Ok(())
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "failed to install shutdown handler"),
    }
}

/// Build the configured roster store.
async fn build_store(args: &Args) -> Result<Arc<dyn RosterStore>, CliError> {
    match (&args.redis_url, &args.redis_token) {
        (Some(url), Some(token)) => {
            if args.seed.is_some() {
                return Err(CliError::Config(
                    "--seed only applies to the in-memory store".to_string(),
                ));
            }
            let store = RedisRestStore::new(RedisRestConfig::new(url, token))?;
            Ok(Arc::new(store))
        }
        (Some(_), None) | (None, Some(_)) => Err(CliError::Config(
            "both --redis-url and --redis-token are required for the Redis store".to_string(),
        )),
        (None, None) => {
            let store = Arc::new(MemoryStore::new());
            if let Some(path) = &args.seed {
                let count = seed::seed_from_file(store.as_ref(), path).await?;
                info!(count, path = %path.display(), "seeded in-memory store");
            }
            Ok(store)
        }
    }
}
