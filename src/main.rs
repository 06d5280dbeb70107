//! weather-gateway: multi-provider weather aggregation service.
//!
//! Single-binary Tokio application that:
//! 1. Fans out current-conditions requests to every configured provider
//! 2. Normalises and averages the readings that came back
//! 3. Keeps a bounded rolling history and derives temperature insights
//! 4. Serves all of it over HTTP behind a per-client sliding-window limit

mod config;
mod http;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use common::{Error, GatewayConfig};
use openweather_client::OpenWeatherClient;
use pipeline::{HistoryStore, RateLimiter, ServiceSettings, SharedFetcher, WeatherService};
use weatherapi_client::WeatherApiClient;

/// Multi-provider weather gateway
#[derive(Parser)]
#[command(name = "weather-gateway", about = "Multi-provider weather gateway")]
struct Cli {
    /// Path to a TOML config file (default: ./config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen address, e.g. 127.0.0.1:8080.
    #[arg(long)]
    bind: Option<String>,

    /// Run a single analytics pass for this city, print it, and exit.
    #[arg(long)]
    city: Option<String>,
}

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLI_IDENTITY: &str = "cli";

fn build_fetchers(cfg: &GatewayConfig) -> Result<Vec<SharedFetcher>, Error> {
    let mut fetchers: Vec<SharedFetcher> = Vec::new();

    if cfg.providers.openweather_enabled() {
        fetchers.push(Arc::new(OpenWeatherClient::with_base_url(
            cfg.providers.openweather_api_key.clone(),
            cfg.providers.openweather_base_url.clone(),
        )?));
    }
    if cfg.providers.weatherapi_enabled() {
        fetchers.push(Arc::new(WeatherApiClient::with_base_url(
            cfg.providers.weatherapi_key.clone(),
            cfg.providers.weatherapi_base_url.clone(),
        )?));
    }

    Ok(fetchers)
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "weather_gateway=info,pipeline=info,openweather_client=info,weatherapi_client=info"
                    .into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("🌤️  Weather gateway starting up...");

    // Load configuration.
    let mut cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(bind) = cli.bind {
        cfg.server.bind_addr = bind;
    }

    info!(
        "Providers: openweather={} weatherapi={}",
        cfg.providers.openweather_enabled(),
        cfg.providers.weatherapi_enabled()
    );
    info!(
        "Limits: {} req/{}s per client, history={} records, fetch timeout={}s",
        cfg.rate_limit.max_requests,
        cfg.rate_limit.window_secs,
        cfg.history.capacity,
        cfg.providers.fetch_timeout_secs
    );

    let fetchers = match build_fetchers(&cfg) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to build provider clients: {}", e);
            std::process::exit(1);
        }
    };

    let history = Arc::new(HistoryStore::with_capacity(cfg.history.capacity));
    let limiter = Arc::new(RateLimiter::with_limits(
        cfg.rate_limit.max_requests,
        Duration::from_secs(cfg.rate_limit.window_secs),
    ));
    let service = Arc::new(WeatherService::new(
        fetchers,
        history,
        limiter.clone(),
        ServiceSettings::from_config(&cfg),
    ));

    // ── One-shot mode ────────────────────────────────────────────────
    if let Some(city) = cli.city {
        info!("🔍 One-shot analytics for {}", city);
        match service.get_analytics(CLI_IDENTITY, &city).await {
            Ok(analysis) => match serde_json::to_string_pretty(&analysis) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    error!("Failed to render analysis: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                error!("Analytics failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // ── HTTP gateway ─────────────────────────────────────────────────
    let listener = match TcpListener::bind(&cfg.server.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", cfg.server.bind_addr, e);
            std::process::exit(1);
        }
    };

    let server_handle = tokio::spawn(http::run_http_server(listener, service.clone()));

    // Heartbeat: stats plus idle rate-limit window purge.
    let hb_service = service.clone();
    let hb_limiter = limiter.clone();
    let heartbeat_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let purged = hb_limiter.purge_idle(std::time::Instant::now());
            let status = hb_service.status();
            info!(
                "HEARTBEAT: providers={} history={}/{} clients={} purged={}",
                status.providers.len(),
                status.history_records,
                status.history_capacity,
                status.rate_limited_identities,
                purged
            );
        }
    });

    // ── Wait for shutdown ────────────────────────────────────────────
    info!("🚀 Weather gateway is running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = server_handle => {
            error!("HTTP server exited: {:?}", r);
        }
        r = heartbeat_handle => {
            error!("Heartbeat task exited: {:?}", r);
        }
    }

    info!("Weather gateway shut down.");
}
