//! Configuration loader. Merges env vars, .env file, and config.toml.

use std::net::SocketAddr;
use std::path::Path;

use common::{Error, GatewayConfig};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const MAX_FETCH_TIMEOUT_SECS: u64 = 300;
const MAX_WINDOW_SECS: u64 = 86_400;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_positive_usize(raw: &str, env_name: &str) -> Result<usize, Error> {
    parse_positive_u64(raw, env_name).map(|v| v as usize)
}

fn validate_config(config: &GatewayConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.server.bind_addr.parse::<SocketAddr>().is_err() {
        issues.push(format!(
            "server.bind_addr is not a socket address: {}",
            config.server.bind_addr
        ));
    }

    if !config.providers.openweather_enabled() && !config.providers.weatherapi_enabled() {
        issues.push("at least one of OPENWEATHER_API_KEY / WEATHERAPI_KEY is required".into());
    }
    if config.providers.fetch_timeout_secs == 0
        || config.providers.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS
    {
        issues.push(format!(
            "providers.fetch_timeout_secs must be in 1..={MAX_FETCH_TIMEOUT_SECS}"
        ));
    }
    if config.providers.openweather_base_url.trim().is_empty() {
        issues.push("providers.openweather_base_url must not be empty".into());
    }
    if config.providers.weatherapi_base_url.trim().is_empty() {
        issues.push("providers.weatherapi_base_url must not be empty".into());
    }

    if config.rate_limit.max_requests == 0 {
        issues.push("rate_limit.max_requests must be > 0".into());
    }
    if config.rate_limit.window_secs == 0 || config.rate_limit.window_secs > MAX_WINDOW_SECS {
        issues.push(format!(
            "rate_limit.window_secs must be in 1..={MAX_WINDOW_SECS}"
        ));
    }

    if config.history.capacity == 0 {
        issues.push("history.capacity must be > 0".into());
    }
    if config.history.view_limit == 0 {
        issues.push("history.view_limit must be > 0".into());
    }
    if config.history.trend_window == 0 {
        issues.push("history.trend_window must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load gateway configuration from environment and optional config file.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, Error> {
    // 1. Load .env file from the working directory or its parents.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = GatewayConfig::default();

    // 3. Replace with the config file if it exists. An explicit path must exist.
    let config_path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
    } else if path.is_some() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            config_path.display()
        )));
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(key) = std::env::var("OPENWEATHER_API_KEY") {
        config.providers.openweather_api_key = key;
    }
    if let Ok(key) = std::env::var("WEATHERAPI_KEY") {
        config.providers.weatherapi_key = key;
    }
    if let Ok(url) = std::env::var("OPENWEATHER_BASE_URL") {
        config.providers.openweather_base_url = url;
    }
    if let Ok(url) = std::env::var("WEATHERAPI_BASE_URL") {
        config.providers.weatherapi_base_url = url;
    }
    if let Ok(addr) = std::env::var("GATEWAY_BIND_ADDR") {
        config.server.bind_addr = addr;
    }
    if let Ok(raw) = std::env::var("FETCH_TIMEOUT_SECS") {
        config.providers.fetch_timeout_secs = parse_positive_u64(&raw, "FETCH_TIMEOUT_SECS")?;
    }
    if let Ok(raw) = std::env::var("RATE_LIMIT_MAX_REQUESTS") {
        config.rate_limit.max_requests = parse_positive_usize(&raw, "RATE_LIMIT_MAX_REQUESTS")?;
    }
    if let Ok(raw) = std::env::var("RATE_LIMIT_WINDOW_SECS") {
        config.rate_limit.window_secs = parse_positive_u64(&raw, "RATE_LIMIT_WINDOW_SECS")?;
    }
    if let Ok(raw) = std::env::var("HISTORY_CAPACITY") {
        config.history.capacity = parse_positive_usize(&raw, "HISTORY_CAPACITY")?;
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}
