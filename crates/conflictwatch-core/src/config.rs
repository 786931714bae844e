use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("CONFLICTWATCH_ENV", "development"))?;
    let bind_addr = parse_addr("CONFLICTWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CONFLICTWATCH_LOG_LEVEL", "info");
    let seed_path = optional("CONFLICTWATCH_SEED_PATH").map(PathBuf::from);

    let monitor_interval_secs = parse_positive_u64("CONFLICTWATCH_MONITOR_INTERVAL_SECS", "30")?;
    let analyzer_url = optional("CONFLICTWATCH_ANALYZER_URL");
    let analyzer_api_key = optional("CONFLICTWATCH_ANALYZER_API_KEY");
    let analyzer_timeout_secs = parse_positive_u64("CONFLICTWATCH_ANALYZER_TIMEOUT_SECS", "10")?;
    let subscriber_buffer = parse_positive_usize("CONFLICTWATCH_SUBSCRIBER_BUFFER", "64")?;
    let ws_send_timeout_secs = parse_positive_u64("CONFLICTWATCH_WS_SEND_TIMEOUT_SECS", "5")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        seed_path,
        monitor_interval_secs,
        analyzer_url,
        analyzer_api_key,
        analyzer_timeout_secs,
        subscriber_buffer,
        ws_send_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CONFLICTWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
