use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "CONFLICTWATCH_ENV"));
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.seed_path.is_none());
    assert_eq!(cfg.monitor_interval_secs, 30);
    assert!(cfg.analyzer_url.is_none());
    assert!(cfg.analyzer_api_key.is_none());
    assert_eq!(cfg.analyzer_timeout_secs, 10);
    assert_eq!(cfg.subscriber_buffer, 64);
    assert_eq!(cfg.ws_send_timeout_secs, 5);
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("CONFLICTWATCH_ENV", "production");
    map.insert("CONFLICTWATCH_BIND_ADDR", "127.0.0.1:8080");
    map.insert("CONFLICTWATCH_SEED_PATH", "./config/events.yaml");
    map.insert("CONFLICTWATCH_MONITOR_INTERVAL_SECS", "5");
    map.insert("CONFLICTWATCH_ANALYZER_URL", "http://analyzer.local");
    map.insert("CONFLICTWATCH_ANALYZER_API_KEY", "secret");
    map.insert("CONFLICTWATCH_SUBSCRIBER_BUFFER", "8");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(
        cfg.seed_path.as_deref(),
        Some(std::path::Path::new("./config/events.yaml"))
    );
    assert_eq!(cfg.monitor_interval_secs, 5);
    assert_eq!(cfg.analyzer_url.as_deref(), Some("http://analyzer.local"));
    assert_eq!(cfg.subscriber_buffer, 8);
}

#[test]
fn build_app_config_treats_blank_optional_as_unset() {
    let mut map = HashMap::new();
    map.insert("CONFLICTWATCH_ANALYZER_URL", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.analyzer_url.is_none());
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = HashMap::new();
    map.insert("CONFLICTWATCH_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CONFLICTWATCH_BIND_ADDR"),
        "expected InvalidEnvVar(CONFLICTWATCH_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_interval() {
    let mut map = HashMap::new();
    map.insert("CONFLICTWATCH_MONITOR_INTERVAL_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CONFLICTWATCH_MONITOR_INTERVAL_SECS"),
        "expected InvalidEnvVar(CONFLICTWATCH_MONITOR_INTERVAL_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_timeout() {
    let mut map = HashMap::new();
    map.insert("CONFLICTWATCH_ANALYZER_TIMEOUT_SECS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CONFLICTWATCH_ANALYZER_TIMEOUT_SECS"),
        "expected InvalidEnvVar(CONFLICTWATCH_ANALYZER_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn debug_output_redacts_api_key() {
    let mut map = HashMap::new();
    map.insert("CONFLICTWATCH_ANALYZER_API_KEY", "super-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("[redacted]"));
}
