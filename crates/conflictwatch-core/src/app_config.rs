use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub seed_path: Option<PathBuf>,
    pub monitor_interval_secs: u64,
    pub analyzer_url: Option<String>,
    pub analyzer_api_key: Option<String>,
    pub analyzer_timeout_secs: u64,
    pub subscriber_buffer: usize,
    pub ws_send_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("seed_path", &self.seed_path)
            .field("monitor_interval_secs", &self.monitor_interval_secs)
            .field("analyzer_url", &self.analyzer_url)
            .field(
                "analyzer_api_key",
                &self.analyzer_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("analyzer_timeout_secs", &self.analyzer_timeout_secs)
            .field("subscriber_buffer", &self.subscriber_buffer)
            .field("ws_send_timeout_secs", &self.ws_send_timeout_secs)
            .finish()
    }
}
