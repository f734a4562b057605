use std::net::SocketAddr;

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
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub cron_secret: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub claude_model: String,
    pub openai_model: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub ingest_request_timeout_secs: u64,
    pub ingest_user_agent: String,
    pub ingest_hn_item_limit: usize,
    pub ingest_inter_source_delay_ms: u64,
    pub analyze_default_limit: i64,
    pub analyze_overfetch_factor: i64,
    pub analyze_inter_call_delay_ms: u64,
    pub analyze_request_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("claude_model", &self.claude_model)
            .field("openai_model", &self.openai_model)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "ingest_request_timeout_secs",
                &self.ingest_request_timeout_secs,
            )
            .field("ingest_user_agent", &self.ingest_user_agent)
            .field("ingest_hn_item_limit", &self.ingest_hn_item_limit)
            .field(
                "ingest_inter_source_delay_ms",
                &self.ingest_inter_source_delay_ms,
            )
            .field("analyze_default_limit", &self.analyze_default_limit)
            .field("analyze_overfetch_factor", &self.analyze_overfetch_factor)
            .field(
                "analyze_inter_call_delay_ms",
                &self.analyze_inter_call_delay_ms,
            )
            .field(
                "analyze_request_timeout_secs",
                &self.analyze_request_timeout_secs,
            )
            .finish()
    }
}
