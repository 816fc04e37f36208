use serde::Deserialize;
use std::env;
use stockroom_core::LedgerLimits;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

fn default_host() -> String { "0.0.0.0".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }
fn default_busy_timeout() -> u64 { 5 }

impl DatabaseConfig {
    /// A private in-memory database, mostly for tests and local experiments.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: default_acquire_timeout(),
            busy_timeout_seconds: default_busy_timeout(),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_transaction_limit")]
    pub default_transaction_limit: i64,
    #[serde(default = "default_max_transaction_limit")]
    pub max_transaction_limit: i64,
}

fn default_transaction_limit() -> i64 { 50 }
fn default_max_transaction_limit() -> i64 { 500 }

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_transaction_limit: default_transaction_limit(),
            max_transaction_limit: default_max_transaction_limit(),
        }
    }
}

impl LedgerConfig {
    pub fn limits(&self) -> LedgerLimits {
        LedgerLimits {
            default_transaction_limit: self.default_transaction_limit,
            max_transaction_limit: self.max_transaction_limit,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `STOCKROOM_DATABASE__URL=sqlite::memory:` sets `database.url`
            .add_source(config::Environment::with_prefix("STOCKROOM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
