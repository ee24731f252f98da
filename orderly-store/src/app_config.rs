use std::env;
use std::path::Path;
use std::time::Duration;

use orderly_core::TopicConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub services: ServicesConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    #[serde(default)]
    pub events: TopicConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

/// Base URLs of the remote services.
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub inventory_url: String,
    pub product_url: String,
    pub notification_url: String,
    pub payment_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

impl ServicesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub order_ttl_secs: u64,
}

impl CacheConfig {
    pub fn order_ttl(&self) -> Duration {
        Duration::from_secs(self.order_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    pub workers: usize,
    pub timeout_secs: u64,
}

impl BatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"), environment())
    }

    /// Layer `default`, the `RUN_MODE` file, `local` and then the environment.
    pub fn load_from(dir: &Path, env_source: config::Environment) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let s = config::Config::builder()
            .add_source(config::File::with_name(&file("default")))
            .add_source(config::File::with_name(&file(&run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&file("local")).required(false))
            .add_source(env_source)
            .build()?;

        s.try_deserialize()
    }
}

/// `ORDERLY__BATCH__WORKERS=4` sets `batch.workers`.
pub fn environment() -> config::Environment {
    config::Environment::with_prefix("ORDERLY")
        .prefix_separator("__")
        .separator("__")
}
