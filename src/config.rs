use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::Address;

use crate::error::{ConfigError, SigningError};
use crate::models::TokenRegistry;

/// Environment variable holding the operator key. Never read from the config file.
pub const PRIVATE_KEY_ENV: &str = "RELAYER_PRIVATE_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub relay: RelayConfig,
    pub scan: ScanConfig,
    #[serde(default = "default_tokens")]
    pub tokens: BTreeMap<String, String>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// How often to poll for a receipt while waiting
    pub receipt_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Custodial relay contract being watched; also the `to` of every relay transaction
    pub watched_address: String,
    /// Where detected funds are forwarded
    pub destination_address: String,
    /// EIP-155 chain id used when signing
    pub chain_id: u64,
    /// Total submission attempts per deposit
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub retry_delay_seconds: u64,
    /// Upper bound on waiting for a receipt after submission
    pub receipt_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Seconds between polling cycles
    pub poll_interval_seconds: u64,
    /// Blocks behind the tip inspected per cycle
    pub window_blocks: u64,
    /// Initial cursor value; blocks at or below it are never scanned
    pub start_block: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

fn default_tokens() -> BTreeMap<String, String> {
    let mut tokens = BTreeMap::new();
    tokens.insert("USDT".to_string(), "0xc2132D05D31c914a87C6611C10748AEb04B58e8F".to_string());
    tokens.insert("USDC".to_string(), "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174".to_string());
    tokens
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            relay: RelayConfig::default(),
            scan: ScanConfig::default(),
            tokens: default_tokens(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://polygon-rpc.com/".to_string(),
            timeout_seconds: 30,
            receipt_poll_interval_ms: 2000,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            watched_address: String::new(),
            destination_address: String::new(),
            chain_id: 137,
            max_attempts: 5,
            retry_delay_seconds: 5,
            receipt_timeout_seconds: 120,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 60,
            window_blocks: 100,
            start_block: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value }),
        Err(_) => Ok(None),
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingValue(key.to_string()));
    }
    value.trim().parse().map_err(|_| ConfigError::InvalidAddress {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl AppConfig {
    /// Load configuration from file and environment variables.
    /// Environment variables take precedence over file values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = env::var("POLYGON_RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        if let Some(timeout) = parse_env("RPC_TIMEOUT_SECONDS")? {
            self.rpc.timeout_seconds = timeout;
        }

        if let Ok(watched) = env::var("WATCHED_ADDRESS") {
            self.relay.watched_address = watched;
        }
        if let Ok(destination) = env::var("DESTINATION_ADDRESS") {
            self.relay.destination_address = destination;
        }
        if let Some(chain_id) = parse_env("CHAIN_ID")? {
            self.relay.chain_id = chain_id;
        }
        if let Some(attempts) = parse_env("RELAY_MAX_ATTEMPTS")? {
            self.relay.max_attempts = attempts;
        }
        if let Some(delay) = parse_env("RELAY_RETRY_DELAY_SECONDS")? {
            self.relay.retry_delay_seconds = delay;
        }
        if let Some(timeout) = parse_env("RECEIPT_TIMEOUT_SECONDS")? {
            self.relay.receipt_timeout_seconds = timeout;
        }

        if let Some(interval) = parse_env("POLL_INTERVAL_SECONDS")? {
            self.scan.poll_interval_seconds = interval;
        }
        if let Some(window) = parse_env("SCAN_WINDOW_BLOCKS")? {
            self.scan.window_blocks = window;
        }
        if let Some(start) = parse_env("START_BLOCK")? {
            self.scan.start_block = start;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc.endpoint.starts_with("http://") && !self.rpc.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.rpc.endpoint.clone()));
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "rpc.timeout_seconds".to_string(),
                value: self.rpc.timeout_seconds.to_string(),
            });
        }

        let watched = parse_address("relay.watched_address", &self.relay.watched_address)?;
        let destination = parse_address("relay.destination_address", &self.relay.destination_address)?;
        if watched == destination {
            return Err(ConfigError::InvalidValue {
                key: "relay.destination_address".to_string(),
                value: "must differ from relay.watched_address".to_string(),
            });
        }

        if self.relay.max_attempts == 0 || self.relay.max_attempts > 20 {
            return Err(ConfigError::InvalidValue {
                key: "relay.max_attempts".to_string(),
                value: self.relay.max_attempts.to_string(),
            });
        }

        if self.relay.receipt_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "relay.receipt_timeout_seconds".to_string(),
                value: "0".to_string(),
            });
        }

        if self.scan.poll_interval_seconds == 0 || self.scan.poll_interval_seconds > 3600 {
            return Err(ConfigError::InvalidValue {
                key: "scan.poll_interval_seconds".to_string(),
                value: self.scan.poll_interval_seconds.to_string(),
            });
        }

        if self.scan.window_blocks == 0 || self.scan.window_blocks > 10_000 {
            return Err(ConfigError::InvalidValue {
                key: "scan.window_blocks".to_string(),
                value: self.scan.window_blocks.to_string(),
            });
        }

        TokenRegistry::from_symbols(&self.tokens)?;

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: self.logging.format.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

/// Immutable runtime context built once at startup and shared by
/// the classifier, the executor and the scan loop.
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub watched_address: Address,
    pub destination_address: Address,
    pub tokens: TokenRegistry,
    pub signer: PrivateKeySigner,
    pub chain_id: u64,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
    pub window_blocks: u64,
    pub start_block: u64,
}

impl RelayContext {
    /// Build from a validated config, reading the operator key from the environment
    pub fn from_env(config: &AppConfig) -> Result<Arc<Self>, crate::error::RelayerError> {
        let key = env::var(PRIVATE_KEY_ENV).map_err(|_| ConfigError::MissingValue(PRIVATE_KEY_ENV.to_string()))?;
        let signer = parse_signer(&key)?;
        Ok(Arc::new(Self::new(config, signer)?))
    }

    pub fn new(config: &AppConfig, signer: PrivateKeySigner) -> Result<Self, ConfigError> {
        Ok(Self {
            watched_address: parse_address("relay.watched_address", &config.relay.watched_address)?,
            destination_address: parse_address("relay.destination_address", &config.relay.destination_address)?,
            tokens: TokenRegistry::from_symbols(&config.tokens)?,
            signer,
            chain_id: config.relay.chain_id,
            max_attempts: config.relay.max_attempts,
            retry_delay: Duration::from_secs(config.relay.retry_delay_seconds),
            receipt_timeout: Duration::from_secs(config.relay.receipt_timeout_seconds),
            poll_interval: Duration::from_secs(config.scan.poll_interval_seconds),
            window_blocks: config.scan.window_blocks,
            start_block: config.scan.start_block,
        })
    }

    /// Account that signs and pays for relay transactions
    pub fn operator(&self) -> Address {
        self.signer.address()
    }
}

pub fn parse_signer(key: &str) -> Result<PrivateKeySigner, SigningError> {
    let trimmed = key.trim();
    let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex_key
        .parse::<PrivateKeySigner>()
        .map_err(|e| SigningError::InvalidKey(e.to_string()))
}
