//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `Default` implementations and `serde` defaults
//! 2. **Config file**: TOML file named by the `RPC_MONITOR_CONFIG` env var
//!    (`config/config.toml` when unset); a missing file is not an error
//! 3. **Environment variables**: `RPC_MONITOR__<SECTION>__<KEY>` overrides,
//!    e.g. `RPC_MONITOR__SERVER__PORT=9000`. `polling.methods` accepts a
//!    comma-separated list.
//!
//! # Configuration Sections
//!
//! - [`EndpointConfig`]: target JSON-RPC endpoint and per-call timeout
//! - [`RateLimitConfig`]: sliding-window limits for outbound calls
//! - [`PollingConfig`]: poll interval, window size and polled methods
//! - [`ServerConfig`]: push server listen address
//! - [`LoggingConfig`]: log level and format
//!
//! # Example
//!
//! ```toml
//! [rpc]
//! endpoint_url = "https://eth1.lava.build"
//! timeout_ms = 10000
//!
//! [rate_limit]
//! max_requests = 300
//! window_ms = 10000
//!
//! [polling]
//! interval_ms = 5000
//! window_capacity = 100
//! methods = ["eth_blockNumber", "eth_chainId", "eth_syncing"]
//!
//! [server]
//! port = 8080
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};

use crate::{
    poller::{PollerConfig, RpcCall},
    rate_limiter::RateLimiterConfig,
    rpc::{RpcClientConfig, DEFAULT_ENDPOINT},
    store::DEFAULT_WINDOW_CAPACITY,
    types::DEFAULT_POLLED_METHODS,
};

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "RPC_MONITOR_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

const ENV_PREFIX: &str = "RPC_MONITOR";

/// Target endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// JSON-RPC endpoint URL. Must be `http` or `https`.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Per-call timeout in milliseconds. Defaults to `10000`.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Outbound rate limit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Calls allowed inside one window. Defaults to `300`.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in milliseconds. Defaults to `10000`.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// How long a call may wait for a slot, in milliseconds. Defaults to twice
    /// the window.
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
}

fn default_max_requests() -> usize {
    300
}

fn default_window_ms() -> u64 {
    10_000
}

/// Polling loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Milliseconds between cycles. Defaults to `5000`.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Call records kept for aggregation. Defaults to `100`.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Methods issued on every cycle, with empty params.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_methods() -> Vec<String> {
    DEFAULT_POLLED_METHODS.iter().map(|m| (*m).to_string()).collect()
}

/// Push server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind to. Defaults to `0.0.0.0`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on. Must be greater than 0. Defaults to `8080`.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset. Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rpc: EndpointConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { endpoint_url: default_endpoint_url(), timeout_ms: default_timeout_ms() }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            max_wait_ms: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            window_capacity: default_window_capacity(),
            methods: default_methods(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_port() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or a value has the
    /// wrong type.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("polling.methods")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from [`DEFAULT_CONFIG_PATH`], or the file named by
    /// `RPC_MONITOR_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string for the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        let endpoint = url::Url::parse(&self.rpc.endpoint_url)
            .map_err(|e| format!("Invalid endpoint URL {}: {e}", self.rpc.endpoint_url))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(format!(
                "Endpoint URL must use http or https: {}",
                self.rpc.endpoint_url
            ));
        }

        if self.rpc.timeout_ms == 0 {
            return Err("RPC timeout must be greater than 0".to_string());
        }

        if self.rate_limit.window_ms == 0 {
            return Err("Rate limit window must be greater than 0".to_string());
        }

        if self.polling.interval_ms == 0 {
            return Err("Polling interval must be greater than 0".to_string());
        }

        if self.polling.window_capacity == 0 {
            return Err("Call record window capacity must be greater than 0".to_string());
        }

        if self.polling.methods.is_empty() {
            return Err("At least one polled method must be configured".to_string());
        }

        if let Some(method) = self.polling.methods.iter().find(|m| m.trim().is_empty()) {
            return Err(format!("Invalid polled method name: {method:?}"));
        }

        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }

    #[must_use]
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        let config = RateLimiterConfig::new(
            self.rate_limit.max_requests,
            Duration::from_millis(self.rate_limit.window_ms),
        );
        match self.rate_limit.max_wait_ms {
            Some(max_wait_ms) => config.with_max_wait(Duration::from_millis(max_wait_ms)),
            None => config,
        }
    }

    #[must_use]
    pub fn rpc_client_config(&self) -> RpcClientConfig {
        RpcClientConfig {
            endpoint: self.rpc.endpoint_url.clone(),
            timeout: Duration::from_millis(self.rpc.timeout_ms),
        }
    }

    #[must_use]
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.polling.interval_ms),
            window_capacity: self.polling.window_capacity,
            calls: self.polling.methods.iter().map(|m| RpcCall::new(m.trim())).collect(),
        }
    }

    /// Returns the push server's socket address.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.port).parse().map_err(|_| {
            format!("Invalid socket address: {}:{}", self.server.bind_address, self.server.port)
        })
    }
}
