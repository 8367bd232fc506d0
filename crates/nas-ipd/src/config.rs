//! Configuration file support for nas-ipd
//!
//! Loads and validates the daemon configuration from TOML.
//! Default location: /etc/opx/nas-ipd.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use nas_ip_tool::ToolConfig;
use nas_os_common::{NasError, NasResult};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/opx/nas-ipd.toml";

/// Event bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Redis server carrying the observed-state channels
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Channel publishing interface create/set/delete events
    #[serde(default = "default_interface_topic")]
    pub interface_topic: String,

    /// Channel publishing IPv6 address events
    #[serde(default = "default_ipv6_topic")]
    pub ipv6_topic: String,
}

/// DAD recovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DadConfig {
    /// Delay between the first recorded failure and the retry pass
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives (`EnvFilter` syntax) used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete nas-ipd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NasIpdConfig {
    #[serde(default)]
    pub tools: ToolConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub dad: DadConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_interface_topic() -> String {
    "observed/base-if-linux/if/interfaces/interface".to_string()
}

fn default_ipv6_topic() -> String {
    "observed/base-ip/ipv6".to_string()
}

fn default_retry_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            interface_topic: default_interface_topic(),
            ipv6_topic: default_ipv6_topic(),
        }
    }
}

impl Default for DadConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: default_retry_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DadConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl NasIpdConfig {
    /// Load configuration from file, or use defaults if the file is missing.
    ///
    /// Runs before logging is set up, so the fallback is reported on stderr.
    pub fn load_or_default(path: impl AsRef<Path>) -> NasResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| {
                let msg = format!("Failed to parse config file {}: {}", path.display(), e);
                NasError::config(msg)
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!("nas-ipd: Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(NasError::Io(e)),
        }
    }

    pub fn from_toml(content: &str) -> NasResult<Self> {
        toml::from_str(content).map_err(|e| NasError::config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> NasResult<()> {
        self.tools.validate()?;

        if self.bus.redis_url.trim().is_empty() {
            return Err(NasError::config("bus.redis_url must not be empty"));
        }
        if self.bus.interface_topic.trim().is_empty() || self.bus.ipv6_topic.trim().is_empty() {
            return Err(NasError::config("bus topics must not be empty"));
        }
        if self.dad.retry_interval_secs == 0 {
            return Err(NasError::config("dad.retry_interval_secs must be > 0"));
        }
        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(NasError::config(format!(
                "logging.level '{}' is not a valid filter: {}",
                self.logging.level, e
            )));
        }

        Ok(())
    }
}
