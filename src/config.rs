// Configuration
// Server and client settings, loadable from TOML and overridable from the CLI
//
// Example server configuration:
//
//     bind_addr = "0.0.0.0:2345"
//     prime_lower_bound = 1048576
//     prime_upper_bound = 2097152
//     done_delay_ms = 1000
//     log_level = "info"

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rsa::keygen::DEFAULT_PRIME_BOUND;

/// Host clients connect to when no address is given
pub const DEFAULT_SERVER_HOST: &str = "localhost";

/// Port the server listens on by default
pub const DEFAULT_SERVER_PORT: u16 = 2345;

/// Smallest lower bound that still yields a modulus above 255
const MIN_PRIME_LOWER_BOUND: u64 = 16;

fn read_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Primes are drawn from [prime_lower_bound, prime_upper_bound)
    pub prime_lower_bound: u64,
    pub prime_upper_bound: u64,
    /// Pause before answering CLIENT_DONE; no protocol meaning, may be 0
    pub done_delay_ms: u64,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_SERVER_PORT),
            prime_lower_bound: DEFAULT_PRIME_BOUND,
            prime_upper_bound: DEFAULT_PRIME_BOUND * 2,
            done_delay_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = read_toml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.is_empty() {
            return Err(ConfigError::Invalid {
                field: "bind_addr",
                reason: "must not be empty".to_string(),
            });
        }
        if self.prime_lower_bound < MIN_PRIME_LOWER_BOUND {
            return Err(ConfigError::Invalid {
                field: "prime_lower_bound",
                reason: format!("must be at least {}", MIN_PRIME_LOWER_BOUND),
            });
        }
        if self.prime_lower_bound >= self.prime_upper_bound {
            return Err(ConfigError::Invalid {
                field: "prime_upper_bound",
                reason: format!(
                    "must be greater than prime_lower_bound ({})",
                    self.prime_lower_bound
                ),
            });
        }
        Ok(())
    }

    pub fn done_delay(&self) -> Duration {
        Duration::from_millis(self.done_delay_ms)
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_prime_bounds(mut self, lower: u64, upper: u64) -> Self {
        self.prime_lower_bound = lower;
        self.prime_upper_bound = upper;
        self
    }

    pub fn with_done_delay(mut self, delay: Duration) -> Self {
        self.done_delay_ms = delay.as_millis() as u64;
        self
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Address used when the user enters none
    pub server_addr: String,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("{}:{}", DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT),
            log_level: "warn".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = read_toml(path.as_ref())?;
        if config.server_addr.is_empty() {
            return Err(ConfigError::Invalid {
                field: "server_addr",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(config)
    }

    pub fn with_server_addr(mut self, addr: impl Into<String>) -> Self {
        self.server_addr = addr.into();
        self
    }
}
