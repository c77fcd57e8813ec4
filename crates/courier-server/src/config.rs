//! Environment-derived configuration (`COURIER_*`).
//!
//! The core never reads any of this; these values feed the port
//! implementations and the HTTP surface.

use std::time::Duration;

use serde::Deserialize;

use courier_core::impls::BackoffPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the relay listens on.
    pub port: u16,

    /// Upper bound for one outbound attempt. A stalled remote host must
    /// not pin serving capacity beyond this.
    pub send_timeout_secs: u64,

    /// Attempt budget per delivery in the in-memory queue.
    pub max_attempts: u32,

    /// Base delay before the first redelivery.
    pub retry_base_delay_ms: u64,

    /// Backoff multiplier per further redelivery.
    pub retry_multiplier: f64,

    /// Where the queue reaches this process's webhook. Defaults to
    /// loopback on `port`; set it when running behind a proxy.
    pub public_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            send_timeout_secs: 20,
            max_attempts: 5,
            retry_base_delay_ms: 2000,
            retry_multiplier: 2.0,
            public_base_url: None,
        }
    }
}

impl Config {
    /// Load from `COURIER_`-prefixed environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("COURIER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.retry_base_delay_ms),
            self.retry_multiplier,
        )
    }

    pub fn webhook_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.port))
    }
}
