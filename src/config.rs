//! Configuration for a network session.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TOY_IPV6_CONFIG (explicit override)
//!   2. ./toy-ipv6.toml

use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub session: SessionConfig,
    pub transmit: TransmitConfig,
    pub link: LinkConfig,
}

/// What a session is opened against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Link interface name, e.g. a TAP device.
    pub interface: String,
    /// Source network address written into every header.
    pub source: Ipv6Addr,
    pub port: u16,
    /// "tcp", "udp" or an IANA protocol number.
    pub protocol: String,
    pub resolution: ResolutionMode,
    pub oversize: OversizePolicy,
}

/// Bounds for the segmented transmitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitConfig {
    /// Consecutive stalled link calls tolerated. The next stall fails the
    /// send, so a dead link is called `max_stalls + 1` times.
    pub max_stalls: u32,
    /// First backoff after a stalled call, doubled on each further stall.
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Timeout for a single link send or receive. None blocks.
    pub timeout_ms: Option<u64>,
}

/// How a destination address is mapped to a link address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Every destination maps to 33:33:00:00:00:00.
    #[default]
    Fixed,
    /// 33:33 followed by the low four bytes of the destination.
    Derived,
}

/// What to do with a payload longer than `MAX_DATA_LEN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizePolicy {
    /// Silently clamp to the maximum.
    #[default]
    Truncate,
    /// Refuse with `NetError::PayloadTooLarge`.
    Reject,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interface: "tap0".to_string(),
            source: Ipv6Addr::UNSPECIFIED,
            port: 0,
            protocol: "tcp".to_string(),
            resolution: ResolutionMode::default(),
            oversize: OversizePolicy::default(),
        }
    }
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            max_stalls: 8,
            backoff_ms: 1,
            max_backoff_ms: 100,
        }
    }
}

impl TransmitConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl LinkConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid value for {0}: {1}")]
    InvalidEnv(&'static str, String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl StackConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load config reading variables through `env` instead of the process
    /// environment.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = Self::file_path_with(&env);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            StackConfig::default()
        };
        config.apply_env_overrides(&env)?;
        Ok(config)
    }

    /// Parse a config file without applying env overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        Self::file_path_with(|key| std::env::var(key).ok())
    }

    fn file_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("TOY_IPV6_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("toy-ipv6.toml"))
    }

    /// Apply TOY_IPV6_* overrides.
    pub fn apply_env_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = env("TOY_IPV6_INTERFACE") {
            self.session.interface = v;
        }
        if let Some(v) = env("TOY_IPV6_SOURCE") {
            self.session.source = v
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("TOY_IPV6_SOURCE", v))?;
        }
        if let Some(v) = env("TOY_IPV6_PORT") {
            self.session.port = v
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("TOY_IPV6_PORT", v))?;
        }
        if let Some(v) = env("TOY_IPV6_PROTOCOL") {
            self.session.protocol = v;
        }
        if let Some(v) = env("TOY_IPV6_LINK_TIMEOUT_MS") {
            let ms = v
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("TOY_IPV6_LINK_TIMEOUT_MS", v))?;
            self.link.timeout_ms = Some(ms);
        }
        Ok(())
    }
}
