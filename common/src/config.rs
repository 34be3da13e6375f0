use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::AuthMode;

/// Well-known WS-Discovery port.
pub const WS_DISCOVERY_PORT: u16 = 3702;
pub const DEFAULT_SECRET_PATH: &str = "credentials001";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

/// Which discovery strategies a scan runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Unicast probe against every target host:port.
    #[default]
    Netscan,
    /// One probe to the WS-Discovery multicast group.
    Multicast,
    Both,
}

impl DiscoveryMode {
    pub fn includes_netscan(&self) -> bool {
        matches!(self, DiscoveryMode::Netscan | DiscoveryMode::Both)
    }

    pub fn includes_multicast(&self) -> bool {
        matches!(self, DiscoveryMode::Multicast | DiscoveryMode::Both)
    }
}

impl FromStr for DiscoveryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netscan" => Ok(DiscoveryMode::Netscan),
            "multicast" => Ok(DiscoveryMode::Multicast),
            "both" => Ok(DiscoveryMode::Both),
            _ => Err(ConfigError::UnknownValue {
                what: "discovery mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: DiscoveryMode,
    /// Ports probed on every target host.
    pub ports: Vec<u16>,
    /// Per-probe deadline in milliseconds.
    pub probe_timeout_ms: u64,
    /// Upper bound of probes in flight.
    pub max_concurrency: usize,
    /// Auth mode seeded into the properties of every discovered device.
    pub default_auth_mode: AuthMode,
    /// Secret path tried first when identifying a device.
    pub default_secret_path: String,
    /// TOML file with `[secret-path] username/password` tables.
    pub credentials_file: Option<PathBuf>,
    /// Print results as JSON instead of a tree.
    pub json: bool,
    /// Output verbosity reduction, 0 prints everything.
    pub quiet: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::default(),
            ports: vec![WS_DISCOVERY_PORT],
            probe_timeout_ms: millis(DEFAULT_PROBE_TIMEOUT),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_auth_mode: AuthMode::default(),
            default_secret_path: DEFAULT_SECRET_PATH.to_string(),
            credentials_file: None,
            json: false,
            quiet: 0,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn set_probe_timeout(&mut self, timeout: Duration) {
        self.probe_timeout_ms = millis(timeout);
    }
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Parses durations like `3s`, `500ms`, `1m` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();
    let unknown = || ConfigError::UnknownValue {
        what: "duration",
        value: s.to_string(),
    };

    let split_at = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split_at);
    let value: u64 = digits.parse().map_err(|_| unknown())?;

    match unit {
        "" | "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs).ok_or_else(unknown),
        _ => Err(unknown()),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
