//! TOML-based configuration for the agent.
//!
//! The default location is platform-specific:
//! - Windows:  `%APPDATA%\Peerlink\agent.toml`
//! - Linux:    `~/.config/peerlink/agent.toml`
//! - macOS:    `~/Library/Application Support/Peerlink/agent.toml`
//!
//! Every field has a default, so a missing file, an empty file, and a file
//! with only some sections all load successfully:
//!
//! ```toml
//! [agent]
//! log_level = "debug"
//!
//! [discovery]
//! scan_duration_ms = 5000
//!
//! [selection.heuristic]
//! kind = "strongest_signal"
//! min_rssi = -80
//!
//! [[connection.strategies]]
//! mode = "authenticated"
//! service_id = "00001101-0000-1000-8000-00805f9b34fb"
//!
//! [[simulation.devices]]
//! address = "00:11:22:33:44:55"
//! name = "DESKTOP-7F3K"
//! rssi = -48
//! refuse = ["unauthenticated"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use peerlink_core::{BuiltinHeuristic, NegotiationMode, PeerAddress, Sighting, Strategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::discover_devices::DiscoveryConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config parsed but its values are unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub selection: SelectionSection,
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// `tracing` filter directive, e.g. `"info"` or `"peerlink_agent=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySection {
    #[serde(default = "default_scan_duration_ms")]
    pub scan_duration_ms: u64,
    /// Sightings buffered between the platform and the controller.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SelectionSection {
    #[serde(default)]
    pub heuristic: BuiltinHeuristic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSection {
    /// Tried in order until one succeeds.
    #[serde(default = "Strategy::default_sequence")]
    pub strategies: Vec<Strategy>,
}

/// In-memory peers used when no radio stack is wired in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimulationSection {
    #[serde(default)]
    pub devices: Vec<SimulatedDevice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatedDevice {
    pub address: PeerAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
    /// Modes this peer refuses to connect with.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refuse: Vec<NegotiationMode>,
}

impl SimulatedDevice {
    pub fn sighting(&self) -> Sighting {
        Sighting {
            address: self.address.clone(),
            display_name: self.name.clone(),
            signal_strength: self.rssi,
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_scan_duration_ms() -> u64 {
    10_000
}
fn default_event_queue_capacity() -> usize {
    64
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            scan_duration_ms: default_scan_duration_ms(),
            event_queue_capacity: default_event_queue_capacity(),
        }
    }
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            strategies: Strategy::default_sequence(),
        }
    }
}

impl AgentConfig {
    /// Rejects values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.scan_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "discovery.scan_duration_ms must be greater than zero".to_string(),
            ));
        }
        if self.discovery.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "discovery.event_queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.connection.strategies.is_empty() {
            return Err(ConfigError::Invalid(
                "connection.strategies must list at least one strategy".to_string(),
            ));
        }
        Ok(())
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            scan_duration: Duration::from_millis(self.discovery.scan_duration_ms),
            event_queue_capacity: self.discovery.event_queue_capacity,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("agent.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads and validates the config at `path`, returning the defaults if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if a value is unusable.
pub fn load_config_from(path: &Path) -> Result<AgentConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AgentConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AgentConfig::default(),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AgentConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Peerlink"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("peerlink"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Peerlink")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
