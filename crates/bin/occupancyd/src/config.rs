//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `occupancy.toml` in the working directory (or the path in
//! `OCCUPANCY_CONFIG`). Every section has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use occupancy_domain::id::{DeviceId, RandomizerId};
use occupancy_domain::randomizer::{RawRandomizerConfig, SLOT_COUNT};
use occupancy_domain::slot::RawSlotConfig;
use serde::Deserialize;

const DEFAULT_PATH: &str = "occupancy.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler loop settings.
    pub scheduler: SchedulerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Devices exposed by the virtual host.
    pub devices: Vec<DeviceEntry>,
    /// Randomizers to activate at startup.
    pub randomizers: Vec<RandomizerEntry>,
}

/// Scheduler loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between two sweeps.
    pub tick_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// A simulated light.
#[derive(Debug, Deserialize)]
pub struct DeviceEntry {
    pub id: DeviceId,
    pub name: String,
    #[serde(default)]
    pub on: bool,
}

/// A randomizer and its slots.
#[derive(Debug, Deserialize)]
pub struct RandomizerEntry {
    pub id: RandomizerId,
    #[serde(default)]
    pub name: String,
    /// Whether the randomizer starts switched on.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub slots: Vec<SlotEntry>,
}

/// One light slot. Values are passed as-is to the domain validator.
#[derive(Debug, Deserialize)]
pub struct SlotEntry {
    /// Slot number, `1..=10`.
    pub slot: u8,
    #[serde(default)]
    pub device: FieldValue,
    #[serde(default)]
    pub min_delay: FieldValue,
    #[serde(default)]
    pub max_delay: FieldValue,
    #[serde(default)]
    pub min_duration: FieldValue,
    #[serde(default)]
    pub max_duration: FieldValue,
}

/// A slot value written either as a TOML integer or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from `OCCUPANCY_CONFIG` or `occupancy.toml` (if
    /// present) then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("OCCUPANCY_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("OCCUPANCY_TICK_SECS") {
            if let Ok(secs) = val.trim().parse() {
                self.scheduler.tick_secs = secs;
            }
        }
        if let Some(val) = var("OCCUPANCY_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_secs == 0 {
            return Err(ConfigError::Validation(
                "tick_secs must be non-zero".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for randomizer in &self.randomizers {
            if !ids.insert(randomizer.id) {
                return Err(ConfigError::Validation(format!(
                    "randomizer {} is defined twice",
                    randomizer.id
                )));
            }
            let mut numbers = HashSet::new();
            for slot in &randomizer.slots {
                if !(1..=SLOT_COUNT).contains(&usize::from(slot.slot)) {
                    return Err(ConfigError::Validation(format!(
                        "randomizer {}: slot {} is outside 1..={SLOT_COUNT}",
                        randomizer.id, slot.slot
                    )));
                }
                if !numbers.insert(slot.slot) {
                    return Err(ConfigError::Validation(format!(
                        "randomizer {}: slot {} is defined twice",
                        randomizer.id, slot.slot
                    )));
                }
            }
        }
        Ok(())
    }

    /// Period between two scheduler sweeps.
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.scheduler.tick_secs)
    }
}

impl RandomizerEntry {
    /// Convert to the unvalidated domain form. Slots outside `1..=10` are
    /// dropped; [`Config::load`] rejects them beforehand.
    #[must_use]
    pub fn to_raw(&self) -> RawRandomizerConfig {
        let mut raw = RawRandomizerConfig {
            id: self.id,
            name: self.name.clone(),
            ..RawRandomizerConfig::default()
        };
        for entry in &self.slots {
            let Some(target) = usize::from(entry.slot)
                .checked_sub(1)
                .and_then(|index| raw.slots.get_mut(index))
            else {
                continue;
            };
            *target = RawSlotConfig {
                device: entry.device.to_string(),
                min_delay: entry.min_delay.to_string(),
                max_delay: entry.max_delay.to_string(),
                min_duration: entry.min_duration.to_string(),
                max_duration: entry.max_duration.to_string(),
            };
        }
        raw
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_secs: 5 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "occupancyd=info,occupancy=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
