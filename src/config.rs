//! Configuration
//!
//! TOML-backed configuration for the pipeline: where the store lives,
//! which sensors make up the fleet, and the dataset-specific corrections
//! that used to be hardcoded facts (the replaced sensor pair and the
//! known-bad day). Defaults describe the deployment this crate was built
//! for, so `Config::default()` is immediately usable against fixtures.
//!
//! The store connection string is an explicit value here; nothing in
//! the crate reads credentials from the process environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::ConfigError;
use crate::reconcile::{BlankWindow, IdentityPair, SiteCorrections};
use crate::types::{Resolution, TimeWindow};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Store connection settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Sensor fleet layout
    #[serde(default)]
    pub fleet: FleetSettings,

    /// Resampling grid
    #[serde(default)]
    pub resample: ResampleSettings,

    /// Dataset-specific corrections
    #[serde(default = "default_corrections")]
    pub corrections: SiteCorrections,
}

/// Store connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreSettings {
    /// Connection string for the store account
    #[serde(default)]
    pub connection_string: String,

    /// Table holding the sensor readings
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

/// Sensor fleet layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FleetSettings {
    /// Prefix turning a short sensor id into its stored identity
    #[serde(default = "default_deployment_prefix")]
    pub deployment_prefix: String,

    /// Short sensor ids making up the fleet, in combination order
    #[serde(default = "default_sensors")]
    pub sensors: Vec<String>,

    /// Human-readable site name per short sensor id
    #[serde(default = "default_site_names")]
    pub site_names: BTreeMap<String, String>,

    /// Earliest instant the fleet has data for; fetches default to
    /// starting here
    #[serde(default = "default_deployed_since")]
    pub deployed_since: DateTime<Utc>,
}

/// Resampling grid
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResampleSettings {
    /// Grid every per-sensor fetch is aligned to
    #[serde(default = "default_base_resolution")]
    pub base: Resolution,
}

fn default_table_name() -> String {
    "PublicData".to_string()
}

fn default_deployment_prefix() -> String {
    "aq-deployment_".to_string()
}

fn default_sensors() -> Vec<String> {
    ["nesta-1", "nesta-2", "nesta-2-1", "nesta-4", "nesta-5", "nesta-6", "nesta-7", "nesta-8"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_site_names() -> BTreeMap<String, String> {
    [
        ("nesta-1", "Priory Rd (South)"),
        ("nesta-2", "Priory Rd (North)"),
        ("nesta-2-1", "Priory Rd (North)"),
        ("nesta-4", "Horseshoe Bridge"),
        ("nesta-5", "Kent Rd"),
        ("nesta-6", "Portswood Rd"),
        ("nesta-7", "St Denys Rd"),
        ("nesta-8", "Priory Rd-Kent Rd junction"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_deployed_since() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).single().expect("valid constant")
}

fn default_base_resolution() -> Resolution {
    Resolution::Minutes(15)
}

fn default_corrections() -> SiteCorrections {
    SiteCorrections {
        // nesta-2-1 replaced nesta-2 after it failed; one column, the
        // original name.
        identity_pairs: vec![IdentityPair {
            primary: "nesta-2".to_string(),
            secondary: "nesta-2-1".to_string(),
        }],
        // nesta-1 reported garbage for one day.
        blank_windows: vec![BlankWindow {
            column: "nesta-1".to_string(),
            window: TimeWindow::new(
                Utc.with_ymd_and_hms(2019, 6, 7, 0, 0, 0).single().expect("valid constant"),
                Utc.with_ymd_and_hms(2019, 6, 8, 0, 0, 0).single().expect("valid constant"),
            )
            .expect("constant window is non-empty"),
        }],
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            table_name: default_table_name(),
        }
    }
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            deployment_prefix: default_deployment_prefix(),
            sensors: default_sensors(),
            site_names: default_site_names(),
            deployed_since: default_deployed_since(),
        }
    }
}

impl Default for ResampleSettings {
    fn default() -> Self {
        Self {
            base: default_base_resolution(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            fleet: FleetSettings::default(),
            resample: ResampleSettings::default(),
            corrections: default_corrections(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fleet.sensors.is_empty() {
            return Err(ConfigError::Invalid("fleet.sensors is empty".to_string()));
        }

        if self.resample.base.len_secs() <= 0 {
            return Err(ConfigError::Invalid(
                "resample.base has zero width".to_string(),
            ));
        }

        for pair in &self.corrections.identity_pairs {
            if pair.primary == pair.secondary {
                return Err(ConfigError::Invalid(format!(
                    "identity pair merges {:?} with itself",
                    pair.primary
                )));
            }
            for id in [&pair.primary, &pair.secondary] {
                if !self.fleet.sensors.contains(id) {
                    return Err(ConfigError::Invalid(format!(
                        "identity pair references unknown sensor {id:?}"
                    )));
                }
            }
        }

        for bw in &self.corrections.blank_windows {
            if bw.window.start >= bw.window.end {
                return Err(ConfigError::Invalid(format!(
                    "blank window for {:?} is empty or inverted",
                    bw.column
                )));
            }
        }

        Ok(())
    }

    /// Stored identity for a short sensor id
    pub fn stored_identity(&self, short_id: &str) -> String {
        format!("{}{}", self.fleet.deployment_prefix, short_id)
    }
}
