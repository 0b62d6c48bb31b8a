//! Application configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::warn;

use crate::errors::RegistryError;
use crate::models::Mmsi;
use crate::route::RouteBounds;
use crate::target::TargetSettings;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Live feed; without it the registry only serves the restored picture
    pub mqtt: Option<MqttConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    pub uri: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub topics: Vec<String>,
    pub client_id: String,
}

fn default_mqtt_port() -> u16 {
    443
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegistryConfig {
    /// MMSI prefix identifying AIS-SART units
    pub sart_prefix: String,
    /// Use per-class reporting intervals when deciding a vessel is gone
    pub strict_timeout: bool,
    /// Initial intended-route visibility of new vessels
    pub show_intended_routes: bool,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub sweep_interval: Duration,
    /// Only route suggestions addressed to this station are kept
    pub own_mmsi: Option<Mmsi>,
    /// Waypoints outside this box are dropped when decoding routes
    pub route_bounds: RouteBounds,
    pub trajectory: TrajectoryConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sart_prefix: "970".to_string(),
            strict_timeout: true,
            show_intended_routes: true,
            sweep_interval: Duration::from_secs(10),
            own_mmsi: None,
            route_bounds: RouteBounds::default(),
            trajectory: TrajectoryConfig::default(),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Minimum spacing between stored points, in metres
    pub min_distance: f64,
    /// Points older than this are pruned by the sweep
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub max_age: Duration,
    /// Default display window for new targets
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub display_time: Duration,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            min_distance: 100.0,
            max_age: Duration::from_secs(60 * 60),
            display_time: Duration::from_secs(30 * 60),
        }
    }
}

impl TrajectoryConfig {
    /// Settings new mobile targets start out with
    pub fn default_settings(&self) -> TargetSettings {
        TargetSettings {
            visible: true,
            past_track_display_time: self.display_time,
            past_track_min_dist: self.min_distance,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: PathBuf,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub save_interval: Duration,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ais-registry.json"),
            save_interval: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("AISREGISTRY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("mqtt.topics"),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        self.registry.validate()?;
        self.snapshot.validate()?;
        Ok(())
    }
}

impl RegistryConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.sart_prefix.is_empty() || !self.sart_prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(RegistryError::ConfigurationError {
                message: format!("Invalid SART prefix '{}'", self.sart_prefix),
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(RegistryError::ConfigurationError {
                message: "Sweep interval must be greater than zero".to_string(),
            });
        }
        let bounds = &self.route_bounds;
        if bounds.min_lat > bounds.max_lat || bounds.min_lon > bounds.max_lon {
            return Err(RegistryError::ConfigurationError {
                message: "Route bounds are inverted".to_string(),
            });
        }
        if self.trajectory.min_distance < 0.0 {
            return Err(RegistryError::ConfigurationError {
                message: "Trajectory minimum distance cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}

impl SnapshotConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.validate_path()?;
        self.validate_save_interval()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                self.ensure_directory_exists(parent)?;
            }
        }
        Ok(())
    }

    fn validate_path(&self) -> Result<(), RegistryError> {
        if self.path.as_os_str().is_empty() {
            return Err(RegistryError::ConfigurationError {
                message: "Snapshot path cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    fn validate_save_interval(&self) -> Result<(), RegistryError> {
        if self.save_interval.is_zero() {
            return Err(RegistryError::ConfigurationError {
                message: "Save interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn ensure_directory_exists(&self, dir: &Path) -> Result<(), RegistryError> {
        if !dir.exists() {
            warn!("Snapshot directory does not exist, attempting to create it");
            std::fs::create_dir_all(dir).map_err(|e| RegistryError::ConfigurationError {
                message: format!("Could not create snapshot directory: {}", e),
            })?;
        }
        Ok(())
    }
}
