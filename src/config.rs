use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::geometry::DEFAULT_MARKER_RADIUS;

const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "ar_ruler";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default)]
pub struct RulerConfig {
    pub markers: MarkerConfig,
    pub hit_test: HitTestConfig,
    pub display: DisplayConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MarkerConfig {
    /// Sphere radius in meters.
    pub radius: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_MARKER_RADIUS,
        }
    }
}

/// Feature-point hit-test tolerances.
#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HitTestConfig {
    /// Farthest feature point considered, measured along the ray (meters).
    pub max_distance: f32,
    /// Half-angle of the cone around the tap ray a point must fall inside.
    pub cone_half_angle_deg: f32,
}

impl Default for HitTestConfig {
    fn default() -> Self {
        Self {
            max_distance: 10.0,
            cone_half_angle_deg: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_statistics: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_statistics: true,
        }
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        let config = load_config();
        app.insert_resource(config.hit_test.clone())
            .insert_resource(config);
    }
}

/// Running from `cargo run` keeps the config next to the project; installed
/// builds use the platform config directory.
fn config_path() -> PathBuf {
    let dev = std::env::var_os("CARGO_MANIFEST_DIR").is_some();
    let dir = if dev {
        std::env::current_dir().unwrap_or_default()
    } else {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR)
    };
    dir.join(CONFIG_FILE)
}

pub fn parse_config(contents: &str) -> Result<RulerConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}

fn read_config(path: &Path) -> Result<RulerConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents)
}

fn write_config(path: &Path, config: &RulerConfig) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_config() -> RulerConfig {
    let path = config_path();
    if path.exists() {
        match read_config(&path) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                return config;
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                return RulerConfig::default();
            }
        }
    }

    let config = RulerConfig::default();
    save_config(&config);
    config
}

pub fn save_config(config: &RulerConfig) {
    let path = config_path();
    match write_config(&path, config) {
        Ok(()) => info!("Saved config to {:?}", path),
        Err(e) => error!("{}", e),
    }
}
