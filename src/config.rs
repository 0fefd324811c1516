use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "periodic3d.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Periodic Table 3D".to_string(),
            width: 1280.0,
            height: 720.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub fov_degrees: f32,
    pub table_camera_distance: f32,
    pub atom_camera_distance: f32,
    pub redraw_delay_ms: u64,
    pub tap_threshold_px: f32,
    pub click_drag_threshold_px: f32,
    pub orbit_tilt_degrees: f32,
    pub gpu_init_attempts: u32,
    pub gpu_retry_delay_ms: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            table_camera_distance: 20.0,
            atom_camera_distance: 40.0,
            redraw_delay_ms: 100,
            tap_threshold_px: 10.0,
            click_drag_threshold_px: 4.0,
            orbit_tilt_degrees: 30.0,
            gpu_init_attempts: 3,
            gpu_retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset_path: PathBuf,
    pub log_filter: String,
    pub window: WindowConfig,
    pub scene: SceneConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("assets/PeriodicTableJSON.json"),
            log_filter: "info".to_string(),
            window: WindowConfig::default(),
            scene: SceneConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("{err}; using default configuration");
                Self::default()
            }
        }
    }

    pub fn from_args(args: &[String]) -> Self {
        let config_path = args
            .get(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::load_or_default(&config_path);
        if let Some(dataset) = args.first() {
            config.dataset_path = PathBuf::from(dataset);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.scene.table_camera_distance, 20.0);
        assert_eq!(config.scene.atom_camera_distance, 40.0);
        assert_eq!(config.scene.redraw_delay_ms, 100);
        assert_eq!(config.scene.tap_threshold_px, 10.0);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json(
            r#"{"log_filter": "debug", "scene": {"atom_camera_distance": 55.0}}"#,
        )
        .unwrap();
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.scene.atom_camera_distance, 55.0);
        assert_eq!(config.scene.table_camera_distance, 20.0);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn broken_or_missing_file() {
        assert!(matches!(Config::from_json("{"), Err(ConfigError::Json(_))));
        assert!(matches!(
            Config::load(Path::new("no/such/periodic3d.json")),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(
            Config::load_or_default(Path::new("no/such/periodic3d.json")),
            Config::default()
        );
    }

    #[test]
    fn dataset_argument_overrides_config() {
        let args = vec!["data/table.json".to_string(), "no/such/config.json".to_string()];
        let config = Config::from_args(&args);
        assert_eq!(config.dataset_path, PathBuf::from("data/table.json"));
        assert_eq!(Config::from_args(&[]).dataset_path, Config::default().dataset_path);
    }
}
