//! TOML-based configuration persistence for the controller.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\WallController\config.toml`
//! - Linux:    `~/.config/wallcontroller/config.toml`
//! - macOS:    `~/Library/Application Support/WallController/config.toml`
//!
//! An explicit path can be supplied instead with [`load_config_from`], which
//! is what the `--config` flag uses.
//!
//! Fields annotated with `#[serde(default = …)]` fall back to their default
//! when absent from the file, so the controller works on first run and when
//! upgrading from an older config that is missing newer fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

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
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level controller configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub wall: WallConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// Wall geometry and negotiation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WallConfig {
    /// Grid string, rows then columns (`"2x2"`, `"1x4"`).
    #[serde(default = "default_layout")]
    pub layout: String,
    /// Tile rotation in degrees: 0, 90, or 270.
    #[serde(default)]
    pub rotation_degrees: u16,
    /// FPS denominator handed to the visualization layer's canvas resize.
    #[serde(default = "default_fps_denominator")]
    pub fps_denominator: u32,
    /// Canvas inflation applied after negotiation, in percent.
    #[serde(default = "default_margin_pct")]
    pub margin_pct: f64,
    /// Maximum output canvas width in pixels.
    #[serde(default = "default_max_output_width")]
    pub max_output_width: u32,
    /// Maximum output canvas height in pixels.
    #[serde(default = "default_max_output_height")]
    pub max_output_height: u32,
    /// Scene source name prefix; tile `i` binds to `"{prefix}{i}"`, 1-based.
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,
    /// Per-tile resolution assumed before any device has negotiated.
    #[serde(default = "default_tile_width")]
    pub default_tile_width: u32,
    #[serde(default = "default_tile_height")]
    pub default_tile_height: u32,
    /// Per-device negotiation timeout in milliseconds.
    #[serde(default = "default_negotiation_timeout_ms")]
    pub negotiation_timeout_ms: u64,
    /// Name of the device whose reported resolution wins on disagreement.
    /// Defaults to the first configured device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_device: Option<String>,
}

/// Visualization-layer connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneConfig {
    /// obs-websocket URL.
    #[serde(default = "default_scene_url")]
    pub url: String,
    /// Name of the scene holding the wall sources.
    #[serde(default = "default_scene_name")]
    pub scene_name: String,
    /// Multiplier from canvas size to encoded output size.
    #[serde(default = "default_output_scale")]
    pub output_scale: f64,
}

/// Kind of encoder device behind a [`DeviceEntry`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Magewell,
    Kiloview,
}

/// One configured encoder device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceEntry {
    /// Display name, also used to designate the reference device.
    pub name: String,
    pub kind: DeviceKind,
    /// Host or host:port of the device's control interface.
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_layout() -> String {
    "2x2".to_string()
}
fn default_fps_denominator() -> u32 {
    30
}
fn default_margin_pct() -> f64 {
    2.0
}
fn default_max_output_width() -> u32 {
    1920
}
fn default_max_output_height() -> u32 {
    1080
}
fn default_source_prefix() -> String {
    "screen".to_string()
}
fn default_tile_width() -> u32 {
    1920
}
fn default_tile_height() -> u32 {
    1080
}
fn default_negotiation_timeout_ms() -> u64 {
    5000
}
fn default_scene_url() -> String {
    "ws://127.0.0.1:4455".to_string()
}
fn default_scene_name() -> String {
    "Scene".to_string()
}
fn default_output_scale() -> f64 {
    1.0
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            layout: default_layout(),
            rotation_degrees: 0,
            fps_denominator: default_fps_denominator(),
            margin_pct: default_margin_pct(),
            max_output_width: default_max_output_width(),
            max_output_height: default_max_output_height(),
            source_prefix: default_source_prefix(),
            default_tile_width: default_tile_width(),
            default_tile_height: default_tile_height(),
            negotiation_timeout_ms: default_negotiation_timeout_ms(),
            reference_device: None,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            url: default_scene_url(),
            scene_name: default_scene_name(),
            output_scale: default_output_scale(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads [`AppConfig`] from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads [`AppConfig`] from an explicit path, returning the defaults when
/// the file is absent.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// Creates the config directory and file if they do not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the app folder.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("WallController"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("wallcontroller"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("WallController")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_expected_wall_settings() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.wall.layout, "2x2");
        assert_eq!(cfg.wall.rotation_degrees, 0);
        assert_eq!(cfg.wall.max_output_width, 1920);
        assert_eq!(cfg.wall.max_output_height, 1080);
        assert!((cfg.wall.margin_pct - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_config_has_expected_scene_settings() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scene.url, "ws://127.0.0.1:4455");
        assert_eq!(cfg.scene.scene_name, "Scene");
        assert!((cfg.scene.output_scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_config_has_no_devices() {
        assert!(AppConfig::default().devices.is_empty());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = AppConfig::default();
        cfg.wall.layout = "1x4".to_string();
        cfg.wall.rotation_degrees = 90;
        cfg.devices.push(DeviceEntry {
            name: "encoder-1".to_string(),
            kind: DeviceKind::Magewell,
            host: "192.168.31.104".to_string(),
            username: "dev".to_string(),
            password: "password".to_string(),
        });

        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_device_kind_serializes_lowercase() {
        let entry = DeviceEntry {
            name: "enc".to_string(),
            kind: DeviceKind::Kiloview,
            host: "h".to_string(),
            username: String::new(),
            password: String::new(),
        };
        let toml_str = toml::to_string(&entry).unwrap();
        assert!(toml_str.contains("kind = \"kiloview\""));
    }

    #[test]
    fn test_deserialize_minimal_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg.wall.layout, "2x2");
        assert_eq!(cfg.wall.fps_denominator, 30);
        assert_eq!(cfg.wall.negotiation_timeout_ms, 5000);
        assert!(cfg.devices.is_empty());
    }

    #[test]
    fn test_deserialize_partial_wall_overrides_defaults() {
        let toml_str = r#"
[wall]
layout = "1x3"
max_output_width = 3840
"#;
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");
        assert_eq!(cfg.wall.layout, "1x3");
        assert_eq!(cfg.wall.max_output_width, 3840);
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.wall.max_output_height, 1080);
        assert_eq!(cfg.wall.source_prefix, "screen");
    }

    #[test]
    fn test_reference_device_is_omitted_when_none() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        assert!(!toml_str.contains("reference_device"));
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_missing_path_returns_defaults() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");
        let cfg = load_config_from(&path).expect("missing file must fall back to defaults");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip_via_temp_dir() {
        let dir = std::env::temp_dir().join(format!("wall_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.wall.layout = "3x3".to_string();
        cfg.scene.scene_name = "Wall".to_string();

        let content = toml::to_string_pretty(&cfg).unwrap();
        std::fs::write(&path, &content).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.wall.layout, "3x3");
        assert_eq!(loaded.scene.scene_name, "Wall");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir in a stripped CI environment is also acceptable.
    }
}
