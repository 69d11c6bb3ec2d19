//! Configuration for placejournal.
//!
//! Settings are layered with figment: built-in defaults, then
//! `config.toml`, then `PLACEJOURNAL_*` environment variables. Nested keys
//! use a double underscore in the environment, e.g.
//! `PLACEJOURNAL_STORAGE__BLOB_KEY`, since key names contain single ones.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::device::PermissionStatus;
use crate::error::{Error, Result};
use crate::journal::{UnreadablePolicy, DEFAULT_BLOB_KEY};
use crate::place::{Coordinates, DEFAULT_TITLE};

const CONFIG_FILE_NAME: &str = "config.toml";

const DATA_DIR_NAME: &str = "placejournal";

const DATABASE_FILE_NAME: &str = "journal.db";

/// Everything placejournal can be configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where and how the journal is persisted.
    pub storage: StorageConfig,
    /// Capture flow settings.
    pub capture: CaptureConfig,
    /// Answers the host gives in place of phone hardware.
    pub device: DeviceConfig,
}

/// Journal persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/placejournal/journal.db`
    pub database_path: Option<PathBuf>,
    /// Key the journal blob is stored under.
    pub blob_key: String,
    /// What to show when the stored journal cannot be parsed.
    pub on_unreadable: UnreadablePolicy,
}

/// Capture flow settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Title given to places saved without one.
    pub default_title: String,
}

/// Answers the host machine gives when standing in for a phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Answer to camera permission requests.
    pub camera_permission: PermissionStatus,
    /// Answer to location permission requests.
    pub location_permission: PermissionStatus,
    /// Whether biometric hardware is present.
    pub biometric_hardware: bool,
    /// Whether the biometric challenge succeeds.
    pub biometric_success: bool,
    /// Fixed latitude reported by the position sensor.
    pub latitude: Option<f64>,
    /// Fixed longitude reported by the position sensor.
    pub longitude: Option<f64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            blob_key: DEFAULT_BLOB_KEY.to_string(),
            on_unreadable: UnreadablePolicy::Surface,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            camera_permission: PermissionStatus::Granted,
            location_permission: PermissionStatus::Granted,
            biometric_hardware: false,
            biometric_success: true,
            latitude: None,
            longitude: None,
        }
    }
}

impl DeviceConfig {
    /// The configured fixed position, if both components are set.
    #[must_use]
    pub fn position(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}

impl Config {
    /// Load from the default config file, the environment and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load using `config_path` instead of the default config file.
    ///
    /// A missing file is not an error; its layer is simply empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value is invalid.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("PLACEJOURNAL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/placejournal/config.toml`.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// `<data_local_dir>/placejournal`.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Check values that deserialize fine but make no sense.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] naming the first bad setting.
    pub fn validate(&self) -> Result<()> {
        if self.storage.blob_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "blob_key must not be empty".to_string(),
            });
        }

        if self.capture.default_title.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "default_title must not be empty".to_string(),
            });
        }

        match (self.device.latitude, self.device.longitude) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::ConfigValidation {
                    message: "latitude and longitude must be set together".to_string(),
                });
            }
            (Some(latitude), Some(longitude)) => {
                let position = Coordinates::new(latitude, longitude);
                if !position.is_valid() {
                    return Err(Error::ConfigValidation {
                        message: format!("position out of range: {position}"),
                    });
                }
            }
            (None, None) => {}
        }

        Ok(())
    }

    /// The journal database file, `journal.db` in the data directory unless set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.blob_key, "places");
        assert_eq!(config.storage.on_unreadable, UnreadablePolicy::Surface);
        assert_eq!(config.capture.default_title, DEFAULT_TITLE);
        assert!(config.device.camera_permission.is_granted());
        assert!(!config.device.biometric_hardware);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_blob_key() {
        let mut config = Config::default();
        config.storage.blob_key = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("blob_key"));
    }

    #[test]
    fn test_validate_empty_default_title() {
        let mut config = Config::default();
        config.capture.default_title = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_title"));
    }

    #[test]
    fn test_validate_half_set_position() {
        let mut config = Config::default();
        config.device.latitude = Some(10.0);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("set together"));
    }

    #[test]
    fn test_validate_out_of_range_position() {
        let mut config = Config::default();
        config.device.latitude = Some(95.0);
        config.device.longitude = Some(0.0);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn test_device_position() {
        let mut device = DeviceConfig::default();
        assert!(device.position().is_none());

        device.latitude = Some(-23.5);
        device.longitude = Some(-46.6);
        assert_eq!(device.position(), Some(Coordinates::new(-23.5, -46.6)));
    }

    #[test]
    fn test_database_path_defaults_to_data_dir() {
        let path = Config::default().database_path();
        assert_eq!(path, Config::default_data_dir().join("journal.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("placejournal"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
blob_key = "journal"
on_unreadable = "empty"

[capture]
default_title = "Sem título"

[device]
location_permission = "denied"
biometric_hardware = true
latitude = -23.5505
longitude = -46.6333
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.storage.blob_key, "journal");
        assert_eq!(config.storage.on_unreadable, UnreadablePolicy::Empty);
        assert_eq!(config.capture.default_title, "Sem título");
        assert_eq!(config.device.location_permission, PermissionStatus::Denied);
        assert!(config.device.biometric_hardware);
        assert_eq!(
            config.device.position(),
            Some(Coordinates::new(-23.5505, -46.6333))
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\nblob_key = \"\"\n").unwrap();

        assert!(Config::load_from(Some(path)).is_err());
    }

    #[test]
    fn test_partial_storage_section_keeps_defaults() {
        let json = r#"{"blob_key": "other"}"#;
        let storage: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(storage.blob_key, "other");
        assert_eq!(storage.on_unreadable, UnreadablePolicy::Surface);
    }

    #[test]
    fn test_config_serializes_policy_in_snake_case() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["storage"]["on_unreadable"], "surface");
        assert_eq!(json["device"]["camera_permission"], "granted");
    }
}
