//! Save system settings
//!
//! `Settings` is read by every manager operation and swapped wholesale when
//! it changes. `SettingsStore` keeps it on disk as pretty-printed JSON so a
//! host can load it once at startup.

use super::types::*;
use log::{info, warn};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Auto-save interval presets in minutes
pub const AUTO_SAVE_INTERVAL_PRESETS: [u32; 12] = [1, 2, 3, 4, 5, 7, 10, 15, 20, 30, 45, 60];

/// Interval used when the configured value is not one of the presets
pub const DEFAULT_AUTO_SAVE_INTERVAL_MINUTES: u32 = 10;

/// Converts a configured interval to the timer period in milliseconds
///
/// Only the twelve presets are honoured; anything else yields ten minutes.
pub fn auto_save_interval_millis(minutes: u32) -> u64 {
    let minutes = if AUTO_SAVE_INTERVAL_PRESETS.contains(&minutes) {
        minutes
    } else {
        DEFAULT_AUTO_SAVE_INTERVAL_MINUTES
    };
    u64::from(minutes) * 60_000
}

/// Configuration for the save system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient_enum")]
    pub location: SaveLocation,
    #[serde(deserialize_with = "lenient_enum")]
    pub format: SaveFormat,
    /// Name of the save folder inside the resolved location
    pub directory_name: String,
    /// Base name for manual saves; the timestamp goes after it
    pub default_name: String,
    /// Prefix that marks a file as an auto save
    pub auto_save_prefix: String,
    /// Name used for exit saves (written with the auto-save prefix)
    pub exit_save_name: String,
    /// Extension for binary saves, with or without the leading dot
    pub binary_extension: String,
    pub auto_save_enabled: bool,
    pub hide_auto_save_files: bool,
    pub auto_save_interval_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            location: SaveLocation::PersistentPath,
            format: SaveFormat::Binary,
            directory_name: "Save Data".to_string(),
            default_name: "save".to_string(),
            auto_save_prefix: "auto save - ".to_string(),
            exit_save_name: "exit save".to_string(),
            binary_extension: "oncgm".to_string(),
            auto_save_enabled: true,
            hide_auto_save_files: false,
            auto_save_interval_minutes: DEFAULT_AUTO_SAVE_INTERVAL_MINUTES,
        }
    }
}

impl Settings {
    /// The binary extension with any leading dot stripped
    pub fn binary_extension(&self) -> &str {
        self.binary_extension.trim_start_matches('.')
    }

    /// File extension (no dot) written for `format`
    pub fn extension_for(&self, format: SaveFormat) -> &str {
        match format {
            SaveFormat::Binary => self.binary_extension(),
            SaveFormat::Json => JSON_EXTENSION,
            SaveFormat::Xml => XML_EXTENSION,
        }
    }

    /// Maps a file extension (no dot) back to its format
    ///
    /// The binary extension wins if it was configured as `json` or `xml`.
    pub fn format_for_extension(&self, extension: &str) -> Option<SaveFormat> {
        if extension == self.binary_extension() {
            Some(SaveFormat::Binary)
        } else if extension == JSON_EXTENSION {
            Some(SaveFormat::Json)
        } else if extension == XML_EXTENSION {
            Some(SaveFormat::Xml)
        } else {
            None
        }
    }

    /// Format of the file at `path`, judged by its extension only
    pub fn format_for_path(&self, path: &Path) -> Option<SaveFormat> {
        let extension = path.extension()?.to_str()?;
        self.format_for_extension(extension)
    }

    /// The recognized extensions in scan order, duplicates removed
    pub fn recognized_extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = Vec::with_capacity(3);
        for format in SaveFormat::ALL {
            let ext = self.extension_for(format);
            if !ext.is_empty() && !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        extensions
    }

    /// True if a file name marks an auto save
    ///
    /// An empty prefix never matches; otherwise every file would be an auto save.
    pub fn is_auto_save_name(&self, file_name: &str) -> bool {
        !self.auto_save_prefix.is_empty() && file_name.contains(&self.auto_save_prefix)
    }

    /// Timer period for the configured auto-save interval
    pub fn auto_save_period(&self) -> Duration {
        Duration::from_millis(auto_save_interval_millis(self.auto_save_interval_minutes))
    }
}

/// Parses an enum field, falling back to its default on unknown values
///
/// Accepts the variant name or its index (`"Xml"` or `2`). Anything else,
/// including `null` and out-of-range indices, falls back with a warning so
/// the rest of the settings still load.
fn lenient_enum<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default + std::fmt::Debug,
{
    let raw = Value::deserialize(deserializer)?;
    let parsed = match &raw {
        Value::String(name) => enum_from(name.as_str()),
        Value::Number(n) => n.as_u64().and_then(|i| u32::try_from(i).ok()).and_then(enum_from),
        _ => None,
    };

    Ok(parsed.unwrap_or_else(|| {
        let fallback = T::default();
        warn!("Unrecognized settings value {}, using {:?} instead", raw, fallback);
        fallback
    }))
}

fn enum_from<'a, T, V>(value: V) -> Option<T>
where
    T: DeserializeOwned,
    V: IntoDeserializer<'a, serde::de::value::Error>,
{
    T::deserialize(value.into_deserializer()).ok()
}

/// Loads and persists `Settings` as a JSON file
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SettingsStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings file
    pub fn load(&self) -> SaveResult<Settings> {
        let json = fs::read_to_string(&self.path)?;
        let settings: Settings = serde_json::from_str(&json)?;
        Ok(settings)
    }

    /// Reads the settings file, creating it with defaults if it is missing
    ///
    /// An unreadable file is replaced by defaults (and rewritten) rather than
    /// failing startup.
    pub fn load_or_create(&self) -> SaveResult<Settings> {
        if self.path.exists() {
            match self.load() {
                Ok(settings) => return Ok(settings),
                Err(e) => warn!(
                    "Settings at {} could not be read ({}), recreating defaults",
                    self.path.display(),
                    e
                ),
            }
        }

        let settings = Settings::default();
        self.persist(&settings)?;
        info!("Created default settings at {}", self.path.display());
        Ok(settings)
    }

    /// Writes the settings file
    pub fn persist(&self, settings: &Settings) -> SaveResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
