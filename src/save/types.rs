//! Save data types for savekeep
//!
//! This module defines the record that gets written to disk, the enums that
//! select where and how it is written, the directory-entry metadata the
//! catalog hands out, and the error type shared by the whole save system.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Extension used for JSON save files (without the leading dot)
pub const JSON_EXTENSION: &str = "json";

/// Extension used for XML save files (without the leading dot)
pub const XML_EXTENSION: &str = "xml";

/// The player-progress record persisted by the save system
///
/// A plain value object: the manager never looks inside it, it only needs to
/// be able to encode and decode it. Add whatever fields your game needs.
///
/// Array fields carry `#[serde(default)]` so an empty array survives the XML
/// codec, which writes nothing at all for an empty sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub player_name: String,
    pub player_death_count: i32,
    #[serde(default)]
    pub last_player_position: Vec<f32>,
    #[serde(default)]
    pub checkpoints: Vec<bool>,
    #[serde(default)]
    pub dialogs_cleared: Vec<bool>,
    pub difficulty: i32,
    pub graphics_level: i32,
    pub lod_level: i32,
    pub audio_master_volume: f32,
    pub audio_sfx_volume: f32,
    pub audio_music_volume: f32,
    pub audio_ui_volume: f32,
    #[serde(default)]
    pub screen_resolution: Vec<i32>,
    pub total_time_in_game: f32,
}

impl Default for SaveRecord {
    fn default() -> Self {
        SaveRecord {
            player_name: "Player".to_string(),
            player_death_count: 0,
            last_player_position: vec![0.0, 0.0, 0.0],
            checkpoints: vec![false, false, false],
            dialogs_cleared: vec![false, false, false],
            difficulty: 2,
            graphics_level: 1,
            lod_level: 1,
            audio_master_volume: 0.0,
            audio_sfx_volume: 0.0,
            audio_music_volume: 0.0,
            audio_ui_volume: 0.0,
            screen_resolution: vec![1280, 720],
            total_time_in_game: 0.0,
        }
    }
}

/// Encoding used for a save file
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Binary,
    Json,
    Xml,
}

impl SaveFormat {
    pub const ALL: [SaveFormat; 3] = [SaveFormat::Binary, SaveFormat::Json, SaveFormat::Xml];
}

/// Logical place on disk where the save directory lives
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveLocation {
    /// Per-user application data directory
    #[default]
    PersistentPath,
    /// Directory the game executable was installed to
    ApplicationPath,
    /// The user's documents folder
    Documents,
}

impl SaveLocation {
    pub const ALL: [SaveLocation; 3] = [
        SaveLocation::PersistentPath,
        SaveLocation::ApplicationPath,
        SaveLocation::Documents,
    ];
}

/// Directory-entry metadata for a save file
///
/// Produced by the catalog and the manager; never mutated, only replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    /// File name including extension
    pub name: String,
    /// Extension without the leading dot, empty if there is none
    pub extension: String,
    pub modified: SystemTime,
    pub exists: bool,
}

impl FileRecord {
    /// Reads the metadata for `path`
    ///
    /// A path that can't be stat'ed yields a record with `exists == false`
    /// and a last-write time of the unix epoch.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (modified, exists) = match fs::metadata(&path) {
            Ok(meta) => (meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), meta.is_file()),
            Err(_) => (SystemTime::UNIX_EPOCH, false),
        };

        FileRecord {
            path,
            name,
            extension,
            modified,
            exists,
        }
    }
}

/// Error types for save/load operations
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encode error: {0}")]
    BinaryEncode(#[from] rmp_serde::encode::Error),

    #[error("Binary decode error: {0}")]
    BinaryDecode(#[from] rmp_serde::decode::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Unrecognized save file extension: {}", .path.display())]
    UnknownExtension { path: PathBuf },

    #[error("No save record is loaded")]
    NoActiveRecord,

    #[error("No save file is active")]
    NoActiveFile,

    #[error("No matching save file was found")]
    NoSaveFound,
}

impl SaveError {
    /// True for errors that mean "the bytes are not a valid save"
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            SaveError::Json(_) | SaveError::BinaryDecode(_) | SaveError::Xml(_)
        )
    }
}

pub type SaveResult<T> = Result<T, SaveError>;
