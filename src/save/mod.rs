//! Save/Load system
//!
//! This module provides a save/load system with:
//! - Three interchangeable encodings: MessagePack, JSON and XML
//! - Configurable save locations (persistent data, install dir, documents)
//! - A catalog of readable saves split into manual and auto saves
//! - Timed auto saves and an exit save for "continue where you left off"
//!
//! # Architecture
//!
//! - `types`: Save record, formats, locations and error types
//! - `settings`: Persisted settings and the settings store
//! - `codec`: Encoding and decoding records
//! - `location`: Resolving save directories from host directories
//! - `clock`: Time source for file name timestamps
//! - `catalog`: Scanning a directory for readable saves
//! - `manager`: SaveManager for file operations and the active record
//! - `autosave`: Timer that drives auto saves
//!
//! # Example Usage
//!
//! ```ignore
//! let settings = SettingsStore::new("settings.json").load_or_create()?;
//! let mut save_manager = SaveManager::with_system_host(settings, "my-game");
//!
//! // Update progress and save over the active file
//! save_manager.active_record_mut().unwrap().player_death_count += 1;
//! save_manager.save()?;
//!
//! // Leave a breadcrumb for the next session
//! save_manager.exit_save()?;
//! ```

pub mod autosave;
pub mod catalog;
pub mod clock;
pub mod codec;
pub mod location;
pub mod manager;
pub mod settings;
pub mod types;

// Re-export commonly used types
pub use autosave::AutoSaveScheduler;
pub use catalog::{Catalog, CatalogEntry};
pub use clock::{Clock, SystemClock};
pub use location::{HostDirs, HostPaths, SystemDirs};
pub use manager::{ActiveState, LoadSelector, SaveManager, SharedSaveManager};
pub use settings::{Settings, SettingsStore};
pub use types::*;
