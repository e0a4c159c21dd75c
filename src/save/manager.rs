//! Save manager for handling save/load operations
//!
//! This module provides the SaveManager struct which handles:
//! - Resolving and creating the save directory
//! - Keeping the catalog of readable saves up to date
//! - Loading the most recent save (or starting a fresh one)
//! - Writing manual, auto and exit saves in any of the three formats
//! - Deleting saves
//!
//! The manager owns the *active record* (what the game is playing) and the
//! *active file* (where a plain `save()` writes it). Every load path hands
//! back a record: a missing or unreadable file means a fresh default record,
//! which is persisted right away.

use super::catalog::{Catalog, CatalogEntry};
use super::clock::{timestamp_suffix, Clock, SystemClock};
use super::codec;
use super::location::{self, HostDirs, SystemDirs};
use super::settings::Settings;
use super::types::*;
use log::{error, info, warn};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A manager shared between the host's main thread and the auto-save timer
pub type SharedSaveManager = Arc<Mutex<SaveManager>>;

/// Whether a record is currently loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveState {
    Uninitialized,
    Loaded,
}

/// Which save `SaveManager::load` should read
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSelector {
    /// Newest of the manual and auto saves in the active directory
    MostRecent,
    /// Newest save in another location's directory
    MostRecentIn(SaveLocation),
    /// A file, decoded according to its extension
    Path(PathBuf),
    /// A file, decoded with an explicit format
    PathWithFormat(PathBuf, SaveFormat),
    /// A file name inside a location's directory
    Named {
        location: SaveLocation,
        name: String,
        format: SaveFormat,
    },
}

pub struct SaveManager {
    settings: Settings,
    host: Box<dyn HostDirs>,
    clock: Box<dyn Clock>,
    directory: PathBuf,
    catalog: Catalog,
    active_record: Option<SaveRecord>,
    active_file: Option<FileRecord>,
    /// Encoding of the active file, which may differ from what its extension says
    active_format: Option<SaveFormat>,
}

impl SaveManager {
    /// Creates a manager without touching the disk
    ///
    /// Nothing is loaded until `initialize` or `load` is called.
    pub fn new(settings: Settings, host: impl HostDirs + 'static, clock: impl Clock + 'static) -> Self {
        let directory = location::resolve(settings.location, &settings, &host);

        SaveManager {
            settings,
            host: Box::new(host),
            clock: Box::new(clock),
            directory,
            catalog: Catalog::default(),
            active_record: None,
            active_file: None,
            active_format: None,
        }
    }

    /// Creates a manager and loads the most recent save into the active slot
    ///
    /// The save directory is created and scanned; if nothing readable is
    /// found a default record is written and becomes active.
    pub fn initialize(settings: Settings, host: impl HostDirs + 'static, clock: impl Clock + 'static) -> Self {
        let mut manager = Self::new(settings, host, clock);

        if let Err(e) = manager.create_directory_if_missing() {
            error!("Couldn't create save directory {}: {}", manager.directory.display(), e);
        }
        manager.load(LoadSelector::MostRecent);

        manager
    }

    /// `initialize` with the platform directories and the system clock
    pub fn with_system_host(settings: Settings, app_name: &str) -> Self {
        Self::initialize(settings, SystemDirs::new(app_name), SystemClock)
    }

    pub fn into_shared(self) -> SharedSaveManager {
        Arc::new(Mutex::new(self))
    }

    // Settings

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings wholesale, then re-resolves the directory and rescans
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;

        if let Err(e) = self.update_directory() {
            error!("Couldn't create save directory {}: {}", self.directory.display(), e);
        }
        self.rescan();
    }

    /// Updates the auto-save fields of the settings
    ///
    /// This only changes configuration; the timer itself is driven by
    /// `AutoSaveScheduler`.
    pub fn set_auto_save(&mut self, enabled: bool, interval_minutes: u32, hide_files: bool) {
        self.settings.auto_save_enabled = enabled;
        self.settings.auto_save_interval_minutes = interval_minutes;
        self.settings.hide_auto_save_files = hide_files;
    }

    // Directories

    /// The active save directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Save directory for any location under the current settings
    pub fn location_dir(&self, location: SaveLocation) -> PathBuf {
        location::resolve(location, &self.settings, self.host.as_ref())
    }

    pub fn directory_exists(&self) -> bool {
        self.directory.is_dir()
    }

    /// Re-resolves the directory from settings and creates it if absent
    pub fn create_directory_if_missing(&mut self) -> SaveResult<()> {
        self.directory = self.location_dir(self.settings.location);
        fs::create_dir_all(&self.directory)?;
        Ok(())
    }

    /// Points the manager at the directory named by the current settings
    pub fn update_directory(&mut self) -> SaveResult<()> {
        self.create_directory_if_missing()
    }

    /// Checks if a file exists at `path`
    pub fn save_file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Checks if a file called `name` exists in a location's directory
    pub fn save_file_exists_in(&self, location: SaveLocation, name: &str) -> bool {
        self.location_dir(location).join(name).is_file()
    }

    /// Checks every location for a file with a recognized extension
    ///
    /// The file is not decoded, so a match doesn't mean it is a valid save.
    pub fn any_save_file_exists(&self) -> bool {
        let extensions = self.settings.recognized_extensions();

        SaveLocation::ALL.iter().any(|&location| {
            let Ok(entries) = fs::read_dir(self.location_dir(location)) else {
                return false;
            };
            entries.filter_map(|entry| entry.ok()).any(|entry| {
                let path = entry.path();
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| extensions.contains(&e))
            })
        })
    }

    // Catalog

    /// Rebuilds the catalog from the active directory
    pub fn rescan(&mut self) -> &Catalog {
        self.catalog = Catalog::scan(&self.directory, &self.settings);
        &self.catalog
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The save `load(LoadSelector::MostRecent)` would pick from the current catalog
    pub fn most_recent(&self) -> Option<&CatalogEntry> {
        self.catalog.most_recent()
    }

    // Active record

    pub fn state(&self) -> ActiveState {
        if self.active_record.is_some() {
            ActiveState::Loaded
        } else {
            ActiveState::Uninitialized
        }
    }

    pub fn active_record(&self) -> Option<&SaveRecord> {
        self.active_record.as_ref()
    }

    /// Mutable access for the game to update progress before saving
    pub fn active_record_mut(&mut self) -> Option<&mut SaveRecord> {
        self.active_record.as_mut()
    }

    /// Replaces the active record, keeping the active file
    pub fn set_active_record(&mut self, record: SaveRecord) {
        self.active_record = Some(record);
    }

    pub fn active_file(&self) -> Option<&FileRecord> {
        self.active_file.as_ref()
    }

    /// Format the active file was loaded or written with
    pub fn active_format(&self) -> Option<SaveFormat> {
        self.active_format
    }

    /// Forgets the active record and file without touching the disk
    pub fn clear_active(&mut self) {
        self.active_record = None;
        self.active_file = None;
        self.active_format = None;
    }

    // Saving

    /// Overwrites the active file with the active record
    ///
    /// The file keeps its name and the format it was loaded or written with,
    /// falling back to its extension. Without an active file the record
    /// goes to `<default_name>.<ext>` in the active directory using the
    /// configured format.
    pub fn save(&mut self) -> SaveResult<PathBuf> {
        let Some(record) = self.active_record.as_ref() else {
            warn!("No save record is loaded, nothing was saved");
            return Err(SaveError::NoActiveRecord);
        };

        let (path, format, hidden) = match &self.active_file {
            Some(file) => {
                let format = self
                    .active_format
                    .or_else(|| self.settings.format_for_extension(&file.extension))
                    .unwrap_or(self.settings.format);
                let hidden = self.settings.hide_auto_save_files && self.settings.is_auto_save_name(&file.name);
                (file.path.clone(), format, hidden)
            }
            None => {
                let format = self.settings.format;
                let name = format!("{}.{}", self.settings.default_name, self.settings.extension_for(format));
                (self.directory.join(name), format, false)
            }
        };

        write_record(&path, record, format, hidden)
            .inspect_err(|e| error!("Couldn't save to {}: {}", path.display(), e))?;
        info!("Saved {}", path.display());

        self.active_file = Some(FileRecord::from_path(&path));
        self.active_format = Some(format);
        self.rescan();
        Ok(path)
    }

    /// Writes `record` to a new file in a location's directory
    ///
    /// The file is `<name>[ HH-mm-ss_MM-dd-yyyy].<ext>`; an empty name uses the
    /// configured default name. The active record and file are not changed.
    pub fn save_as(
        &mut self,
        record: &SaveRecord,
        format: SaveFormat,
        location: SaveLocation,
        name: &str,
        append_timestamp: bool,
    ) -> SaveResult<PathBuf> {
        let directory = self.location_dir(location);
        self.write_new(record, format, &directory, name, append_timestamp, false)
    }

    /// Writes the active record to a new file using the configured format and location
    pub fn save_active_as(&mut self, name: &str, append_timestamp: bool) -> SaveResult<PathBuf> {
        let (format, location) = (self.settings.format, self.settings.location);
        self.save_active_to(name, format, location, append_timestamp)
    }

    /// Writes the active record to a new file with an explicit format and location
    pub fn save_active_to(
        &mut self,
        name: &str,
        format: SaveFormat,
        location: SaveLocation,
        append_timestamp: bool,
    ) -> SaveResult<PathBuf> {
        let Some(record) = self.active_record.clone() else {
            warn!("No save record is loaded, nothing was saved");
            return Err(SaveError::NoActiveRecord);
        };
        self.save_as(&record, format, location, name, append_timestamp)
    }

    /// Writes the active record as a timestamped auto save
    pub fn auto_save(&mut self) -> SaveResult<PathBuf> {
        self.write_auto_save("")
    }

    /// Writes the active record as an exit save
    ///
    /// Meant to be called when the player quits, so the next session can
    /// find where they left off.
    pub fn exit_save(&mut self) -> SaveResult<PathBuf> {
        let name = self.settings.exit_save_name.clone();
        self.write_auto_save(&name)
    }

    fn write_auto_save(&mut self, name: &str) -> SaveResult<PathBuf> {
        let Some(record) = self.active_record.clone() else {
            warn!("No save record is loaded, the auto save was skipped");
            return Err(SaveError::NoActiveRecord);
        };

        let (format, location) = (self.settings.format, self.settings.location);
        let directory = self.location_dir(location);
        self.write_new(&record, format, &directory, name, true, true)
    }

    fn write_new(
        &mut self,
        record: &SaveRecord,
        format: SaveFormat,
        directory: &Path,
        name: &str,
        append_timestamp: bool,
        auto_save: bool,
    ) -> SaveResult<PathBuf> {
        let base = if name.is_empty() && !auto_save {
            self.settings.default_name.as_str()
        } else {
            name
        };
        let suffix = if append_timestamp {
            timestamp_suffix(&self.clock.now())
        } else {
            String::new()
        };
        let extension = self.settings.extension_for(format);

        let hidden = auto_save && self.settings.hide_auto_save_files;
        let file_name = if auto_save {
            format!("{}{}{}.{}", self.settings.auto_save_prefix, base, suffix, extension)
        } else {
            format!("{}{}.{}", base, suffix, extension)
        };
        let file_name = if hidden { hidden_file_name(file_name) } else { file_name };

        let path = directory.join(file_name);
        write_record(&path, record, format, hidden)
            .inspect_err(|e| error!("Couldn't save to {}: {}", path.display(), e))?;
        info!("Saved {}", path.display());

        if self.active_file.as_ref().is_some_and(|f| f.path == path) {
            self.active_file = Some(FileRecord::from_path(&path));
            self.active_format = Some(format);
        }
        self.rescan();
        Ok(path)
    }

    // Loading

    /// Loads a save into the active slot and returns it
    ///
    /// Always yields a record. When the selected save is missing, has an
    /// unrecognized extension, or fails to decode, a default record is
    /// created, persisted and made active instead.
    pub fn load(&mut self, selector: LoadSelector) -> SaveRecord {
        match selector {
            LoadSelector::MostRecent => {
                self.rescan();
                match self.catalog.most_recent().map(|e| e.file.path.clone()) {
                    Some(path) => self.load_path(&path, None),
                    None => {
                        info!("No save was found, creating a new save");
                        self.start_fresh()
                    }
                }
            }
            LoadSelector::MostRecentIn(location) => {
                let catalog = Catalog::scan(&self.location_dir(location), &self.settings);
                match catalog.most_recent().map(|e| e.file.path.clone()) {
                    Some(path) => self.load_path(&path, None),
                    None => {
                        info!("No save was found in {:?}, creating a new save", location);
                        self.start_fresh()
                    }
                }
            }
            LoadSelector::Path(path) => self.load_path(&path, None),
            LoadSelector::PathWithFormat(path, format) => self.load_path(&path, Some(format)),
            LoadSelector::Named { location, name, format } => {
                let path = self.location_dir(location).join(name);
                self.load_path(&path, Some(format))
            }
        }
    }

    /// Loads the newest exit save; `None` if there isn't one
    pub fn load_latest_exit_save(&mut self) -> Option<SaveRecord> {
        self.rescan();
        let path = self.catalog.newest_exit_save(&self.settings)?.file.path.clone();
        Some(self.load_path(&path, None))
    }

    /// Loads the newest timer auto save (exit saves excluded); `None` if there isn't one
    pub fn load_latest_auto_save(&mut self) -> Option<SaveRecord> {
        self.rescan();
        let path = self.catalog.newest_plain_auto_save(&self.settings)?.file.path.clone();
        Some(self.load_path(&path, None))
    }

    /// Loads the newest auto save whose name contains `name`; `None` if there isn't one
    pub fn load_auto_save_named(&mut self, name: &str) -> Option<SaveRecord> {
        self.rescan();
        let path = self.catalog.newest_auto_named(name)?.file.path.clone();
        Some(self.load_path(&path, None))
    }

    /// Reads a save without making it active
    pub fn read_save(&self, path: &Path) -> SaveResult<SaveRecord> {
        let format = self
            .settings
            .format_for_path(path)
            .ok_or_else(|| SaveError::UnknownExtension { path: path.to_path_buf() })?;
        codec::read_file(path, format)
    }

    /// Reads the save `load(LoadSelector::MostRecent)` would pick, without making it active
    pub fn read_most_recent(&self) -> SaveResult<SaveRecord> {
        let entry = self.catalog.most_recent().ok_or(SaveError::NoSaveFound)?;
        Ok(entry.record.clone())
    }

    fn load_path(&mut self, path: &Path, format: Option<SaveFormat>) -> SaveRecord {
        if !path.is_file() {
            warn!("Save file {} could not be found, creating a new save", path.display());
            return self.start_fresh();
        }

        let Some(format) = format.or_else(|| self.settings.format_for_path(path)) else {
            warn!("{} is not a recognized save file, creating a new save", path.display());
            return self.start_fresh();
        };

        match codec::read_file(path, format) {
            Ok(record) => {
                info!("Loaded {}", path.display());
                self.active_record = Some(record.clone());
                self.active_file = Some(FileRecord::from_path(path));
                self.active_format = Some(format);
                record
            }
            Err(e) => {
                warn!(
                    "{} was found but couldn't be read as a save ({}), creating a new save",
                    path.display(),
                    e
                );
                self.start_fresh()
            }
        }
    }

    /// Makes a default record active and persists it under the default name
    fn start_fresh(&mut self) -> SaveRecord {
        let record = SaveRecord::default();
        self.active_record = Some(record.clone());
        self.active_file = None;
        self.active_format = None;

        let format = self.settings.format;
        let directory = self.directory.clone();
        let name = self.settings.default_name.clone();
        match self.write_new(&record, format, &directory, &name, true, false) {
            Ok(path) => {
                self.active_file = Some(FileRecord::from_path(&path));
                self.active_format = Some(format);
            }
            Err(e) => error!("Couldn't persist the new save: {}", e),
        }

        record
    }

    // Deleting

    /// Deletes a save file
    ///
    /// If it was the active file, the active record and file are cleared.
    /// On failure nothing in memory changes.
    pub fn delete(&mut self, path: &Path) -> SaveResult<()> {
        if let Err(e) = fs::remove_file(path) {
            error!("Couldn't delete {}: {}", path.display(), e);
            return Err(e.into());
        }
        info!("Deleted {}", path.display());

        if self.active_file.as_ref().is_some_and(|f| f.path == path) {
            self.clear_active();
        }
        self.rescan();
        Ok(())
    }

    /// Deletes the active file and clears the active state
    pub fn delete_active(&mut self) -> SaveResult<()> {
        let Some(path) = self.active_file.as_ref().map(|f| f.path.clone()) else {
            warn!("No save file is active, nothing was deleted");
            return Err(SaveError::NoActiveFile);
        };
        self.delete(&path)
    }
}

/// Marks a file name as hidden on platforms that hide dot files
#[cfg(not(windows))]
fn hidden_file_name(file_name: String) -> String {
    if file_name.starts_with('.') {
        file_name
    } else {
        format!(".{}", file_name)
    }
}

/// Windows hides through a file attribute instead, see `create_file`
#[cfg(windows)]
fn hidden_file_name(file_name: String) -> String {
    file_name
}

/// Writes an encoded record to `path`
///
/// The data goes to a temporary sibling first and is renamed into place,
/// so a failed write never leaves a half-written save behind.
fn write_record(path: &Path, record: &SaveRecord, format: SaveFormat, hidden: bool) -> SaveResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = codec::encode(record, format)?;
    let temp_path = path.with_extension("tmp");

    let written = (|| -> io::Result<()> {
        let mut file = create_file(&temp_path, hidden)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

#[cfg(windows)]
fn create_file(path: &Path, hidden: bool) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    let mut options = File::options();
    options.write(true).create(true).truncate(true);
    if hidden {
        options.attributes(FILE_ATTRIBUTE_HIDDEN);
    }
    options.open(path)
}

#[cfg(not(windows))]
fn create_file(path: &Path, _hidden: bool) -> io::Result<File> {
    File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::location::HostPaths;
    use crate::save::clock::StepClock;
    use tempfile::TempDir;

    fn json_settings() -> Settings {
        Settings {
            format: SaveFormat::Json,
            ..Settings::default()
        }
    }

    fn manager_in(temp_dir: &TempDir, settings: Settings) -> SaveManager {
        SaveManager::initialize(settings, HostPaths::all(temp_dir.path()), StepClock::new())
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_new_does_not_touch_disk() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SaveManager::new(Settings::default(), HostPaths::all(temp_dir.path()), StepClock::new());

        assert_eq!(manager.state(), ActiveState::Uninitialized);
        assert!(!manager.directory_exists());
        assert_eq!(manager.directory(), temp_dir.path().join("Save Data"));
    }

    #[test]
    fn test_initialize_on_empty_directory_creates_default_save() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir, json_settings());

        assert_eq!(manager.state(), ActiveState::Loaded);
        assert_eq!(manager.active_record(), Some(&SaveRecord::default()));
        assert_eq!(files_in(manager.directory()), vec!["save 12-00-00_05-01-2024.json"]);
        assert_eq!(manager.active_file().unwrap().name, "save 12-00-00_05-01-2024.json");
        assert_eq!(manager.catalog().manual().len(), 1);
    }

    #[test]
    fn test_save_overwrites_active_file_in_its_own_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let active_path = manager.active_file().unwrap().path.clone();

        // Switching the configured format must not change the existing file's encoding
        let mut settings = json_settings();
        settings.format = SaveFormat::Xml;
        manager.update_settings(settings);

        manager.active_record_mut().unwrap().player_death_count = 4;
        let saved = manager.save().unwrap();

        assert_eq!(saved, active_path);
        let reloaded = codec::read_file(&saved, SaveFormat::Json).unwrap();
        assert_eq!(reloaded.player_death_count, 4);
        assert_eq!(files_in(manager.directory()).len(), 1);
    }

    #[test]
    fn test_save_without_active_record_is_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SaveManager::new(json_settings(), HostPaths::all(temp_dir.path()), StepClock::new());

        assert!(matches!(manager.save(), Err(SaveError::NoActiveRecord)));
        assert!(!manager.directory_exists());
    }

    #[test]
    fn test_save_without_active_file_uses_default_name() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SaveManager::new(json_settings(), HostPaths::all(temp_dir.path()), StepClock::new());
        manager.set_active_record(SaveRecord::default());

        let path = manager.save().unwrap();

        assert_eq!(path.file_name().unwrap(), "save.json");
        assert_eq!(manager.active_file().unwrap().path, path);
    }

    #[test]
    fn test_save_as_appends_timestamp_and_keeps_active_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let active_before = manager.active_file().cloned();

        let record = SaveRecord {
            player_name: "Quill".to_string(),
            ..SaveRecord::default()
        };
        let path = manager
            .save_as(&record, SaveFormat::Xml, SaveLocation::PersistentPath, "slot", true)
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "slot 12-00-01_05-01-2024.xml");
        assert_eq!(manager.active_file().cloned(), active_before);
        assert_eq!(codec::read_file(&path, SaveFormat::Xml).unwrap(), record);
        assert_eq!(manager.catalog().manual().len(), 2);
    }

    #[test]
    fn test_save_as_without_timestamp_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());

        let first = manager
            .save_as(&SaveRecord::default(), SaveFormat::Binary, SaveLocation::Documents, "fixed", false)
            .unwrap();
        let second = manager
            .save_as(&SaveRecord::default(), SaveFormat::Binary, SaveLocation::Documents, "fixed", false)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.file_name().unwrap(), "fixed.oncgm");
    }

    #[test]
    fn test_save_active_as_requires_active_record() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        manager.clear_active();

        assert!(matches!(manager.save_active_as("x", true), Err(SaveError::NoActiveRecord)));
        assert_eq!(manager.state(), ActiveState::Uninitialized);
    }

    #[test]
    fn test_auto_and_exit_saves_are_prefixed() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());

        let auto = manager.auto_save().unwrap();
        let exit = manager.exit_save().unwrap();

        assert_eq!(auto.file_name().unwrap(), "auto save -  12-00-01_05-01-2024.json");
        assert_eq!(exit.file_name().unwrap(), "auto save - exit save 12-00-02_05-01-2024.json");
        assert_eq!(manager.catalog().auto().len(), 2);
        assert_eq!(manager.catalog().manual().len(), 1);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_hidden_auto_saves_are_dot_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = json_settings();
        settings.hide_auto_save_files = true;
        let mut manager = manager_in(&temp_dir, settings);

        let auto = manager.auto_save().unwrap();

        assert!(auto.file_name().unwrap().to_string_lossy().starts_with(".auto save - "));
        assert_eq!(manager.catalog().auto().len(), 1);
    }

    #[test]
    fn test_load_corrupt_path_starts_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let corrupt = manager.directory().join("broken.json");
        fs::write(&corrupt, "{{{{").unwrap();

        let record = manager.load(LoadSelector::Path(corrupt.clone()));

        assert_eq!(record, SaveRecord::default());
        assert_ne!(manager.active_file().unwrap().path, corrupt);
        assert!(corrupt.exists());
    }

    #[test]
    fn test_load_with_explicit_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let record = SaveRecord {
            difficulty: 5,
            ..SaveRecord::default()
        };
        // A binary payload behind an unrelated extension
        let path = manager.directory().join("imported.dat");
        fs::write(&path, codec::encode(&record, SaveFormat::Binary).unwrap()).unwrap();

        let loaded = manager.load(LoadSelector::PathWithFormat(path.clone(), SaveFormat::Binary));

        assert_eq!(loaded, record);
        assert_eq!(manager.active_file().unwrap().path, path);
    }

    #[test]
    fn test_save_keeps_format_chosen_at_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let path = manager.directory().join("imported.dat");
        fs::write(&path, codec::encode(&SaveRecord::default(), SaveFormat::Binary).unwrap()).unwrap();
        manager.load(LoadSelector::PathWithFormat(path.clone(), SaveFormat::Binary));

        manager.active_record_mut().unwrap().difficulty = 7;
        let saved = manager.save().unwrap();

        assert_eq!(saved, path);
        assert_eq!(manager.active_format(), Some(SaveFormat::Binary));
        assert_eq!(codec::read_file(&path, SaveFormat::Binary).unwrap().difficulty, 7);
        let reloaded = manager.load(LoadSelector::PathWithFormat(path, SaveFormat::Binary));
        assert_eq!(reloaded.difficulty, 7);
    }

    #[test]
    fn test_save_keeps_format_of_named_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let path = manager.directory().join("slot.sav");
        fs::write(&path, codec::encode(&SaveRecord::default(), SaveFormat::Xml).unwrap()).unwrap();
        manager.load(LoadSelector::Named {
            location: SaveLocation::PersistentPath,
            name: "slot.sav".to_string(),
            format: SaveFormat::Xml,
        });

        manager.active_record_mut().unwrap().lod_level = 4;
        manager.save().unwrap();

        assert_eq!(codec::read_file(&path, SaveFormat::Xml).unwrap().lod_level, 4);
    }

    #[test]
    fn test_clear_active_forgets_format() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        assert_eq!(manager.active_format(), Some(SaveFormat::Json));

        manager.clear_active();

        assert_eq!(manager.active_format(), None);
    }

    #[test]
    fn test_load_unknown_extension_by_path_starts_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let path = manager.directory().join("imported.dat");
        fs::write(&path, codec::encode(&SaveRecord::default(), SaveFormat::Binary).unwrap()).unwrap();

        manager.load(LoadSelector::Path(path.clone()));

        assert_ne!(manager.active_file().unwrap().path, path);
    }

    #[test]
    fn test_load_named_in_other_location() {
        let temp_dir = TempDir::new().unwrap();
        let docs = TempDir::new().unwrap();
        let host = HostPaths {
            documents: Some(docs.path().to_path_buf()),
            ..HostPaths::all(temp_dir.path())
        };
        let mut manager = SaveManager::initialize(json_settings(), host, StepClock::new());
        let record = SaveRecord {
            lod_level: 3,
            ..SaveRecord::default()
        };
        manager
            .save_as(&record, SaveFormat::Xml, SaveLocation::Documents, "shared", false)
            .unwrap();

        let loaded = manager.load(LoadSelector::Named {
            location: SaveLocation::Documents,
            name: "shared.xml".to_string(),
            format: SaveFormat::Xml,
        });

        assert_eq!(loaded, record);
        assert!(manager.save_file_exists_in(SaveLocation::Documents, "shared.xml"));
    }

    #[test]
    fn test_load_most_recent_in_other_location() {
        let temp_dir = TempDir::new().unwrap();
        let docs = TempDir::new().unwrap();
        let host = HostPaths {
            documents: Some(docs.path().to_path_buf()),
            ..HostPaths::all(temp_dir.path())
        };
        let mut manager = SaveManager::initialize(json_settings(), host, StepClock::new());
        let record = SaveRecord {
            player_name: "Docs".to_string(),
            ..SaveRecord::default()
        };
        manager
            .save_as(&record, SaveFormat::Binary, SaveLocation::Documents, "", true)
            .unwrap();

        assert_eq!(manager.load(LoadSelector::MostRecentIn(SaveLocation::Documents)), record);
    }

    #[test]
    fn test_read_save_does_not_change_active_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let active_before = manager.active_file().cloned();
        let path = manager
            .save_as(&SaveRecord::default(), SaveFormat::Binary, SaveLocation::PersistentPath, "peek", false)
            .unwrap();

        assert_eq!(manager.read_save(&path).unwrap(), SaveRecord::default());
        assert_eq!(manager.active_file().cloned(), active_before);
    }

    #[test]
    fn test_read_save_rejects_unknown_extension() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir, json_settings());
        let path = manager.directory().join("notes.txt");
        fs::write(&path, "hello").unwrap();

        assert!(matches!(manager.read_save(&path), Err(SaveError::UnknownExtension { .. })));
    }

    #[test]
    fn test_read_most_recent_on_empty_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SaveManager::new(json_settings(), HostPaths::all(temp_dir.path()), StepClock::new());
        manager.create_directory_if_missing().unwrap();
        manager.rescan();

        assert!(matches!(manager.read_most_recent(), Err(SaveError::NoSaveFound)));
    }

    #[test]
    fn test_exit_save_lookup_on_empty_catalog_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let active_before = manager.active_file().cloned();

        assert!(manager.load_latest_exit_save().is_none());
        assert!(manager.load_latest_auto_save().is_none());
        assert!(manager.load_auto_save_named("missing").is_none());
        assert_eq!(manager.active_file().cloned(), active_before);
    }

    #[test]
    fn test_exit_save_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        manager.active_record_mut().unwrap().total_time_in_game = 99.5;
        let exit_path = manager.exit_save().unwrap();
        manager.active_record_mut().unwrap().total_time_in_game = 0.0;
        manager.auto_save().unwrap();

        let loaded = manager.load_latest_exit_save().unwrap();

        assert_eq!(loaded.total_time_in_game, 99.5);
        assert_eq!(manager.active_file().unwrap().path, exit_path);
        assert_eq!(manager.load_latest_auto_save().unwrap().total_time_in_game, 0.0);
    }

    #[test]
    fn test_delete_active_clears_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let path = manager.active_file().unwrap().path.clone();

        manager.delete_active().unwrap();

        assert!(!path.exists());
        assert_eq!(manager.state(), ActiveState::Uninitialized);
        assert!(manager.active_file().is_none());
        assert!(manager.catalog().is_empty());
    }

    #[test]
    fn test_failed_delete_keeps_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let path = manager.active_file().unwrap().path.clone();
        fs::remove_file(&path).unwrap();

        assert!(matches!(manager.delete_active(), Err(SaveError::Io(_))));
        assert_eq!(manager.state(), ActiveState::Loaded);
        assert_eq!(manager.active_file().unwrap().path, path);
    }

    #[test]
    fn test_delete_other_file_keeps_active_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        let other = manager.auto_save().unwrap();

        manager.delete(&other).unwrap();

        assert_eq!(manager.state(), ActiveState::Loaded);
        assert!(manager.catalog().auto().is_empty());
    }

    #[test]
    fn test_delete_active_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SaveManager::new(json_settings(), HostPaths::all(temp_dir.path()), StepClock::new());

        assert!(matches!(manager.delete_active(), Err(SaveError::NoActiveFile)));
    }

    #[test]
    fn test_directory_operations_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SaveManager::new(json_settings(), HostPaths::all(temp_dir.path()), StepClock::new());

        manager.create_directory_if_missing().unwrap();
        manager.create_directory_if_missing().unwrap();
        manager.update_directory().unwrap();

        assert!(manager.directory_exists());
    }

    #[test]
    fn test_update_settings_moves_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());

        let mut settings = json_settings();
        settings.directory_name = "Other Saves".to_string();
        manager.update_settings(settings);

        assert_eq!(manager.directory(), temp_dir.path().join("Other Saves"));
        assert!(manager.directory_exists());
        assert!(manager.catalog().is_empty());
    }

    #[test]
    fn test_any_save_file_exists_ignores_readability() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SaveManager::new(json_settings(), HostPaths::all(temp_dir.path()), StepClock::new());
        assert!(!manager.any_save_file_exists());

        manager.create_directory_if_missing().unwrap();
        fs::write(manager.directory().join("junk.xml"), "junk").unwrap();

        assert!(manager.any_save_file_exists());
        assert!(manager.rescan().is_empty());
    }

    #[test]
    fn test_set_auto_save_updates_settings() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());

        manager.set_auto_save(false, 30, true);

        assert!(!manager.settings().auto_save_enabled);
        assert_eq!(manager.settings().auto_save_interval_minutes, 30);
        assert!(manager.settings().hide_auto_save_files);
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = manager_in(&temp_dir, json_settings());
        // A directory squatting on the target name makes the rename fail
        let target = manager.directory().join("blocked.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let result = manager.save_as(&SaveRecord::default(), SaveFormat::Json, SaveLocation::PersistentPath, "blocked", false);

        assert!(matches!(result, Err(SaveError::Io(_))));
        assert!(!manager.directory().join("blocked.tmp").exists());
    }
}
