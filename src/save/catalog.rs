//! Save file discovery
//!
//! A `Catalog` is a snapshot of every readable save in one directory, split
//! into manual saves and auto saves. It is rebuilt from scratch on every scan.
//!
//! Ordering is grouped by extension (binary first, then JSON, then XML) and
//! newest-first within each group. It is *not* globally time-sorted; the
//! `newest_*` queries below look at timestamps instead of list position.

use super::codec;
use super::settings::Settings;
use super::types::*;
use log::{debug, error};
use std::fs;
use std::io;
use std::path::Path;

/// A readable save file together with its decoded contents
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub file: FileRecord,
    pub record: SaveRecord,
}

/// Snapshot of the readable saves in a directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    manual: Vec<CatalogEntry>,
    auto: Vec<CatalogEntry>,
}

impl Catalog {
    /// Scan `directory` for save files
    ///
    /// The directory is created if missing. Files that fail to decode with
    /// the codec matching their extension are left out of both lists.
    /// Listing errors are logged and produce an empty catalog.
    pub fn scan(directory: &Path, settings: &Settings) -> Catalog {
        if let Err(e) = fs::create_dir_all(directory) {
            error!("Couldn't create save directory {}: {}", directory.display(), e);
            return Catalog::default();
        }

        let files = match list_files(directory) {
            Ok(files) => files,
            Err(e) => {
                error!("Couldn't list save directory {}: {}", directory.display(), e);
                return Catalog::default();
            }
        };

        let mut catalog = Catalog::default();

        for extension in settings.recognized_extensions() {
            let Some(format) = settings.format_for_extension(extension) else {
                continue;
            };

            let mut candidates: Vec<&FileRecord> =
                files.iter().filter(|f| f.extension == extension).collect();

            // Newest first; the name keeps equal timestamps in a stable order
            candidates.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));

            for file in candidates {
                let record = match codec::read_file(&file.path, format) {
                    Ok(record) => record,
                    Err(e) => {
                        debug!("Skipping unreadable save {}: {}", file.path.display(), e);
                        continue;
                    }
                };

                let entry = CatalogEntry {
                    file: file.clone(),
                    record,
                };

                if settings.is_auto_save_name(&entry.file.name) {
                    catalog.auto.push(entry);
                } else {
                    catalog.manual.push(entry);
                }
            }
        }

        debug!(
            "Scanned {}: {} manual saves, {} auto saves",
            directory.display(),
            catalog.manual.len(),
            catalog.auto.len()
        );

        catalog
    }

    pub fn manual(&self) -> &[CatalogEntry] {
        &self.manual
    }

    pub fn auto(&self) -> &[CatalogEntry] {
        &self.auto
    }

    pub fn len(&self) -> usize {
        self.manual.len() + self.auto.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manual.is_empty() && self.auto.is_empty()
    }

    pub fn newest_manual(&self) -> Option<&CatalogEntry> {
        newest(self.manual.iter())
    }

    pub fn newest_auto(&self) -> Option<&CatalogEntry> {
        newest(self.auto.iter())
    }

    /// Newest auto save whose file name contains `name`
    pub fn newest_auto_named(&self, name: &str) -> Option<&CatalogEntry> {
        newest(self.auto.iter().filter(|e| e.file.name.contains(name)))
    }

    /// Newest exit save
    pub fn newest_exit_save(&self, settings: &Settings) -> Option<&CatalogEntry> {
        self.newest_auto_named(&settings.exit_save_name)
    }

    /// Newest timer auto save, ignoring exit saves
    pub fn newest_plain_auto_save(&self, settings: &Settings) -> Option<&CatalogEntry> {
        newest(
            self.auto
                .iter()
                .filter(|e| !e.file.name.contains(&settings.exit_save_name)),
        )
    }

    /// The save `load(MostRecent)` picks
    ///
    /// Compares the newest manual save against the newest auto save; the
    /// strictly later one wins and a missing side never wins. An exact tie
    /// returns `None`, same as an empty catalog, so the caller starts fresh
    /// instead of depending on directory order.
    pub fn most_recent(&self) -> Option<&CatalogEntry> {
        match (self.newest_manual(), self.newest_auto()) {
            (Some(manual), None) => Some(manual),
            (None, Some(auto)) => Some(auto),
            (Some(manual), Some(auto)) if manual.file.modified > auto.file.modified => Some(manual),
            (Some(manual), Some(auto)) if auto.file.modified > manual.file.modified => Some(auto),
            _ => None,
        }
    }
}

/// Latest entry by last-write time; the earliest in list order wins ties
fn newest<'a>(entries: impl Iterator<Item = &'a CatalogEntry>) -> Option<&'a CatalogEntry> {
    entries.reduce(|best, candidate| {
        if candidate.file.modified > best.file.modified {
            candidate
        } else {
            best
        }
    })
}

fn list_files(directory: &Path) -> io::Result<Vec<FileRecord>> {
    let files = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .map(FileRecord::from_path)
        .collect();

    Ok(files)
}
