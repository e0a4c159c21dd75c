//! Save directory resolution
//!
//! The host supplies the well-known directories through [`HostDirs`]; the
//! resolver picks one per [`SaveLocation`] and appends the configured folder
//! name. Resolution never fails: a directory the host can't provide falls
//! back to the persistent one, and if that is missing too, to the working
//! directory.

use super::settings::Settings;
use super::types::SaveLocation;
use log::warn;
use std::path::PathBuf;

/// Well-known directories provided by the host platform or engine
pub trait HostDirs: Send + Sync {
    /// Per-user writable data directory
    fn persistent_dir(&self) -> Option<PathBuf>;
    /// Directory the application is installed to
    fn application_dir(&self) -> Option<PathBuf>;
    /// The user's documents folder
    fn documents_dir(&self) -> Option<PathBuf>;
}

/// Platform directories for a named application
///
/// | Location        | Source                                      |
/// |-----------------|---------------------------------------------|
/// | PersistentPath  | `dirs::data_local_dir()/<app_name>`         |
/// | ApplicationPath | directory containing the running executable |
/// | Documents       | `dirs::document_dir()`                      |
pub struct SystemDirs {
    app_name: String,
}

impl SystemDirs {
    pub fn new(app_name: impl Into<String>) -> Self {
        SystemDirs {
            app_name: app_name.into(),
        }
    }
}

impl HostDirs for SystemDirs {
    fn persistent_dir(&self) -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join(&self.app_name))
    }

    fn application_dir(&self) -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    }

    fn documents_dir(&self) -> Option<PathBuf> {
        dirs::document_dir()
    }
}

/// Directories handed over explicitly, e.g. by a game engine
#[derive(Debug, Clone, Default)]
pub struct HostPaths {
    pub persistent: Option<PathBuf>,
    pub application: Option<PathBuf>,
    pub documents: Option<PathBuf>,
}

impl HostPaths {
    /// Uses the same root for all three locations
    pub fn all(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        HostPaths {
            persistent: Some(root.clone()),
            application: Some(root.clone()),
            documents: Some(root),
        }
    }
}

impl HostDirs for HostPaths {
    fn persistent_dir(&self) -> Option<PathBuf> {
        self.persistent.clone()
    }

    fn application_dir(&self) -> Option<PathBuf> {
        self.application.clone()
    }

    fn documents_dir(&self) -> Option<PathBuf> {
        self.documents.clone()
    }
}

/// Absolute save directory for `location`
pub fn resolve(location: SaveLocation, settings: &Settings, host: &dyn HostDirs) -> PathBuf {
    let base = match location {
        SaveLocation::PersistentPath => host.persistent_dir(),
        SaveLocation::ApplicationPath => host.application_dir(),
        SaveLocation::Documents => host.documents_dir(),
    };

    let base = match base {
        Some(dir) => dir,
        None => {
            warn!(
                "Couldn't get the directory for {:?}, using the persistent data path instead",
                location
            );
            persistent_or_working_dir(host)
        }
    };

    base.join(&settings.directory_name)
}

fn persistent_or_working_dir(host: &dyn HostDirs) -> PathBuf {
    host.persistent_dir().unwrap_or_else(|| {
        warn!("No persistent data path available, saving relative to the working directory");
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    })
}
