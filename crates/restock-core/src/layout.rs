//! Where assets live. An [`AssetLayout`] is passed explicitly into every
//! reconciliation pass so a pass is a function of the layout plus filesystem
//! contents, nothing else.

use std::path::PathBuf;

/// Default persisted name of the track database inside a local asset root.
pub const TRACK_FILE_NAME: &str = "file-versions.db";

/// The factory tree, the writable local root, and the two knobs recorded
/// into tracks: the persisted database file name and the provenance tag
/// stamped on new records.
#[derive(Debug, Clone)]
pub struct AssetLayout {
    pub factory_root: PathBuf,
    pub local_root: PathBuf,
    pub track_file: String,
    pub version_tag: String,
}

impl AssetLayout {
    pub fn new(factory_root: impl Into<PathBuf>, local_root: impl Into<PathBuf>) -> Self {
        Self {
            factory_root: factory_root.into(),
            local_root: local_root.into(),
            track_file: TRACK_FILE_NAME.to_string(),
            version_tag: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    #[must_use]
    pub fn with_track_file(mut self, name: impl Into<String>) -> Self {
        self.track_file = name.into();
        self
    }

    #[must_use]
    pub fn with_version_tag(mut self, tag: impl Into<String>) -> Self {
        self.version_tag = tag.into();
        self
    }

    #[must_use]
    pub fn factory_category(&self, category: &str) -> PathBuf {
        self.factory_root.join(category)
    }

    #[must_use]
    pub fn local_category(&self, category: &str) -> PathBuf {
        self.local_root.join(category)
    }

    /// Immediate subdirectory names of the factory root, sorted. An absent
    /// or unreadable factory root yields an empty list.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.factory_root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Per-user writable asset root for `app_name`, under the platform data
/// directory.
#[must_use]
pub fn default_local_root(app_name: &str) -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(app_name))
}
