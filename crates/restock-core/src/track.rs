//! The persistent track database: one record per factory-shipped file under
//! a local asset root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fingerprint;
use crate::format;

/// Provenance and fingerprints for one tracked file. `path` is relative to
/// the local asset root, `/`-separated, and unique within a database.
/// `version` is an opaque provenance tag, never used in comparisons. Empty
/// fingerprint fields mean "unknown".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub path: String,
    pub version: String,
    pub checksum: String,
    #[serde(default, rename = "hash", skip_serializing_if = "String::is_empty")]
    pub quick_hash: String,
}

impl TrackRecord {
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        version: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            checksum: checksum.into(),
            quick_hash: String::new(),
        }
    }

    /// Does the on-disk file still match this record? The checksum is
    /// authoritative when recorded; the legacy hash is consulted only for
    /// records that never got one. Unverifiable states (both fingerprints
    /// empty, file unreadable) answer `false`.
    #[must_use]
    pub fn verifies(&self, local: &Path) -> bool {
        if !self.checksum.is_empty() {
            return fingerprint::checksum_or_empty(local) == self.checksum;
        }
        if !self.quick_hash.is_empty() {
            return fingerprint::quick_hash_or_empty(local) == self.quick_hash;
        }
        false
    }
}

/// Ordered record list bound to one local asset root. Loading never fails:
/// missing or unrecognizable persisted state yields an empty database, which
/// self-heals on the next successful save.
#[derive(Debug)]
pub struct TrackDb {
    root: PathBuf,
    file_name: String,
    records: Vec<TrackRecord>,
    dirty: bool,
}

impl TrackDb {
    pub fn load(root: &Path, file_name: &str) -> Self {
        let mut db = Self {
            root: root.to_path_buf(),
            file_name: file_name.to_string(),
            records: Vec::new(),
            dirty: false,
        };

        let path = db.db_path();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return db,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read track database");
                return db;
            }
        };

        match format::parse(&text) {
            Some((storage, records)) => {
                debug!(path = %path.display(), ?storage, count = records.len(), "loaded track database");
                db.records = records;
            }
            None => {
                if !text.trim().is_empty() {
                    warn!(path = %path.display(), "unrecognized track database, starting empty");
                }
            }
        }
        db
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.root.join(&self.file_name)
    }

    #[must_use]
    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    /// True when the in-memory records differ from what was last loaded or
    /// saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn knows(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&TrackRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    /// Insert a record, replacing any prior record for the same path.
    /// Re-adding an identical record is a no-op.
    pub fn add(&mut self, record: TrackRecord) {
        if self.get(&record.path) == Some(&record) {
            return;
        }
        self.records.retain(|r| r.path != record.path);
        self.records.push(record);
        self.dirty = true;
    }

    /// Persist all records in the current format via temp-file-then-rename;
    /// a concurrent reader sees either the old file or the new one, never a
    /// torn write. Clears the dirty flag on success.
    pub fn save(&mut self) -> Result<()> {
        let text = format::to_current(&self.records)?;
        self.write_atomic(&text)?;
        self.dirty = false;
        Ok(())
    }

    /// Persist all records in the legacy line format (same atomic strategy).
    pub fn save_legacy(&self) -> Result<()> {
        self.write_atomic(&format::to_legacy(&self.records))
    }

    fn write_atomic(&self, text: &str) -> Result<()> {
        let path = self.db_path();
        let tmp = self.root.join(format!("{}.tmp", self.file_name));

        if let Err(source) = std::fs::write(&tmp, text) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::SaveFailure { path, source });
        }
        if let Err(source) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::SaveFailure { path, source });
        }
        Ok(())
    }

    /// Drop records for files the factory no longer ships, deleting the
    /// local copy when its content still verifies against the recorded
    /// fingerprint. Anything that cannot be verified (diverged content,
    /// unreadable file, both fingerprints empty) is left untouched.
    /// Returns the number of pruned files.
    pub fn adjust(&mut self, factory_root: &Path) -> usize {
        let mut pruned = 0;
        let records = std::mem::take(&mut self.records);
        let mut kept = Vec::with_capacity(records.len());

        for record in records {
            if factory_root.join(&record.path).exists() {
                kept.push(record);
                continue;
            }
            let local = self.root.join(&record.path);
            if !local.exists() || !record.verifies(&local) {
                kept.push(record);
                continue;
            }
            match std::fs::remove_file(&local) {
                Ok(()) => {
                    debug!(path = %record.path, "pruned upstream-removed file");
                    pruned += 1;
                    self.dirty = true;
                }
                Err(e) => {
                    warn!(path = %local.display(), error = %e, "cannot prune file, keeping record");
                    kept.push(record);
                }
            }
        }

        self.records = kept;
        pruned
    }
}
