//! The reconciliation pass: bring one local asset category into alignment
//! with its factory counterpart without destroying user work.
//!
//! The factory category subtree is walked in sorted order and each file goes
//! through the decision logic in [`reconcile_file`]. Afterwards
//! [`TrackDb::adjust`] prunes upstream-removed files, and the database is
//! persisted once, and only if anything actually changed, so a repeated pass
//! performs zero writes and leaves the persisted database byte-identical.

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fingerprint;
use crate::layout::AssetLayout;
use crate::track::{TrackDb, TrackRecord};

/// Localized text resources are never auto-copied; their lifecycle belongs
/// to the translation loader.
pub const LOCALIZED_CATEGORY: &str = "translations";

/// What one pass did, per file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// New factory files copied into the local tree.
    pub copied: u32,
    /// Pre-existing identical local files adopted without copying.
    pub adopted: u32,
    /// Tracked files already in sync; record refreshed in place.
    pub refreshed: u32,
    /// Untouched tracked files replaced by newer factory content.
    pub overwritten: u32,
    /// User-modified tracked files left alone.
    pub kept: u32,
    /// Unknown local files left untracked.
    pub untracked: u32,
    /// User-deleted tracked files left absent.
    pub tombstones: u32,
    /// Upstream-removed, untouched files deleted by `adjust`.
    pub pruned: u32,
}

impl PassSummary {
    /// Number of filesystem mutations the pass performed.
    #[must_use]
    pub const fn changes(&self) -> u32 {
        self.copied + self.overwritten + self.pruned
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} adopted, {} updated, {} pruned, {} kept",
            self.copied,
            self.adopted,
            self.overwritten,
            self.pruned,
            self.kept + self.untracked
        )
    }
}

/// The category path request: resolve the local path for `category`,
/// reconciling it first when `synchronize` is set. Never fails: a failed
/// pass is logged and the (possibly not-yet-synced) path is returned anyway.
#[must_use]
pub fn asset_path(layout: &AssetLayout, category: &str, synchronize: bool) -> std::path::PathBuf {
    if synchronize {
        if let Err(e) = sync_category(layout, category) {
            warn!(category, error = %e, "category not synchronized");
        }
    }
    layout.local_category(category)
}

/// Run one reconciliation pass for `category`.
///
/// A missing factory category is a no-op. The localized-text category is
/// always skipped. If the local category directory cannot be created the
/// pass aborts before touching any file or the database.
pub fn sync_category(layout: &AssetLayout, category: &str) -> Result<PassSummary> {
    let mut summary = PassSummary::default();

    if category == LOCALIZED_CATEGORY {
        debug!(category, "localized category, skipping");
        return Ok(summary);
    }

    let factory_category = layout.factory_category(category);
    if !factory_category.is_dir() {
        debug!(category, "no factory category, nothing to do");
        return Ok(summary);
    }

    let local_category = layout.local_category(category);
    std::fs::create_dir_all(&local_category).map_err(|source| Error::DestinationUnavailable {
        path: local_category.clone(),
        source,
    })?;

    let mut db = TrackDb::load(&layout.local_root, &layout.track_file);

    let mut files = Vec::new();
    collect_files(&factory_category, category, &mut files);
    for rel in &files {
        reconcile_file(layout, &mut db, rel, &mut summary);
    }

    summary.pruned = u32::try_from(db.adjust(&layout.factory_root)).unwrap_or(u32::MAX);

    if db.is_dirty() {
        if let Err(e) = db.save() {
            warn!(category, error = %e, "track database not saved, will retry next pass");
        }
    }

    debug!(category, ?summary, "pass complete");
    Ok(summary)
}

/// Recursively gather root-relative file paths under `dir`, sorted, so a
/// pass visits files in a deterministic order.
fn collect_files(dir: &Path, prefix: &str, out: &mut Vec<String>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot read factory directory");
            return;
        }
    };

    let mut entries: Vec<_> = entries.filter_map(std::result::Result::ok).collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = format!("{prefix}/{name}");
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, &rel, out);
        } else {
            out.push(rel);
        }
    }
}

/// The per-file decision. `rel` is the root-relative path of a factory file.
///
/// The rules, in order:
/// - an uncomputable factory checksum forces a skip (nothing destructive can
///   be justified without it);
/// - unknown path: copy if the local file is absent, adopt if it is present
///   with identical content, otherwise leave it untracked;
/// - known path, local file gone: the user deleted it; the record stays as a
///   tombstone so the file is never resurrected;
/// - known path, local matches factory: refresh the record, no copy;
/// - known path, local still matches its record: the user never touched it
///   and the factory moved on, so the new factory content wins;
/// - anything else is a user modification (or unverifiable) and is left
///   strictly alone.
fn reconcile_file(layout: &AssetLayout, db: &mut TrackDb, rel: &str, summary: &mut PassSummary) {
    let factory_file = layout.factory_root.join(rel);
    let local_file = layout.local_root.join(rel);

    let factory_sum = fingerprint::checksum_or_empty(&factory_file);
    if factory_sum.is_empty() {
        warn!(path = rel, "factory file unreadable, skipping");
        return;
    }

    let Some(record) = db.get(rel).cloned() else {
        if local_file.exists() {
            if fingerprint::checksum_or_empty(&local_file) == factory_sum {
                db.add(TrackRecord::new(rel, &layout.version_tag, factory_sum));
                summary.adopted += 1;
                debug!(path = rel, "adopted identical local file");
            } else {
                summary.untracked += 1;
                debug!(path = rel, "local file differs and is untracked, leaving alone");
            }
        } else if copy_into_place(&factory_file, &local_file) {
            db.add(TrackRecord::new(rel, &layout.version_tag, factory_sum));
            summary.copied += 1;
            debug!(path = rel, "copied new factory file");
        }
        return;
    };

    if !local_file.exists() {
        summary.tombstones += 1;
        debug!(path = rel, "user-deleted file, not recreating");
        return;
    }

    let local_sum = fingerprint::checksum_or_empty(&local_file);
    if local_sum == factory_sum {
        db.add(TrackRecord::new(rel, &layout.version_tag, factory_sum));
        summary.refreshed += 1;
    } else if record.verifies(&local_file) {
        // Untouched since the last sync while the factory moved on.
        if replace_file(&factory_file, &local_file) {
            db.add(TrackRecord::new(rel, &layout.version_tag, factory_sum));
            summary.overwritten += 1;
            debug!(path = rel, "updated to new factory content");
        }
    } else {
        summary.kept += 1;
        debug!(path = rel, "user-modified file, leaving alone");
    }
}

fn copy_into_place(factory_file: &Path, local_file: &Path) -> bool {
    if let Some(parent) = local_file.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(path = %parent.display(), error = %e, "cannot create directory");
            return false;
        }
    }
    match std::fs::copy(factory_file, local_file) {
        Ok(_) => true,
        Err(e) => {
            warn!(path = %local_file.display(), error = %e, "cannot copy factory file");
            false
        }
    }
}

fn replace_file(factory_file: &Path, local_file: &Path) -> bool {
    if let Err(e) = std::fs::remove_file(local_file) {
        warn!(path = %local_file.display(), error = %e, "cannot remove outdated file");
        return false;
    }
    copy_into_place(factory_file, local_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn setup() -> (TempDir, AssetLayout) {
        let dir = TempDir::new().unwrap();
        let factory = dir.path().join("factory");
        let local = dir.path().join("local");
        std::fs::create_dir_all(&factory).unwrap();
        std::fs::create_dir_all(&local).unwrap();
        let layout = AssetLayout::new(factory, local).with_version_tag("test-tag");
        (dir, layout)
    }

    fn write_factory(layout: &AssetLayout, rel: &str, content: &str) {
        let path = layout.factory_root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn local(layout: &AssetLayout, rel: &str) -> PathBuf {
        layout.local_root.join(rel)
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    fn db(layout: &AssetLayout) -> TrackDb {
        TrackDb::load(&layout.local_root, &layout.track_file)
    }

    #[test]
    fn first_pass_copies_and_records() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");

        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.copied, 1);
        assert_eq!(read(&local(&layout, "completion/abbrev.txt")), "abc");

        let db = db(&layout);
        let rec = db.get("completion/abbrev.txt").unwrap();
        assert_eq!(rec.checksum, ABC_SHA256);
        assert_eq!(rec.version, "test-tag");
        assert_eq!(rec.quick_hash, "");
    }

    #[test]
    fn second_pass_is_idempotent() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        write_factory(&layout, "completion/keywords.txt", "def");

        sync_category(&layout, "completion").unwrap();
        let db_path = layout.local_root.join(&layout.track_file);
        let db_bytes = std::fs::read(&db_path).unwrap();
        let db_mtime = std::fs::metadata(&db_path).unwrap().modified().unwrap();

        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.changes(), 0);
        assert_eq!(summary.refreshed, 2);
        assert_eq!(std::fs::read(&db_path).unwrap(), db_bytes);
        assert_eq!(
            std::fs::metadata(&db_path).unwrap().modified().unwrap(),
            db_mtime
        );
    }

    #[test]
    fn adopts_identical_local_file_without_copy() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        std::fs::create_dir_all(local(&layout, "completion")).unwrap();
        std::fs::write(local(&layout, "completion/abbrev.txt"), "abc").unwrap();

        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.copied, 0);
        assert_eq!(summary.adopted, 1);
        assert_eq!(db(&layout).get("completion/abbrev.txt").unwrap().checksum, ABC_SHA256);
    }

    #[test]
    fn differing_untracked_local_file_stays_untracked() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        std::fs::create_dir_all(local(&layout, "completion")).unwrap();
        std::fs::write(local(&layout, "completion/abbrev.txt"), "the user's own file").unwrap();

        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.untracked, 1);
        assert_eq!(
            read(&local(&layout, "completion/abbrev.txt")),
            "the user's own file"
        );
        assert!(!db(&layout).knows("completion/abbrev.txt"));
    }

    #[test]
    fn deleted_file_is_not_resurrected() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        sync_category(&layout, "completion").unwrap();

        std::fs::remove_file(local(&layout, "completion/abbrev.txt")).unwrap();
        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.tombstones, 1);
        assert_eq!(summary.copied, 0);
        assert!(!local(&layout, "completion/abbrev.txt").exists());
        // the record survives as a tombstone
        assert!(db(&layout).knows("completion/abbrev.txt"));
    }

    #[test]
    fn upstream_wins_when_untouched() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        sync_category(&layout, "completion").unwrap();

        write_factory(&layout, "completion/abbrev.txt", "abc v2");
        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.overwritten, 1);
        assert_eq!(read(&local(&layout, "completion/abbrev.txt")), "abc v2");

        let expected = fingerprint::checksum_file(&layout.factory_root.join("completion/abbrev.txt")).unwrap();
        assert_eq!(db(&layout).get("completion/abbrev.txt").unwrap().checksum, expected);
    }

    #[test]
    fn user_edit_survives_factory_update() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        sync_category(&layout, "completion").unwrap();

        std::fs::write(local(&layout, "completion/abbrev.txt"), "my own abbreviations").unwrap();
        write_factory(&layout, "completion/abbrev.txt", "abc v2");

        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.overwritten, 0);
        assert_eq!(
            read(&local(&layout, "completion/abbrev.txt")),
            "my own abbreviations"
        );
    }

    #[test]
    fn user_edit_survives_even_when_factory_unchanged() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        sync_category(&layout, "completion").unwrap();

        std::fs::write(local(&layout, "completion/abbrev.txt"), "my own abbreviations").unwrap();

        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.kept, 1);
        assert_eq!(
            read(&local(&layout, "completion/abbrev.txt")),
            "my own abbreviations"
        );
    }

    #[test]
    fn user_converged_on_new_factory_content() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        sync_category(&layout, "completion").unwrap();

        // User updates their copy by hand to exactly the new factory content.
        write_factory(&layout, "completion/abbrev.txt", "abc v2");
        std::fs::write(local(&layout, "completion/abbrev.txt"), "abc v2").unwrap();

        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.refreshed, 1);
        assert_eq!(summary.overwritten, 0);
        let expected = fingerprint::checksum_file(&layout.factory_root.join("completion/abbrev.txt")).unwrap();
        assert_eq!(db(&layout).get("completion/abbrev.txt").unwrap().checksum, expected);
    }

    #[test]
    fn safe_prune_of_upstream_removed_file() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        write_factory(&layout, "completion/keywords.txt", "def");
        sync_category(&layout, "completion").unwrap();

        std::fs::remove_file(layout.factory_root.join("completion/keywords.txt")).unwrap();
        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.pruned, 1);
        assert!(!local(&layout, "completion/keywords.txt").exists());
        assert!(!db(&layout).knows("completion/keywords.txt"));
    }

    #[test]
    fn conservative_prune_keeps_modified_file() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/keywords.txt", "def");
        sync_category(&layout, "completion").unwrap();

        std::fs::write(local(&layout, "completion/keywords.txt"), "def plus my notes").unwrap();
        std::fs::remove_file(layout.factory_root.join("completion/keywords.txt")).unwrap();

        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.pruned, 0);
        assert!(local(&layout, "completion/keywords.txt").exists());
        assert!(db(&layout).knows("completion/keywords.txt"));
    }

    #[test]
    fn localized_category_is_skipped() {
        let (_dir, layout) = setup();
        write_factory(&layout, "translations/app_de.qm", "binary-ish");

        let summary = sync_category(&layout, LOCALIZED_CATEGORY).unwrap();
        assert_eq!(summary, PassSummary::default());
        assert!(!layout.local_category(LOCALIZED_CATEGORY).exists());
    }

    #[test]
    fn missing_factory_category_is_noop() {
        let (_dir, layout) = setup();
        let summary = sync_category(&layout, "dictionaries").unwrap();
        assert_eq!(summary, PassSummary::default());
        assert!(!layout.local_category("dictionaries").exists());
    }

    #[test]
    fn unusable_destination_aborts_before_touching_anything() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        // A file squatting on the local category path makes it uncreatable.
        std::fs::write(layout.local_category("completion"), "in the way").unwrap();

        let result = sync_category(&layout, "completion");
        assert!(matches!(result, Err(Error::DestinationUnavailable { .. })));
        assert!(!layout.local_root.join(&layout.track_file).exists());
    }

    #[test]
    fn nested_subdirectories_are_mirrored() {
        let (_dir, layout) = setup();
        write_factory(&layout, "templates/reports/weekly.tex", "weekly");
        write_factory(&layout, "templates/letter.tex", "letter");

        let summary = sync_category(&layout, "templates").unwrap();
        assert_eq!(summary.copied, 2);
        assert_eq!(read(&local(&layout, "templates/reports/weekly.tex")), "weekly");
        assert!(db(&layout).knows("templates/reports/weekly.tex"));
    }

    #[test]
    fn asset_path_returns_path_even_without_factory() {
        let (_dir, layout) = setup();
        let path = asset_path(&layout, "completion", true);
        assert_eq!(path, layout.local_category("completion"));
    }

    #[test]
    fn asset_path_synchronizes_on_request() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");

        let path = asset_path(&layout, "completion", true);
        assert!(path.join("abbrev.txt").exists());
    }

    #[test]
    fn asset_path_without_sync_copies_nothing() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");

        let path = asset_path(&layout, "completion", false);
        assert!(!path.exists());
    }

    #[test]
    fn legacy_database_upgrades_in_place() {
        let (_dir, layout) = setup();
        write_factory(&layout, "completion/abbrev.txt", "abc");
        sync_category(&layout, "completion").unwrap();

        // Rewrite the database in the legacy line format, as an old
        // installation would have left it.
        let quick = fingerprint::quick_hash_file(&local(&layout, "completion/abbrev.txt")).unwrap();
        std::fs::write(
            layout.local_root.join(&layout.track_file),
            format!("0.4.6 {quick} completion/abbrev.txt\n"),
        )
        .unwrap();

        // Factory moves on; the legacy hash still proves the file untouched.
        write_factory(&layout, "completion/abbrev.txt", "abc v2");
        let summary = sync_category(&layout, "completion").unwrap();
        assert_eq!(summary.overwritten, 1);
        assert_eq!(read(&local(&layout, "completion/abbrev.txt")), "abc v2");

        // The refreshed record is back on the current format with a checksum.
        let rec_db = db(&layout);
        let rec = rec_db.get("completion/abbrev.txt").unwrap();
        assert!(!rec.checksum.is_empty());
        assert_eq!(rec.quick_hash, "");
    }
}
