//! Keeps a writable per-user copy of factory-shipped resource files in sync
//! across upgrades, without clobbering user edits or resurrecting files the
//! user deleted.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod fingerprint;
pub mod format;
pub mod layout;
pub mod reconcile;
pub mod track;

pub use error::{Error, Result};
pub use layout::{AssetLayout, TRACK_FILE_NAME};
pub use reconcile::{asset_path, sync_category, PassSummary, LOCALIZED_CATEGORY};
pub use track::{TrackDb, TrackRecord};
