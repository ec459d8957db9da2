use std::path::Path;

use anyhow::{Context, Result};
use restock_core::{format, AssetLayout, TrackDb};

pub fn run(layout: &AssetLayout, out: Option<&Path>) -> Result<()> {
    let db = TrackDb::load(&layout.local_root, &layout.track_file);
    let text = format::to_legacy(db.records());

    match out {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}
