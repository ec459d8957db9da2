use std::collections::BTreeMap;

use anyhow::Result;
use console::style;
use restock_core::{AssetLayout, TrackDb};

pub fn run(layout: &AssetLayout) -> Result<()> {
    eprintln!(
        "{} Factory: {}",
        style("●").green(),
        layout.factory_root.display()
    );
    eprintln!("  Local: {}", layout.local_root.display());

    let categories = layout.categories();
    if categories.is_empty() {
        eprintln!("  {} factory root has no categories", style("!").yellow());
    } else {
        eprintln!("  Categories: {}", categories.join(", "));
    }

    let db = TrackDb::load(&layout.local_root, &layout.track_file);
    eprintln!("  Tracked files: {}", db.records().len());

    let mut per_category: BTreeMap<&str, usize> = BTreeMap::new();
    for record in db.records() {
        let category = record.path.split('/').next().unwrap_or(&record.path);
        *per_category.entry(category).or_default() += 1;
    }
    for (category, count) in per_category {
        eprintln!("    {category}: {count}");
    }

    Ok(())
}
