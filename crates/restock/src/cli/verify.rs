use anyhow::Result;
use console::style;
use restock_core::{AssetLayout, TrackDb, TrackRecord};

pub fn run(layout: &AssetLayout) -> Result<()> {
    let db = TrackDb::load(&layout.local_root, &layout.track_file);

    let mut counts = VerifyCounts::default();
    for record in db.records() {
        report_one(layout, record, &mut counts);
    }

    eprintln!();
    eprintln!(
        "Verified: {} ok, {} modified, {} missing, {} unknown",
        counts.ok, counts.modified, counts.missing, counts.unknown
    );
    Ok(())
}

#[derive(Default)]
struct VerifyCounts {
    ok: u32,
    modified: u32,
    missing: u32,
    unknown: u32,
}

fn report_one(layout: &AssetLayout, record: &TrackRecord, counts: &mut VerifyCounts) {
    let local = layout.local_root.join(&record.path);
    if !local.exists() {
        eprintln!(
            "  {} {} deleted (kept as tombstone)",
            style("?").yellow(),
            style(&record.path).yellow()
        );
        counts.missing += 1;
        return;
    }

    if record.checksum.is_empty() && record.quick_hash.is_empty() {
        eprintln!(
            "  {} {} no recorded fingerprint",
            style("?").yellow(),
            record.path
        );
        counts.unknown += 1;
        return;
    }

    if record.verifies(&local) {
        eprintln!("  {} {}", style("✓").green(), record.path);
        counts.ok += 1;
    } else {
        eprintln!(
            "  {} {} locally modified",
            style("✗").red().bold(),
            style(&record.path).red()
        );
        counts.modified += 1;
    }
}
