use anyhow::{bail, Result};
use console::style;
use restock_core::{sync_category, AssetLayout};

pub fn run(layout: &AssetLayout, categories: &[String]) -> Result<()> {
    let categories = if categories.is_empty() {
        layout.categories()
    } else {
        categories.to_vec()
    };

    if categories.is_empty() {
        eprintln!(
            "{} no factory categories under {}",
            style("○").dim(),
            layout.factory_root.display()
        );
        return Ok(());
    }

    let mut failures = 0u32;
    for category in &categories {
        match sync_category(layout, category) {
            Ok(summary) => {
                eprintln!("  {} {category}: {summary}", style("✓").green());
            }
            Err(e) => {
                eprintln!("  {} {category}: {e}", style("✗").red().bold());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} categor{} not synchronized", if failures == 1 { "y" } else { "ies" });
    }
    Ok(())
}
