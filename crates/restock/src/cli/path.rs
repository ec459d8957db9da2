use anyhow::Result;
use restock_core::{asset_path, AssetLayout};

pub fn run(layout: &AssetLayout, category: &str, synchronize: bool) -> Result<()> {
    let path = asset_path(layout, category, synchronize);
    println!("{}", path.display());
    Ok(())
}
