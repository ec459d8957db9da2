pub mod export;
pub mod path;
pub mod status;
pub mod sync;
pub mod verify;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use restock_core::{layout, AssetLayout};

#[derive(Parser)]
#[command(
    name = "rstk",
    about = "Keep per-user copies of factory resource files in sync",
    version
)]
pub struct Cli {
    /// Factory resource tree shipped with the application
    #[arg(long = "factory-dir", global = true, value_name = "DIR")]
    pub factory_dir: Option<PathBuf>,
    /// Writable per-user asset root
    #[arg(long = "data-dir", global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the local path of an asset category, synchronizing it first
    Path {
        /// Asset category name (e.g. completion, templates)
        category: String,
        /// Skip the reconciliation pass
        #[arg(long = "no-sync")]
        no_sync: bool,
    },
    /// Reconcile categories against the factory tree
    Sync {
        /// Categories to reconcile (all factory categories if omitted)
        categories: Vec<String>,
    },
    /// Show configured roots and tracked files
    Status,
    /// Check tracked files against their recorded fingerprints
    Verify,
    /// Write the track database in the legacy line format
    Export {
        /// Destination file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

impl Cli {
    pub fn layout(&self) -> Result<AssetLayout> {
        let factory_root = self
            .factory_dir
            .clone()
            .or_else(|| env::var_os("RESTOCK_FACTORY_DIR").map(PathBuf::from))
            .context("no factory directory; pass --factory-dir or set RESTOCK_FACTORY_DIR")?;
        let local_root = self
            .data_dir
            .clone()
            .or_else(|| env::var_os("RESTOCK_DATA_DIR").map(PathBuf::from))
            .or_else(|| layout::default_local_root("restock"))
            .context("cannot determine a per-user data directory")?;
        Ok(AssetLayout::new(factory_root, local_root))
    }
}
