use anyhow::Result;
use clap::Parser;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let layout = cli.layout()?;

    match cli.command {
        Commands::Path { category, no_sync } => cli::path::run(&layout, &category, !no_sync),
        Commands::Sync { categories } => cli::sync::run(&layout, &categories),
        Commands::Status => cli::status::run(&layout),
        Commands::Verify => cli::verify::run(&layout),
        Commands::Export { out } => cli::export::run(&layout, out.as_deref()),
    }
}
