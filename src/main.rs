//! Manuload CLI - import legacy catalog spreadsheets
//!
//! ```bash
//! manuload                    # full import
//! manuload -m 100             # partial run: first 100 metadata rows
//! manuload -v 3               # debug logging
//! ```
//!
//! Table URLs and identity names come from the environment (`.env`
//! supported); see [`manuload::config`].

use clap::Parser;
use tracing::Level;

use manuload::store::memory::MemoryStore;
use manuload::{fixtures, ImportConfig, Importer};

#[derive(Parser)]
#[command(name = "manuload")]
#[command(about = "Import legacy manuscript catalog spreadsheets", long_about = None)]
struct Cli {
    /// Stop after this many metadata rows (fast partial runs)
    #[arg(short, long)]
    max_documents: Option<usize>,

    /// Verbosity: 0 = errors, 1 = warnings, 2 = info, 3 = debug
    #[arg(short, long, default_value_t = 1)]
    verbosity: u8,
}

fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbosity))
        .with_target(false)
        .init();

    let config = ImportConfig::from_env();

    // reference backend; a deployment substitutes its own Store
    let store = MemoryStore::new();
    if let Err(e) = fixtures::ensure_system_users(
        &store,
        &config.script_username,
        &config.team_username,
    )
    .await
    {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let mut importer =
        Importer::new(&store, config).with_max_documents(cli.max_documents);
    match importer.run().await {
        Ok(stats) => {
            eprintln!(
                "Imported {} collections, {} languages, {} documents ({} joins); skipped {}",
                stats.collections, stats.languages, stats.documents, stats.joins, stats.skipped
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_maps_to_levels() {
        assert_eq!(log_level(0), Level::ERROR);
        assert_eq!(log_level(1), Level::WARN);
        assert_eq!(log_level(2), Level::INFO);
        assert_eq!(log_level(3), Level::DEBUG);
        assert_eq!(log_level(9), Level::DEBUG);
    }
}
