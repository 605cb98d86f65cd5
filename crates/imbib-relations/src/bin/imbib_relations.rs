//! imbib-relations binary
//!
//! Looks up the works citing (or cited by) a DOI and prints them, marking
//! the ones already present in an optional JSON library file.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use imbib_relations::{
    Entry, FetchResult, Library, RelationCoordinator, RelationKind, RelationState,
    RelationsConfig, SemanticScholarFetcher,
};

#[derive(Parser, Debug)]
#[command(name = "imbib-relations", version, about = "Find works related to a DOI")]
struct Cli {
    /// DOI of the pivot entry
    doi: String,

    /// List the works the pivot cites instead of the works citing it
    #[arg(long)]
    references: bool,

    /// TOML configuration file
    #[arg(long, env = "IMBIB_RELATIONS_CONFIG")]
    config: Option<PathBuf>,

    /// JSON array of entries treated as the local library
    #[arg(long)]
    library: Option<PathBuf>,

    /// Override the configured result limit
    #[arg(long)]
    limit: Option<u32>,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RelationsConfig::from_toml(&std::fs::read_to_string(path)?)?,
        None => RelationsConfig::new(),
    };
    if let Some(limit) = cli.limit {
        config.result_limit = limit;
    }
    if cli.timeout.is_some() {
        config.fetch_timeout_secs = cli.timeout;
    }
    config.validate()?;

    let library = match &cli.library {
        Some(path) => {
            let entries: Vec<Entry> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            Library::with_entries(entries, config.undo_limit as usize)
        }
        None => Library::new(config.undo_limit as usize),
    };

    let kind = if cli.references {
        RelationKind::References
    } else {
        RelationKind::Citations
    };

    let pivot = Entry::new("pivot".to_string(), "article".to_string(), String::new())
        .with_doi(cli.doi.clone());
    let fetcher = Arc::new(SemanticScholarFetcher::new(&config)?);
    let coordinator = RelationCoordinator::new(&pivot, kind, fetcher, &config);

    let mut changes = coordinator.subscribe();
    coordinator.load_entries()?;
    println!("{} {}", kind.heading(), cli.doi);

    loop {
        let state = match changes.recv().await {
            Ok(change) => change.state,
            Err(RecvError::Lagged(_)) => coordinator.state(),
            Err(RecvError::Closed) => break,
        };

        match state {
            RelationState::Loaded(FetchResult::Pending) => println!("Loading..."),
            RelationState::Loaded(FetchResult::Success(entries)) if entries.is_empty() => {
                println!("No publications found");
                break;
            }
            RelationState::Loaded(FetchResult::Success(_)) => {
                for related in coordinator.classified(&library).unwrap_or_default() {
                    let marker = if related.is_local { "*" } else { " " };
                    let year = related
                        .entry
                        .year
                        .map(|y| y.to_string())
                        .unwrap_or_default();
                    println!(
                        "{} {:<24} {:>4}  {}",
                        marker, related.entry.cite_key, year, related.entry.title
                    );
                }
                break;
            }
            RelationState::Loaded(FetchResult::Failure(error)) => {
                eprintln!("Error while fetching related entries: {}", error);
                std::process::exit(1);
            }
            RelationState::NotLoaded | RelationState::Cancelled => break,
        }
    }

    Ok(())
}
