// src/main.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use scorer_extract::extractors::{
    Category, HtmlTableExtractor, KeywordTable, ScorerFilter, ScorerRecord, SourceDescriptor,
    SpreadsheetExtractor,
};
use scorer_extract::sources::{self, client::HttpFetcher, models::SourceTable};
use scorer_extract::storage::DatasetStore;
use scorer_extract::utils::{self, AppError};

/// Command Line Interface for the scorer table extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON keyword table replacing the built-in Spanish/English one
    #[arg(long, global = true)]
    keywords: Option<PathBuf>,

    /// Directory to save the resulting dataset and its metadata
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Only keep scorers of this category (e.g. "Alevín")
    #[arg(long, global = true)]
    only_category: Option<String>,

    /// Only keep scorers of this team
    #[arg(long, global = true)]
    team: Option<String>,

    /// Only keep scorers with at least this many goals
    #[arg(long, global = true)]
    min_goals: Option<u32>,

    /// Only keep scorers with at least this many matches played
    #[arg(long, global = true)]
    min_matches: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract scorers from a saved HTML page
    Html {
        /// Path to the HTML document
        file: PathBuf,

        /// Category of the competition (e.g. "Benjamín")
        #[arg(short, long)]
        category: String,

        /// Group of the competition (e.g. "Grupo A")
        #[arg(short, long)]
        group: String,
    },
    /// Extract scorers from an uploaded spreadsheet
    Sheet {
        /// Path to the xlsx/xls/ods file
        file: PathBuf,
    },
    /// Fetch and extract every configured federation page
    Scrape {
        /// JSON source table (defaults to the built-in federation pages)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Delay between page requests in milliseconds
        #[arg(long, default_value_t = sources::DEFAULT_REQUEST_DELAY_MS)]
        delay_ms: u64,
    },
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Keyword configuration
    let keywords = match &args.keywords {
        Some(path) => KeywordTable::from_json_file(path)?,
        None => KeywordTable::default(),
    };

    let filter = ScorerFilter {
        category: args.only_category.as_deref().map(Category::from_label),
        team: args.team.clone(),
        group: None,
        min_goals: args.min_goals,
        min_matches: args.min_matches,
    };

    // 4. Run the requested extraction
    let (origin, records, errors): (String, Vec<ScorerRecord>, Vec<String>) = match &args.command {
        Command::Html { file, category, group } => {
            let markup = std::fs::read_to_string(file)?;
            let source = SourceDescriptor::new(Category::from_label(category), group.as_str(), file_label(file));
            let records = HtmlTableExtractor::with_keywords(keywords).extract(&markup, &source);
            (source.origin, records, Vec::new())
        }
        Command::Sheet { file } => {
            let bytes = std::fs::read(file)?;
            let name = file_label(file);
            let records = SpreadsheetExtractor::with_keywords(keywords).extract(&bytes, &name);
            (name, records, Vec::new())
        }
        Command::Scrape { sources: table_path, delay_ms } => {
            let table = match table_path {
                Some(path) => SourceTable::from_json_file(path)?,
                None => SourceTable::default(),
            };
            let fetcher = HttpFetcher::new()?;
            let extractor = HtmlTableExtractor::with_keywords(keywords);
            let collected = sources::collect_scorers(
                &fetcher,
                &table,
                &extractor,
                Duration::from_millis(*delay_ms),
            )
            .await;
            for error in &collected.errors {
                tracing::warn!("{}", error);
            }
            ("scrape".to_string(), collected.records, collected.errors)
        }
    };

    if records.is_empty() {
        return Err(AppError::Processing(format!(
            "No scorer data could be extracted from {} ({} source errors)",
            origin,
            errors.len()
        )));
    }

    let records = filter.apply(records);
    tracing::info!("Processing finished. {} scorers after filtering", records.len());

    // 5. Keep and optionally persist the dataset
    let mut store = DatasetStore::new();
    store.set(origin, records);
    if let Some(dir) = &args.output_dir {
        let path = store.save_json(dir)?;
        tracing::info!("Saved dataset to: {}", path.display());
    }

    let dataset = store.get().map(|d| d.records.as_slice()).unwrap_or_default();
    let output = serde_json::json!({
        "scorers": dataset,
        "errors": errors,
    });
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|e| AppError::Processing(format!("Could not render output: {}", e)))?;
    println!("{}", rendered);

    Ok(())
}
