// src/sources/mod.rs
//! Fetching and aggregation around the extraction core: walks the
//! configured scorer pages, keeps going when one fails, and reports what
//! went wrong per source.

pub mod client;
pub mod models;

use std::time::Duration;

use crate::extractors::html_table::HtmlTableExtractor;
use crate::extractors::ranker::{dedup_by_id, rank};
use crate::extractors::record::ScorerRecord;
use crate::utils::error::FetchError;
use client::DocumentFetcher;
use models::SourceTable;

/// Default spacing between consecutive page requests.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

#[derive(Debug, Default)]
pub struct CollectedScorers {
    pub records: Vec<ScorerRecord>,
    /// One human-readable note per source that failed or yielded nothing.
    pub errors: Vec<String>,
}

/// Fetches every source in order, extracts its scorers and merges them.
/// Records are de-duplicated by identity and ranked across all sources.
pub async fn collect_scorers<F: DocumentFetcher>(
    fetcher: &F,
    table: &SourceTable,
    extractor: &HtmlTableExtractor,
    delay: Duration,
) -> CollectedScorers {
    let mut all = Vec::new();
    let mut errors = Vec::new();

    for (idx, source) in table.sources.iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let label = format!("{} {}", source.category, source.group);

        match fetcher.fetch(&source.origin).await {
            Ok(body) => {
                let records = extractor.extract(&body, source);
                if records.is_empty() {
                    errors.push(format!("Sin datos en {}", label));
                } else {
                    tracing::info!("{}: {} scorers", label, records.len());
                    all.extend(records);
                }
            }
            Err(FetchError::Http(status)) => {
                tracing::warn!("{} answered {}", label, status);
                errors.push(format!("Error {} en {}", status.as_u16(), label));
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", label, e);
                errors.push(format!("Error en {}: {}", label, e));
            }
        }
    }

    let mut records = dedup_by_id(all);
    rank(&mut records);
    tracing::info!(
        "Collected {} scorers from {} sources ({} errors)",
        records.len(),
        table.sources.len(),
        errors.len()
    );
    CollectedScorers { records, errors }
}
