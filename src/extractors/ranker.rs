// src/extractors/ranker.rs
//! Ordering and de-duplication of extracted records.

use std::collections::HashSet;

use super::record::ScorerRecord;

/// Orders records by goals, highest first. `sort_by` is stable, so ties
/// keep the order in which rows were read.
pub fn rank(records: &mut [ScorerRecord]) {
    records.sort_by(|a, b| b.goals.cmp(&a.goals));
}

/// Drops records whose identity was already seen, keeping the first one.
pub fn dedup_by_id(records: Vec<ScorerRecord>) -> Vec<ScorerRecord> {
    let mut seen = HashSet::new();
    let before = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect();
    if kept.len() < before {
        tracing::debug!("Dropped {} duplicate records", before - kept.len());
    }
    kept
}
