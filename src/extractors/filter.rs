// src/extractors/filter.rs
//! Post-extraction filtering of scorer lists.

use super::record::{Category, ScorerRecord};

/// Narrows a scorer list the way the league table view does.
#[derive(Debug, Clone, Default)]
pub struct ScorerFilter {
    pub category: Option<Category>,
    pub team: Option<String>,
    pub group: Option<String>,
    pub min_goals: Option<u32>,
    pub min_matches: Option<u32>,
}

impl ScorerFilter {
    pub fn matches(&self, record: &ScorerRecord) -> bool {
        if self.category.is_some_and(|c| c != record.category) {
            return false;
        }
        if self.team.as_deref().is_some_and(|t| !t.eq_ignore_ascii_case(&record.team)) {
            return false;
        }
        if self.group.as_deref().is_some_and(|g| g != record.group) {
            return false;
        }
        if self.min_goals.is_some_and(|min| record.goals < min) {
            return false;
        }
        // unknown matches count as zero
        if self.min_matches.is_some_and(|min| record.matches_played.unwrap_or(0) < min) {
            return false;
        }
        true
    }

    /// Keeps matching records, preserving their order.
    pub fn apply(&self, records: Vec<ScorerRecord>) -> Vec<ScorerRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}
