// src/extractors/record.rs
//! Scorer records and the closed category set.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::normalize::clean_text;

/// Names and teams must be longer than this (in characters) after cleaning.
pub const MIN_FIELD_CHARS: usize = 2;

/// Group used when a spreadsheet title names no group.
pub const DEFAULT_GROUP: &str = "Único";

// --- Category Patterns (Lazy Static) ---
// Order matters: "prebenjamín" contains "benjamín".
static CATEGORY_PATTERNS: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    [
        (Category::Prebenjamin, r"(?i)pre[\s\-]?benjam[ií]n"),
        (Category::Benjamin, r"(?i)benjam[ií]n"),
        (Category::Alevin, r"(?i)alev[ií]n"),
        (Category::Infantil, r"(?i)infantil"),
        (Category::Cadete, r"(?i)cadete"),
        (Category::Juvenil, r"(?i)juvenil"),
    ]
    .into_iter()
    .filter_map(|(category, pat)| Regex::new(pat).ok().map(|re| (category, re)))
    .collect()
});

/// Age bracket of a competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Prebenjamín")]
    Prebenjamin,
    #[serde(rename = "Benjamín")]
    Benjamin,
    #[serde(rename = "Alevín")]
    Alevin,
    Infantil,
    Cadete,
    Juvenil,
    #[serde(rename = "Otra")]
    Other,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Prebenjamin => "Prebenjamín",
            Category::Benjamin => "Benjamín",
            Category::Alevin => "Alevín",
            Category::Infantil => "Infantil",
            Category::Cadete => "Cadete",
            Category::Juvenil => "Juvenil",
            Category::Other => "Otra",
        }
    }

    /// Finds the first age-bracket keyword in free text (singular or plural,
    /// with or without accents). Returns `None` when the text names none.
    pub fn detect(text: &str) -> Option<Category> {
        CATEGORY_PATTERNS
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(category, _)| *category)
    }

    /// Like [`Category::detect`] but falls back to `Other`.
    pub fn from_label(text: &str) -> Category {
        Self::detect(text).unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One player's aggregated stats for one competition group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerRecord {
    pub id: String,
    pub name: String,
    pub team: String,
    pub category: Category,
    pub group: String,
    pub goals: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches_played: Option<u32>,
    /// Only ever filled by callers; extraction leaves it empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

/// Caller-supplied context for one fetched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub category: Category,
    pub group: String,
    /// URL or file name the document came from.
    pub origin: String,
}

impl SourceDescriptor {
    pub fn new(category: Category, group: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            category,
            group: group.into(),
            origin: origin.into(),
        }
    }
}

/// Cleaned field values for a row that has not been validated yet.
#[derive(Debug, Clone)]
pub struct RawScorer {
    pub name: String,
    pub team: String,
    pub category: Category,
    pub group: String,
    pub goals: u32,
    pub matches_played: Option<u32>,
}

impl RawScorer {
    /// Accepts the row only when name and team both exceed
    /// [`MIN_FIELD_CHARS`] characters after cleaning.
    pub fn validate(self, identity: Identity<'_>) -> Option<ScorerRecord> {
        let name = clean_text(&self.name);
        let team = clean_text(&self.team);
        if name.chars().count() <= MIN_FIELD_CHARS || team.chars().count() <= MIN_FIELD_CHARS {
            tracing::trace!("Rejecting row with short name/team: '{}' / '{}'", name, team);
            return None;
        }

        let id = identity.build(self.category, &self.group, &name, &team);
        Some(ScorerRecord {
            id,
            name,
            team,
            category: self.category,
            group: self.group,
            goals: self.goals,
            matches_played: self.matches_played,
            birth_date: None,
        })
    }
}

/// How a record's identity key is built.
#[derive(Debug, Clone, Copy)]
pub enum Identity<'a> {
    /// `category-group-name-team`; natural key of a federation page.
    Composite,
    /// Hash over the upload's file name, the row position and the natural
    /// key. Rows of one upload never collide, repeated runs agree.
    ContentHash { file_name: &'a str, row: usize },
}

impl Identity<'_> {
    pub fn build(&self, category: Category, group: &str, name: &str, team: &str) -> String {
        match self {
            Identity::Composite => format!("{}-{}-{}-{}", category.label(), group, name, team),
            Identity::ContentHash { file_name, row } => {
                let row = row.to_string();
                let mut hasher = Sha256::new();
                for part in [*file_name, row.as_str(), category.label(), group, name, team] {
                    hasher.update(part.as_bytes());
                    hasher.update([0u8]);
                }
                let digest = hasher.finalize();
                format!("sheet-{}", hex::encode(&digest[..12]))
            }
        }
    }
}
