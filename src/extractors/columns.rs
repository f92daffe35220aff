// src/extractors/columns.rs
//! Column role inference: keyword classification of header text and the
//! positional layouts used when headers say nothing useful.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::normalize::clean_text;
use crate::utils::error::ConfigError;

/// Semantic meaning of a tabular column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Name,
    Team,
    Group,
    MatchesPlayed,
    Goals,
    Unmapped,
}

/// Per-locale keyword lists. Matching is substring-based on the lower-cased,
/// whitespace-collapsed header text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTable {
    pub name: Vec<String>,
    pub team: Vec<String>,
    pub matches: Vec<String>,
    pub goals: Vec<String>,
    pub group: Vec<String>,
    /// Derived columns (averages, goals per match) that must never be
    /// taken for Goals or MatchesPlayed.
    pub ignore: Vec<String>,
    /// Words that mark a spreadsheet title cell (competition, season).
    pub title: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl KeywordTable {
    pub fn spanish() -> Self {
        Self {
            name: words(&["jugador", "nombre", "goleador", "alumno"]),
            team: words(&["equipo", "club", "colegio"]),
            matches: words(&["partidos", "jugados", "pj"]),
            goals: words(&["goles", "gol"]),
            group: words(&["grupo", "categoría", "categoria", "división", "division"]),
            ignore: words(&["promedio", "media", "por partido", "/partido"]),
            title: words(&[
                "liga", "división", "division", "temporada", "provincial", "campeonato", "torneo",
            ]),
        }
    }

    pub fn english() -> Self {
        Self {
            name: words(&["player", "name", "scorer"]),
            team: words(&["team", "club"]),
            matches: words(&["matches", "played", "games", "apps"]),
            goals: words(&["goals"]),
            group: words(&["group", "category", "division"]),
            ignore: words(&["average", "per match", "per game", "ratio"]),
            title: words(&["league", "division", "season", "provincial", "championship"]),
        }
    }

    /// Appends another locale's keywords, skipping ones already present.
    pub fn merge(mut self, other: KeywordTable) -> Self {
        fn extend(into: &mut Vec<String>, from: Vec<String>) {
            for word in from {
                let word = word.to_lowercase();
                if !into.contains(&word) {
                    into.push(word);
                }
            }
        }
        extend(&mut self.name, other.name);
        extend(&mut self.team, other.team);
        extend(&mut self.matches, other.matches);
        extend(&mut self.goals, other.goals);
        extend(&mut self.group, other.group);
        extend(&mut self.ignore, other.ignore);
        extend(&mut self.title, other.title);
        self
    }

    /// Loads a table from JSON. Fields left out keep the built-in defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let table: KeywordTable = serde_json::from_str(&raw)?;
        tracing::debug!("Loaded keyword table from {}", path.as_ref().display());
        Ok(table.lowercased())
    }

    /// Header text is compared lower-cased, so the keywords must be too.
    pub fn lowercased(mut self) -> Self {
        for list in [
            &mut self.name,
            &mut self.team,
            &mut self.matches,
            &mut self.goals,
            &mut self.group,
            &mut self.ignore,
            &mut self.title,
        ] {
            for word in list.iter_mut() {
                *word = word.to_lowercase();
            }
        }
        self
    }

    /// Maps header text to a role. The checking order resolves overlaps:
    /// "Team name" is a Team column, "Goleador" a Name column.
    pub fn classify(&self, header: &str) -> ColumnRole {
        let text = clean_text(header).to_lowercase();
        if text.is_empty() {
            return ColumnRole::Unmapped;
        }
        let hit = |list: &[String]| list.iter().any(|kw| text.contains(kw.as_str()));

        if hit(&self.ignore) {
            ColumnRole::Unmapped
        } else if hit(&self.matches) {
            ColumnRole::MatchesPlayed
        } else if hit(&self.team) {
            ColumnRole::Team
        } else if hit(&self.name) {
            ColumnRole::Name
        } else if hit(&self.goals) {
            ColumnRole::Goals
        } else if hit(&self.group) {
            ColumnRole::Group
        } else {
            ColumnRole::Unmapped
        }
    }

    /// True when the text names a player, team or goals column; used to
    /// spot header rows.
    pub fn is_header_text(&self, text: &str) -> bool {
        matches!(
            self.classify(text),
            ColumnRole::Name | ColumnRole::Team | ColumnRole::Goals
        )
    }

    pub fn is_title_text(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.title.iter().any(|kw| text.contains(kw.as_str()))
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        KeywordTable::spanish().merge(KeywordTable::english())
    }
}

/// Column index per role for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub team: Option<usize>,
    pub matches: Option<usize>,
    pub goals: Option<usize>,
    pub group: Option<usize>,
}

/// The three columns without which a row cannot become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredColumns {
    pub name: usize,
    pub team: usize,
    pub goals: usize,
}

impl ColumnMap {
    /// Classifies every header cell; a role seen twice keeps its last column.
    pub fn from_headers<S: AsRef<str>>(headers: &[S], keywords: &KeywordTable) -> Self {
        let mut map = ColumnMap::default();
        for (idx, header) in headers.iter().enumerate() {
            map.assign(keywords.classify(header.as_ref()), idx);
        }
        map
    }

    pub fn assign(&mut self, role: ColumnRole, idx: usize) {
        match role {
            ColumnRole::Name => self.name = Some(idx),
            ColumnRole::Team => self.team = Some(idx),
            ColumnRole::MatchesPlayed => self.matches = Some(idx),
            ColumnRole::Goals => self.goals = Some(idx),
            ColumnRole::Group => self.group = Some(idx),
            ColumnRole::Unmapped => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ColumnMap::default()
    }

    pub fn required(&self) -> Option<RequiredColumns> {
        Some(RequiredColumns {
            name: self.name?,
            team: self.team?,
            goals: self.goals?,
        })
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("player");
        }
        if self.team.is_none() {
            missing.push("team");
        }
        if self.goals.is_none() {
            missing.push("goals");
        }
        missing
    }

    /// Highest column index any role points at.
    pub fn max_index(&self) -> Option<usize> {
        [self.name, self.team, self.matches, self.goals, self.group]
            .into_iter()
            .flatten()
            .max()
    }

    /// Fills the missing required roles from `fallback`, never reusing a
    /// column already claimed by another role. MatchesPlayed is only taken
    /// over when nothing was recognised at all.
    pub fn fill_missing(mut self, fallback: &ColumnMap) -> ColumnMap {
        let was_empty = self.is_empty();
        let mut used: HashSet<usize> = [self.name, self.team, self.matches, self.goals, self.group]
            .into_iter()
            .flatten()
            .collect();

        let mut take = |slot: &mut Option<usize>, candidate: Option<usize>| {
            if slot.is_none() {
                if let Some(idx) = candidate.filter(|idx| !used.contains(idx)) {
                    *slot = Some(idx);
                    used.insert(idx);
                }
            }
        };
        take(&mut self.name, fallback.name);
        take(&mut self.team, fallback.team);
        take(&mut self.goals, fallback.goals);
        if was_empty {
            take(&mut self.matches, fallback.matches);
        }
        self
    }
}

/// Fixed layout guessed from the column count alone.
///
/// * 3 columns: name, team, goals
/// * 4 columns: name, team, matches, goals
/// * 5 or more: position, name, team, ..., matches, goals
///
/// Fewer than 3 columns cannot hold a scorer row.
pub fn positional_layout(column_count: usize) -> Option<ColumnMap> {
    let layout = match column_count {
        0..=2 => return None,
        3 => ColumnMap {
            name: Some(0),
            team: Some(1),
            goals: Some(2),
            ..ColumnMap::default()
        },
        4 => ColumnMap {
            name: Some(0),
            team: Some(1),
            matches: Some(2),
            goals: Some(3),
            ..ColumnMap::default()
        },
        n => ColumnMap {
            name: Some(1),
            team: Some(2),
            matches: Some(n - 2),
            goals: Some(n - 1),
            ..ColumnMap::default()
        },
    };
    Some(layout)
}
