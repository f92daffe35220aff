// src/extractors/spreadsheet.rs

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use super::columns::{ColumnMap, ColumnRole, KeywordTable};
use super::normalize::{clean_text, extract_goals, extract_matches};
use super::ranker::rank;
use super::record::{Category, Identity, RawScorer, ScorerRecord, DEFAULT_GROUP};
use crate::utils::error::ExtractError;

/// Rows searched for a competition title.
pub const TITLE_SEARCH_ROWS: usize = 5;
/// Rows searched for the header row.
pub const HEADER_SEARCH_ROWS: usize = 10;
/// Distinct player/team/goals columns a row must name to count as the
/// header. A lone "Goleadores ..." title cell names only one.
const MIN_HEADER_ROLES: usize = 2;

// "Grupo León 2": a place name between the keyword and the group token
static LOCATED_GROUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[Gg]rupo|GRUPO|[Gg]roup|GROUP)\s+(\p{Lu}\p{Ll}{2,})\s+([\p{Lu}\p{N}]{1,3})\b")
        .expect("Failed to compile LOCATED_GROUP_RE")
});

static GROUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[Gg]rupo|GRUPO|[Gg]roup|GROUP)\s+([\p{L}\p{N}]+)")
        .expect("Failed to compile GROUP_RE")
});

/// Non-empty rows of the first sheet, each cell cleaned to text.
type Grid = Vec<Vec<Option<String>>>;

/// Pulls the group label out of a competition title.
pub fn group_from_title(title: &str) -> Option<String> {
    if let Some(caps) = LOCATED_GROUP_RE.captures(title) {
        return Some(format!("Grupo {} {}", &caps[1], &caps[2]));
    }
    GROUP_RE.captures(title).map(|caps| format!("Grupo {}", &caps[1]))
}

pub struct SpreadsheetExtractor {
    keywords: KeywordTable,
}

impl Default for SpreadsheetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetExtractor {
    pub fn new() -> Self {
        Self::with_keywords(KeywordTable::default())
    }

    pub fn with_keywords(keywords: KeywordTable) -> Self {
        Self { keywords }
    }

    /// Extracts ranked scorer records from an uploaded workbook (xlsx, xls,
    /// xlsb or ods). Any structural problem gives an empty vector.
    pub fn extract(&self, file_bytes: &[u8], file_name: &str) -> Vec<ScorerRecord> {
        tracing::info!("Processing spreadsheet {} ({} bytes)", file_name, file_bytes.len());
        let result = load_first_sheet(file_bytes).and_then(|range| self.try_extract(&range, file_name));
        self.finish(result, file_name)
    }

    /// Same as [`SpreadsheetExtractor::extract`] for a sheet that is already
    /// loaded.
    pub fn extract_range(&self, range: &Range<Data>, file_name: &str) -> Vec<ScorerRecord> {
        self.finish(self.try_extract(range, file_name), file_name)
    }

    fn finish(&self, result: Result<Vec<ScorerRecord>, ExtractError>, file_name: &str) -> Vec<ScorerRecord> {
        match result {
            Ok(records) => {
                tracing::info!("Extracted {} scorers from {}", records.len(), file_name);
                records
            }
            Err(e) => {
                tracing::warn!("Could not parse {}: {}", file_name, e);
                Vec::new()
            }
        }
    }

    fn try_extract(&self, range: &Range<Data>, file_name: &str) -> Result<Vec<ScorerRecord>, ExtractError> {
        let grid = to_grid(range);
        if grid.is_empty() {
            return Err(ExtractError::EmptySheet);
        }
        tracing::debug!("Sheet has {} non-empty rows", grid.len());

        let title = self.find_title(&grid).unwrap_or_else(|| title_from_file_name(file_name));
        let category = Category::from_label(&title);
        let group = group_from_title(&title).unwrap_or_else(|| DEFAULT_GROUP.to_string());
        tracing::debug!("Title '{}' -> category {}, group {}", title, category, group);

        let header_idx = self
            .find_header_row(&grid)
            .ok_or(ExtractError::HeaderNotFound(HEADER_SEARCH_ROWS))?;
        let labels: Vec<&str> = grid[header_idx]
            .iter()
            .map(|cell| cell.as_deref().unwrap_or(""))
            .collect();
        let map = ColumnMap::from_headers(&labels, &self.keywords);
        let Some(cols) = map.required() else {
            return Err(ExtractError::MissingColumns(map.missing_required().join(", ")));
        };
        tracing::debug!("Header row {} mapped to {:?}", header_idx, map);

        let mut records = Vec::new();
        for (row_idx, row) in grid.iter().enumerate().skip(header_idx + 1) {
            let cell = |idx: usize| row.get(idx).and_then(|c| c.as_deref());

            let (Some(name), Some(team)) = (cell(cols.name), cell(cols.team)) else {
                tracing::trace!("Row {}: missing player or team", row_idx);
                continue;
            };
            let goals_text = cell(cols.goals).unwrap_or("");
            if self.keywords.classify(name) == ColumnRole::Name
                && !goals_text.chars().any(|c| c.is_ascii_digit())
            {
                tracing::trace!("Row {}: repeated header", row_idx);
                continue;
            }

            let row_group = map
                .group
                .and_then(cell)
                .map(str::to_string)
                .unwrap_or_else(|| group.clone());

            let raw = RawScorer {
                name: name.to_string(),
                team: team.to_string(),
                category,
                group: row_group,
                goals: extract_goals(goals_text),
                matches_played: map.matches.and_then(cell).and_then(extract_matches),
            };
            if let Some(record) = raw.validate(Identity::ContentHash { file_name, row: row_idx }) {
                records.push(record);
            }
        }

        rank(&mut records);
        Ok(records)
    }

    fn find_title(&self, grid: &Grid) -> Option<String> {
        grid.iter()
            .take(TITLE_SEARCH_ROWS)
            .flatten()
            .flatten()
            .find(|text| self.keywords.is_title_text(text))
            .cloned()
    }

    fn find_header_row(&self, grid: &Grid) -> Option<usize> {
        grid.iter().take(HEADER_SEARCH_ROWS).position(|row| {
            let roles: HashSet<ColumnRole> = row
                .iter()
                .flatten()
                .filter(|text| self.keywords.is_header_text(text) && !self.keywords.is_title_text(text))
                .map(|text| self.keywords.classify(text))
                .collect();
            roles.len() >= MIN_HEADER_ROLES
        })
    }
}

fn load_first_sheet(file_bytes: &[u8]) -> Result<Range<Data>, ExtractError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(file_bytes.to_vec()))?;
    let range = workbook.worksheet_range_at(0).ok_or(ExtractError::NoWorksheet)??;
    Ok(range)
}

fn cell_text(data: &Data) -> Option<String> {
    match data {
        Data::Empty | Data::Error(_) => None,
        other => {
            let text = clean_text(&other.to_string());
            (!text.is_empty()).then_some(text)
        }
    }
}

/// Converts the sheet to text cells and drops rows that are blank across
/// every column.
fn to_grid(range: &Range<Data>) -> Grid {
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(Option::is_some))
        .collect()
}

/// "goleadores_benjamin_grupo-C.xlsx" -> "goleadores benjamin grupo C"
fn title_from_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    clean_text(&stem.replace(['_', '-', '.'], " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Range<Data> {
        let height = rows.len().max(1) as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1).max(1) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if !cell.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(cell.to_string()));
                }
            }
        }
        range
    }

    fn summary(records: &[ScorerRecord]) -> Vec<(&str, &str, u32, Option<u32>)> {
        records
            .iter()
            .map(|r| (r.name.as_str(), r.team.as_str(), r.goals, r.matches_played))
            .collect()
    }

    #[test]
    fn test_title_and_header_detection() {
        let range = sheet(&[
            &["Liga Alevín Grupo B — Temporada 2024/25"],
            &["Federación de Castilla y León"],
            &["", ""],
            &["Actualizado", "03/02/2025"],
            &["Página 1"],
            &["Jornada 14"],
            &["Jugador", "Equipo", "Partidos Jugados", "Goles"],
            &["Ana López", "CD Norte", "12", "8"],
            &["Bea Sanz", "CD Sur", "11", "14 (3 de penalti)"],
        ]);

        let records = SpreadsheetExtractor::new().extract_range(&range, "goleadores.xlsx");
        assert_eq!(
            summary(&records),
            [("Bea Sanz", "CD Sur", 14, Some(11)), ("Ana López", "CD Norte", 8, Some(12))]
        );
        assert!(records.iter().all(|r| r.category == Category::Alevin));
        assert!(records.iter().all(|r| r.group == "Grupo B"));
        assert!(records.iter().all(|r| r.id.starts_with("sheet-")));
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn test_no_header_row_gives_empty() {
        let range = sheet(&[
            &["Liga Benjamín"],
            &["Ana López", "CD Norte", "8"],
            &["Bea Sanz", "CD Sur", "3"],
        ]);
        assert!(SpreadsheetExtractor::new().extract_range(&range, "x.xlsx").is_empty());
    }

    #[test]
    fn test_header_outside_window_gives_empty() {
        let filler: &[&str] = &["relleno"];
        let mut rows = vec![filler; HEADER_SEARCH_ROWS];
        rows.push(&["Jugador", "Equipo", "Goles"]);
        rows.push(&["Ana López", "CD Norte", "8"]);
        assert!(SpreadsheetExtractor::new().extract_range(&sheet(&rows), "x.xlsx").is_empty());
    }

    #[test]
    fn test_missing_goals_column_gives_empty() {
        let range = sheet(&[&["Jugador", "Equipo", "Partidos"], &["Ana López", "CD Norte", "8"]]);
        assert!(SpreadsheetExtractor::new().extract_range(&range, "x.xlsx").is_empty());
    }

    #[test]
    fn test_row_group_overrides_title_group() {
        let range = sheet(&[
            &["Campeonato Provincial Benjamín Grupo León 2"],
            &["Nombre", "Club", "Grupo", "Goles"],
            &["Ana López", "CD Norte", "", "4"],
            &["Bea Sanz", "CD Sur", "Grupo 7", "4"],
        ]);

        let records = SpreadsheetExtractor::new().extract_range(&range, "x.xlsx");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].group, "Grupo León 2");
        assert_eq!(records[1].group, "Grupo 7");
        assert_eq!(records[0].category, Category::Benjamin);
        assert_eq!(records[0].matches_played, None);
    }

    #[test]
    fn test_rows_without_player_or_team_are_skipped() {
        let range = sheet(&[
            &["Jugador", "Equipo", "Goles"],
            &["Ana López", "", "4"],
            &["", "CD Sur", "6"],
            &["Al", "CD Sur", "6"],
            &["Jugador", "Equipo", "Goles"],
            &["Bea Sanz", "CD Sur", "sin datos"],
        ]);

        let records = SpreadsheetExtractor::new().extract_range(&range, "x.xlsx");
        assert_eq!(summary(&records), [("Bea Sanz", "CD Sur", 0, None)]);
    }

    #[test]
    fn test_file_name_is_title_fallback() {
        let range = sheet(&[&["Jugador", "Equipo", "Goles"], &["Ana López", "CD Norte", "4"]]);
        let records = SpreadsheetExtractor::new().extract_range(&range, "goleadores_prebenjamin_grupo_C.xlsx");
        assert_eq!(records[0].category, Category::Prebenjamin);
        assert_eq!(records[0].group, "Grupo C");

        let records = SpreadsheetExtractor::new().extract_range(&range, "datos.xlsx");
        assert_eq!(records[0].category, Category::Other);
        assert_eq!(records[0].group, DEFAULT_GROUP);
    }

    #[test]
    fn test_scorer_titles_are_not_header_rows() {
        let range = sheet(&[
            &["Goleadores Alevín Grupo B"],
            &["Jugador", "Equipo", "Goles"],
            &["Ana López", "CD Norte", "4"],
            &["Bea Sanz", "CD Sur", "9"],
        ]);
        let records = SpreadsheetExtractor::new().extract_range(&range, "x.xlsx");
        assert_eq!(summary(&records), [("Bea Sanz", "CD Sur", 9, None), ("Ana López", "CD Norte", 4, None)]);

        let range = sheet(&[
            &["Top scorers U10"],
            &["Player", "Team", "Goals"],
            &["Ana López", "CD Norte", "4"],
        ]);
        let records = SpreadsheetExtractor::new().extract_range(&range, "x.xlsx");
        assert_eq!(summary(&records), [("Ana López", "CD Norte", 4, None)]);
    }

    #[test]
    fn test_club_team_rows_are_kept() {
        let range = sheet(&[
            &["Jugador", "Equipo", "Goles"],
            &["Ana López", "Club Deportivo Norte", "4"],
            &["Nombre", "Club", "Goles"],
            &["Bea Sanz", "Club Atlético Sur", "2"],
        ]);
        let records = SpreadsheetExtractor::new().extract_range(&range, "x.xlsx");
        assert_eq!(
            summary(&records),
            [("Ana López", "Club Deportivo Norte", 4, None), ("Bea Sanz", "Club Atlético Sur", 2, None)]
        );
    }

    #[test]
    fn test_numeric_cells() {
        let mut range = sheet(&[&["Jugador", "Equipo", "PJ", "Goles"], &["Ana López", "CD Norte", "", ""]]);
        range.set_value((1, 2), Data::Int(9));
        range.set_value((1, 3), Data::Float(17.0));

        let records = SpreadsheetExtractor::new().extract_range(&range, "x.xlsx");
        assert_eq!(summary(&records), [("Ana López", "CD Norte", 17, Some(9))]);
    }

    #[test]
    fn test_repeatable_with_stable_ties() {
        let range = sheet(&[
            &["Jugador", "Equipo", "Goles"],
            &["Ana López", "CD Norte", "5"],
            &["Bea Sanz", "CD Sur", "5"],
            &["Carla Gil", "CD Este", "9"],
        ]);
        let extractor = SpreadsheetExtractor::new();
        let first = extractor.extract_range(&range, "x.xlsx");
        let second = extractor.extract_range(&range, "x.xlsx");
        assert_eq!(first, second);
        let names: Vec<_> = first.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Carla Gil", "Ana López", "Bea Sanz"]);
    }

    #[test]
    fn test_unreadable_bytes_give_empty() {
        let extractor = SpreadsheetExtractor::new();
        assert!(extractor.extract(b"not a workbook", "roto.xlsx").is_empty());
        assert!(extractor.extract(&[], "vacio.xlsx").is_empty());
    }

    #[test]
    fn test_group_from_title() {
        assert_eq!(group_from_title("Liga Alevín Grupo B — Temporada").as_deref(), Some("Grupo B"));
        assert_eq!(group_from_title("GRUPO 3 provincial").as_deref(), Some("Grupo 3"));
        assert_eq!(group_from_title("Benjamín Grupo Zamora A").as_deref(), Some("Grupo Zamora A"));
        assert_eq!(group_from_title("Temporada 2024"), None);
    }
}
