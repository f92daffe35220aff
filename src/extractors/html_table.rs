// src/extractors/html_table.rs

// --- Imports ---
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::columns::{positional_layout, ColumnMap, ColumnRole, KeywordTable, RequiredColumns};
use super::normalize::{clean_text, extract_goals, extract_matches};
use super::ranker::rank;
use super::record::{Identity, RawScorer, ScorerRecord, SourceDescriptor};

// --- Constants ---
const MIN_TABLE_ROWS: usize = 2;
const MIN_HEADER_CELLS: usize = 3;

// --- CSS Selectors (Lazy Static) ---
static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("Failed to compile TABLE_SELECTOR"));

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Failed to compile ROW_SELECTOR"));

// Rows of div-based grids as well as plain <tr>
static LOOSE_ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr, [role='row']").expect("Failed to compile LOOSE_ROW_SELECTOR")
});

// --- Strategy Chain ---

/// Everything a strategy needs besides the parsed document.
pub struct ExtractionContext<'a> {
    pub source: &'a SourceDescriptor,
    pub keywords: &'a KeywordTable,
}

/// One way of pulling scorer rows out of a document. `None` means "no
/// match here, try the next strategy".
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, document: &Html, ctx: &ExtractionContext<'_>) -> Option<Vec<ScorerRecord>>;
}

/// Decides which column holds which role for one table.
pub trait ColumnResolver: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, headers: &[String], keywords: &KeywordTable) -> Option<ColumnMap>;
}

/// Header text alone names the player, team and goals columns.
pub struct KeywordHeaderResolver;

impl ColumnResolver for KeywordHeaderResolver {
    fn name(&self) -> &'static str {
        "keyword-header"
    }

    fn resolve(&self, headers: &[String], keywords: &KeywordTable) -> Option<ColumnMap> {
        let map = ColumnMap::from_headers(headers, keywords);
        map.required().map(|_| map)
    }
}

/// Whatever the headers did recognise, completed with the fixed layout for
/// the table's width.
pub struct PositionalResolver;

impl ColumnResolver for PositionalResolver {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn resolve(&self, headers: &[String], keywords: &KeywordTable) -> Option<ColumnMap> {
        let layout = positional_layout(headers.len())?;
        let map = ColumnMap::from_headers(headers, keywords).fill_missing(&layout);
        map.required().map(|_| map)
    }
}

/// Walks `<table>` elements in document order. The first table that yields
/// a valid record wins; later tables are navigation or summaries.
pub struct TableScanStrategy {
    resolvers: Vec<Box<dyn ColumnResolver>>,
}

impl Default for TableScanStrategy {
    fn default() -> Self {
        Self {
            resolvers: vec![Box::new(KeywordHeaderResolver), Box::new(PositionalResolver)],
        }
    }
}

impl TableScanStrategy {
    fn resolve_columns(&self, headers: &[String], keywords: &KeywordTable) -> Option<ColumnMap> {
        self.resolvers.iter().find_map(|resolver| {
            let map = resolver.resolve(headers, keywords)?;
            tracing::debug!("Columns resolved by '{}': {:?}", resolver.name(), map);
            Some(map)
        })
    }
}

impl ExtractionStrategy for TableScanStrategy {
    fn name(&self) -> &'static str {
        "table-scan"
    }

    fn extract(&self, document: &Html, ctx: &ExtractionContext<'_>) -> Option<Vec<ScorerRecord>> {
        for (table_idx, table) in document.select(&TABLE_SELECTOR).enumerate() {
            let rows = own_rows(table);
            if rows.len() < MIN_TABLE_ROWS {
                tracing::trace!("Table {}: only {} rows, skipping", table_idx, rows.len());
                continue;
            }

            let headers = cell_texts(rows[0]);
            if headers.len() < MIN_HEADER_CELLS {
                tracing::trace!("Table {}: header has {} cells, skipping", table_idx, headers.len());
                continue;
            }

            let Some(map) = self.resolve_columns(&headers, ctx.keywords) else {
                tracing::debug!("Table {}: no usable column assignment for headers {:?}", table_idx, headers);
                continue;
            };

            let records: Vec<ScorerRecord> = rows[1..]
                .iter()
                .filter_map(|row| row_to_record(&cell_texts(*row), &map, ctx, false))
                .collect();

            if !records.is_empty() {
                tracing::info!("Table {} yielded {} scorers", table_idx, records.len());
                return Some(records);
            }
            tracing::debug!("Table {}: columns resolved but no valid rows", table_idx);
        }
        None
    }
}

/// Ignores table boundaries and guesses columns from each row's width.
/// Catches documents whose rows are not grouped the way the table scan
/// expects. Rows must carry a number in the goals position.
pub struct RowScanStrategy;

impl ExtractionStrategy for RowScanStrategy {
    fn name(&self) -> &'static str {
        "row-scan"
    }

    fn extract(&self, document: &Html, ctx: &ExtractionContext<'_>) -> Option<Vec<ScorerRecord>> {
        let records: Vec<ScorerRecord> = document
            .select(&LOOSE_ROW_SELECTOR)
            .filter_map(|row| {
                let cells = cell_texts(row);
                let map = positional_layout(cells.len())?;
                row_to_record(&cells, &map, ctx, true)
            })
            .collect();

        (!records.is_empty()).then_some(records)
    }
}

// --- Main Extractor Structure ---
pub struct HtmlTableExtractor {
    keywords: KeywordTable,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for HtmlTableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlTableExtractor {
    pub fn new() -> Self {
        Self::with_keywords(KeywordTable::default())
    }

    pub fn with_keywords(keywords: KeywordTable) -> Self {
        Self {
            keywords,
            strategies: vec![Box::new(TableScanStrategy::default()), Box::new(RowScanStrategy)],
        }
    }

    /// Extracts ranked scorer records from a scraped page. Malformed markup
    /// or a page without a usable table gives an empty vector.
    pub fn extract(&self, document_markup: &str, source: &SourceDescriptor) -> Vec<ScorerRecord> {
        tracing::debug!("Extracting scorers from {} ({} bytes)", source.origin, document_markup.len());

        let document = Html::parse_document(document_markup);
        let ctx = ExtractionContext {
            source,
            keywords: &self.keywords,
        };

        let found = self.strategies.iter().find_map(|strategy| {
            let records = strategy.extract(&document, &ctx);
            match &records {
                Some(records) => tracing::info!(
                    "Strategy '{}' extracted {} scorers from {}",
                    strategy.name(),
                    records.len(),
                    source.origin
                ),
                None => tracing::debug!("Strategy '{}' found nothing in {}", strategy.name(), source.origin),
            }
            records
        });

        let Some(mut records) = found else {
            tracing::warn!("No scorer table found in {}", source.origin);
            return Vec::new();
        };
        rank(&mut records);
        records
    }
}

// --- Helpers ---

/// `<tr>` elements whose nearest enclosing table is `table` itself, so
/// nested tables do not leak rows into their parent.
fn own_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    table
        .select(&ROW_SELECTOR)
        .filter(|row| {
            row.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|ancestor| ancestor.value().name() == "table")
                .is_some_and(|ancestor| ancestor.id() == table.id())
        })
        .collect()
}

/// Cleaned text of a row's direct cells.
fn cell_texts(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| {
            let el = cell.value();
            matches!(el.name(), "td" | "th")
                || matches!(el.attr("role"), Some("cell" | "gridcell" | "columnheader"))
        })
        .map(|cell| clean_text(&cell.text().collect::<String>()))
        .collect()
}

/// A header repeated inside the body: the name cell reads like a Name
/// header and the goals cell carries no number.
fn is_repeated_header(cells: &[String], cols: &RequiredColumns, keywords: &KeywordTable) -> bool {
    keywords.classify(&cells[cols.name]) == ColumnRole::Name
        && !cells[cols.goals].chars().any(|c| c.is_ascii_digit())
}

fn row_to_record(
    cells: &[String],
    map: &ColumnMap,
    ctx: &ExtractionContext<'_>,
    require_goal_digits: bool,
) -> Option<ScorerRecord> {
    let cols = map.required()?;
    if cells.len() <= map.max_index()? {
        tracing::trace!("Row has {} cells, needs more than {:?}", cells.len(), map.max_index());
        return None;
    }
    if is_repeated_header(cells, &cols, ctx.keywords) {
        return None;
    }
    if require_goal_digits && !cells[cols.goals].chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    RawScorer {
        name: cells[cols.name].clone(),
        team: cells[cols.team].clone(),
        category: ctx.source.category,
        group: ctx.source.group.clone(),
        goals: extract_goals(&cells[cols.goals]),
        matches_played: map.matches.and_then(|idx| extract_matches(&cells[idx])),
    }
    .validate(Identity::Composite)
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::record::Category;

    fn source() -> SourceDescriptor {
        SourceDescriptor::new(Category::Alevin, "Grupo A", "https://example.test/goleadores")
    }

    fn summary(records: &[ScorerRecord]) -> Vec<(&str, u32)> {
        records.iter().map(|r| (r.name.as_str(), r.goals)).collect()
    }

    #[test]
    fn test_keyword_headers_and_ranking() {
        let html = r#"
            <html><body>
            <table>
              <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
              <tr><td>Ana</td><td>Club A</td><td>10</td></tr>
              <tr><td>Bea</td><td>Club B</td><td>15</td></tr>
            </table>
            </body></html>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Bea", 15), ("Ana", 10)]);
        assert!(records.iter().all(|r| r.category == Category::Alevin && r.group == "Grupo A"));
        assert_eq!(records[0].id, "Alevín-Grupo A-Bea-Club B");
        assert_eq!(records[0].matches_played, None);
    }

    #[test]
    fn test_positional_fallback_for_four_columns() {
        let html = r#"
            <table>
              <tr><td>Pos</td><td>Futbolista</td><td>Escuela</td><td>Total</td></tr>
              <tr><td>Carla Ruiz</td><td>CD Norte</td><td>8</td><td>6</td></tr>
              <tr><td>Dora Gil</td><td>CD Sur</td><td>9</td><td>11</td></tr>
            </table>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Dora Gil", 11), ("Carla Ruiz", 6)]);
        assert_eq!(records[0].team, "CD Sur");
        assert_eq!(records[0].matches_played, Some(9));
    }

    #[test]
    fn test_matches_and_annotated_goals() {
        let html = r#"
            <table>
              <tr><th>#</th><th>Jugador</th><th>Equipo</th><th>Partidos Jugados</th><th>Goles</th><th>Goles por partido</th></tr>
              <tr><td>1</td><td>  Juan   Pérez </td><td>Zamora&nbsp;CF</td><td>12</td><td>25 (2 de penalti)</td><td>2,08</td></tr>
              <tr><td>2</td><td>Luis Mora</td><td>CD Numancia</td><td>-</td><td>sin datos</td><td>0</td></tr>
            </table>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Juan Pérez");
        assert_eq!(records[0].team, "Zamora CF");
        assert_eq!(records[0].goals, 25);
        assert_eq!(records[0].matches_played, Some(12));
        assert_eq!(records[1].goals, 0);
        assert_eq!(records[1].matches_played, None);
    }

    #[test]
    fn test_ties_keep_document_order() {
        let html = r#"
            <table>
              <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
              <tr><td>Primera</td><td>Club A</td><td>5</td></tr>
              <tr><td>Segunda</td><td>Club B</td><td>7</td></tr>
              <tr><td>Tercera</td><td>Club C</td><td>5</td></tr>
            </table>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Segunda", 7), ("Primera", 5), ("Tercera", 5)]);
    }

    #[test]
    fn test_first_usable_table_wins() {
        let html = r#"
            <table><tr><td>Inicio</td></tr></table>
            <table>
              <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
              <tr><td>Ana</td><td>Club A</td><td>3</td></tr>
            </table>
            <table>
              <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
              <tr><td>Resumen</td><td>Total</td><td>99</td></tr>
            </table>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Ana", 3)]);
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let html = r#"
            <table>
              <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
              <tr><td>Al</td><td>Club A</td><td>4</td></tr>
              <tr><td>Ana</td><td>CD</td><td>4</td></tr>
              <tr><td>Solo dos</td><td>celdas</td></tr>
              <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
              <tr><td>Bea</td><td>Club B</td><td>2</td></tr>
            </table>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Bea", 2)]);
    }

    #[test]
    fn test_nested_table_rows_stay_with_their_table() {
        let html = r#"
            <table>
              <tr><td>Menu</td><td><table>
                  <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
                  <tr><td>Ana</td><td>Club A</td><td>6</td></tr>
              </table></td></tr>
            </table>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Ana", 6)]);
    }

    #[test]
    fn test_row_scan_when_no_table_qualifies() {
        // the title row leaves the header with a single cell, so the table
        // scan rejects the table and the row scan picks the rows up
        let html = r#"
            <table>
              <tr><td colspan="3">Goleadores Alevín</td></tr>
              <tr><td>Ana López</td><td>Club A</td><td>4</td></tr>
              <tr><td>Bea Sanz</td><td>Club B</td><td>9</td></tr>
              <tr><td>Aviso</td><td>legal</td><td>contacto</td></tr>
            </table>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Bea Sanz", 9), ("Ana López", 4)]);
    }

    #[test]
    fn test_row_scan_reads_role_based_grids() {
        let html = r#"
            <div role="grid">
              <div role="row"><span role="cell">Ana López</span><span role="cell">Club A</span><span role="cell">4</span></div>
              <div role="row"><span role="cell">Bea Sanz</span><span role="cell">Club B</span><span role="cell">2</span></div>
            </div>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Ana López", 4), ("Bea Sanz", 2)]);
    }

    #[test]
    fn test_club_team_names_are_not_repeated_headers() {
        let html = r#"
            <table>
              <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
              <tr><td>Ana López</td><td>Club Deportivo Norte</td><td>6</td></tr>
              <tr><th>Jugador</th><th>Club</th><th>Goles</th></tr>
              <tr><td>Bea Sanz</td><td>Club Atlético Sur</td><td>8</td></tr>
            </table>
        "#;

        let records = HtmlTableExtractor::new().extract(html, &source());
        assert_eq!(summary(&records), [("Bea Sanz", 8), ("Ana López", 6)]);
        assert_eq!(records[1].team, "Club Deportivo Norte");
    }

    #[test]
    fn test_garbage_input_gives_empty() {
        let extractor = HtmlTableExtractor::new();
        assert!(extractor.extract("", &source()).is_empty());
        assert!(extractor.extract("<<<table><tr><td>", &source()).is_empty());
        assert!(extractor.extract("<p>No hay datos</p>", &source()).is_empty());
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let html = r#"
            <table>
              <tr><th>Jugador</th><th>Equipo</th><th>Goles</th></tr>
              <tr><td>Ana</td><td>Club A</td><td>3</td></tr>
              <tr><td>Bea</td><td>Club B</td><td>3</td></tr>
            </table>
        "#;
        let extractor = HtmlTableExtractor::new();
        assert_eq!(extractor.extract(html, &source()), extractor.extract(html, &source()));
    }

    #[test]
    fn test_custom_keywords() {
        let html = r#"
            <table>
              <tr><th>Spieler</th><th>Verein</th><th>Tore</th><th>Partien</th><th>Extra</th></tr>
              <tr><td>Ana</td><td>FC Nord</td><td>5</td><td>7</td><td>x</td></tr>
            </table>
        "#;
        let keywords = KeywordTable {
            name: vec!["spieler".into()],
            team: vec!["verein".into()],
            goals: vec!["tore".into()],
            matches: vec!["partien".into()],
            ..KeywordTable::default()
        };

        let records = HtmlTableExtractor::with_keywords(keywords).extract(html, &source());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].goals, 5);
        assert_eq!(records[0].matches_played, Some(7));
    }
}
