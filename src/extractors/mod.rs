// src/extractors/mod.rs
pub mod columns;
pub mod filter;
pub mod html_table;
pub mod normalize;
pub mod ranker;
pub mod record;
pub mod spreadsheet;

// Re-export key extraction types for convenience
pub use columns::{ColumnMap, ColumnRole, KeywordTable};
pub use filter::ScorerFilter;
pub use html_table::{
    ExtractionStrategy,
    HtmlTableExtractor,
    RowScanStrategy,
    TableScanStrategy,
};
pub use record::{Category, ScorerRecord, SourceDescriptor};
pub use spreadsheet::SpreadsheetExtractor;
