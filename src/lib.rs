// src/lib.rs
//! Extraction of ranked scorer tables from scraped federation pages and
//! uploaded spreadsheets whose layout is not known in advance.
//!
//! The extractors in [`extractors`] are pure: they read their arguments and
//! a keyword table, never fail, and report through `tracing`. Fetching
//! ([`sources`]) and keeping the last dataset ([`storage`]) live outside them.

pub mod extractors;
pub mod sources;
pub mod storage;
pub mod utils;

pub use extractors::{
    Category,
    HtmlTableExtractor,
    KeywordTable,
    ScorerRecord,
    SourceDescriptor,
    SpreadsheetExtractor,
};
