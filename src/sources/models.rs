// src/sources/models.rs
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::extractors::record::{Category, SourceDescriptor};
use crate::utils::error::ConfigError;

const FEDERATION_SCORERS_URL: &str = "https://intranet.rfcylf.es/nfg/NPcd/NFG_CMP_Goleadores";

/// The configured scorer pages, each tagged with its category and group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable {
    pub sources: Vec<SourceDescriptor>,
}

impl SourceTable {
    /// Reads a table like `{"sources": [{"category": "Alevín", "group": "Grupo A", "origin": "https://..."}]}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let table: SourceTable = serde_json::from_str(&raw)?;
        tracing::info!("Loaded {} sources from {}", table.sources.len(), path.as_ref().display());
        Ok(table)
    }

    /// Looks a fetched document's origin up in the table.
    pub fn lookup(&self, origin: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.origin == origin)
    }
}

impl Default for SourceTable {
    /// Prebenjamín groups A to C of the regional federation's scorer pages.
    fn default() -> Self {
        let page = |competition: &str, group: &str| {
            format!(
                "{}?cod_primaria=1000128&codtemporada=&Sch_Cod_Agrupacion=1&codcompeticion={}&codgrupo={}",
                FEDERATION_SCORERS_URL, competition, group
            )
        };
        Self {
            sources: vec![
                SourceDescriptor::new(Category::Prebenjamin, "Grupo A", page("11380019", "11380023")),
                SourceDescriptor::new(Category::Prebenjamin, "Grupo B", page("11380028", "11380032")),
                SourceDescriptor::new(Category::Prebenjamin, "Grupo C", page("11380036", "11380040")),
            ],
        }
    }
}
