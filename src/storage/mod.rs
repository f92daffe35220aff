// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::extractors::record::ScorerRecord;
use crate::utils::error::StorageError;

/// The last dataset a caller processed. Owned by whoever runs extractions;
/// the extractors never see it.
#[derive(Debug, Default)]
pub struct DatasetStore {
    last: Option<StoredDataset>,
}

#[derive(Debug, Clone)]
pub struct StoredDataset {
    pub origin: String,
    pub records: Vec<ScorerRecord>,
    pub stored_at: chrono::DateTime<chrono::Utc>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored dataset.
    pub fn set(&mut self, origin: impl Into<String>, records: Vec<ScorerRecord>) {
        let origin = origin.into();
        tracing::debug!("Storing {} records from {}", records.len(), origin);
        self.last = Some(StoredDataset {
            origin,
            records,
            stored_at: chrono::Utc::now(),
        });
    }

    pub fn get(&self) -> Option<&StoredDataset> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    /// Writes the stored dataset and a metadata file into `base_dir`,
    /// returning the dataset path.
    pub fn save_json<P: AsRef<Path>>(&self, base_dir: P) -> Result<PathBuf, StorageError> {
        let dataset = self.last.as_ref().ok_or(StorageError::Empty)?;
        let base_path = base_dir.as_ref();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(base_path)?;
        }

        let data_path = base_path.join("scorers.json");
        let data = serde_json::to_string_pretty(&dataset.records)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&data_path, data)?;

        // Create metadata structure
        let metadata = serde_json::json!({
            "origin": dataset.origin,
            "record_count": dataset.records.len(),
            "stored_at": dataset.stored_at.to_rfc3339(),
            "saved_at": chrono::Utc::now().to_rfc3339(),
        });
        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(base_path.join("scorers_meta.json"), metadata_str)?;

        tracing::info!("Saved dataset to {}", data_path.display());
        Ok(data_path)
    }
}
