use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::core::{Record, RecordStore, Result};

/// Stores the dataset as pretty-printed JSON at `data/records.json`.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    records_file: PathBuf,
}

impl JsonRecordStore {
    pub fn new(records_file: PathBuf) -> Self {
        Self { records_file }
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn load(&self) -> Result<Vec<Record>> {
        if !self.records_file.is_file() {
            debug!("No records file at {}, starting empty", self.records_file.display());
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.records_file)?;
        let records: Vec<Record> = serde_json::from_str(&content)?;
        Ok(records)
    }

    async fn save(&self, records: &[Record]) -> Result<()> {
        if let Some(parent) = self.records_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.records_file, content)?;
        debug!("Saved {} records to {}", records.len(), self.records_file.display());
        Ok(())
    }
}
