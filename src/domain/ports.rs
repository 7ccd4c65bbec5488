use async_trait::async_trait;

use crate::domain::model::{OperationKind, OperationReport, Record};
use crate::utils::error::Result;

/// Persistence boundary for the review dataset.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Record>>;
    async fn save(&self, records: &[Record]) -> Result<()>;
}

/// A single workflow operation, executed by the engine.
#[async_trait]
pub trait Operation: Send + Sync {
    fn kind(&self) -> OperationKind;
    async fn run(&self, store: &dyn RecordStore) -> Result<OperationReport>;
}
