use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::config::project::ProjectPaths;
use crate::core::engine::HistoryEntry;
use crate::core::{Operation, OperationKind, OperationReport, RecordStore, Result};
use crate::domain::model::RecordState;

/// Reports the state of the review without changing the dataset.
pub struct StatusOperation {
    paths: ProjectPaths,
    analytics: bool,
}

impl StatusOperation {
    pub fn new(paths: ProjectPaths, analytics: bool) -> Self {
        Self { paths, analytics }
    }

    fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        let history_file = self.paths.history_file();
        if !history_file.is_file() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&history_file)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn next_operation(counts: &BTreeMap<RecordState, usize>, total: usize) -> &'static str {
        let count = |state: RecordState| counts.get(&state).copied().unwrap_or(0);
        if total == 0 {
            return "add result files to data/search/ and run `litrev search`";
        }
        if count(RecordState::NeedsManualCleansing) > 0 {
            return "fix the flagged records, then rerun `litrev cleanse_records`";
        }
        if count(RecordState::Imported) > 0 {
            return "run `litrev cleanse_records`";
        }
        if count(RecordState::Processed) > 0 {
            return "run `litrev screen_1`";
        }
        if count(RecordState::PrescreenIncluded) > 0 {
            return "run `litrev screen`";
        }
        if count(RecordState::Included) > 0 {
            return "run `litrev data`";
        }
        "review complete"
    }
}

#[async_trait]
impl Operation for StatusOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Status
    }

    async fn run(&self, store: &dyn RecordStore) -> Result<OperationReport> {
        let records = store.load().await?;
        let mut report = OperationReport::new(self.kind());

        let mut counts: BTreeMap<RecordState, usize> = BTreeMap::new();
        for record in &records {
            *counts.entry(record.status).or_insert(0) += 1;
        }

        let total = records.len();
        let settled = records.iter().filter(|r| r.status.tier() >= 3).count();
        let progress = if total == 0 {
            0.0
        } else {
            settled as f64 / total as f64 * 100.0
        };

        println!("📋 Review status ({} records)", total);
        for state in RecordState::all() {
            let count = counts.get(state).copied().unwrap_or(0);
            if count > 0 {
                println!("  {:<24} {}", state.as_str(), count);
                report.note(format!("{}: {}", state.as_str(), count));
            }
        }
        println!("  progress: {:.0}%", progress);

        let advice = Self::next_operation(&counts, total);
        println!("➡️  next: {}", advice);
        report.note(format!("next: {}", advice));

        if self.analytics {
            let history = self.load_history()?;
            println!("🕘 Operation history (most recent first):");
            for entry in history.iter().rev() {
                println!(
                    "  {} {} ({} records)",
                    entry.finished_at, entry.operation, entry.processed
                );
            }
        }

        report.processed = total;
        Ok(report)
    }
}
