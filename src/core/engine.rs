use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::project::ProjectPaths;
use crate::core::{Operation, OperationReport, RecordStore, Result};
use crate::utils::error::ReviewError;
use crate::utils::monitor::SystemMonitor;
use crate::utils::repo;

/// One line of the operation history at `output/history.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub operation: String,
    pub finished_at: String,
    pub processed: usize,
}

/// Runs operations with precondition checks, history bookkeeping and
/// a best-effort git commit after each mutating step.
pub struct ReviewEngine<S: RecordStore> {
    store: S,
    paths: ProjectPaths,
    force: bool,
    monitor: SystemMonitor,
}

impl<S: RecordStore> ReviewEngine<S> {
    pub fn new(store: S, paths: ProjectPaths, force: bool) -> Self {
        Self {
            store,
            paths,
            force,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(store: S, paths: ProjectPaths, force: bool) -> Self {
        Self {
            store,
            paths,
            force,
            monitor: SystemMonitor::new(true),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn execute(&self, operation: &dyn Operation) -> Result<OperationReport> {
        let kind = operation.kind();
        info!("Starting operation: {}", kind);

        if kind.mutates_records() {
            repo::require_clean_worktree(&self.paths.root, self.force)?;
        }
        self.check_precondition(operation).await?;

        let report = operation.run(&self.store).await?;
        self.monitor.log_stats(kind.label());

        if kind.mutates_records() {
            self.append_history(&report)?;
            repo::commit_all(&self.paths.root, &format!("litrev {}", kind.label()));
        }

        info!(
            "Finished operation: {} ({} records processed)",
            kind, report.processed
        );
        Ok(report)
    }

    pub async fn execute_all(
        &self,
        operations: Vec<Box<dyn Operation>>,
    ) -> Result<Vec<OperationReport>> {
        let mut reports = Vec::with_capacity(operations.len());
        for operation in operations {
            reports.push(self.execute(operation.as_ref()).await?);
        }
        Ok(reports)
    }

    /// Every non-terminal record must have reached the operation's
    /// required tier. Terminal records never block.
    async fn check_precondition(&self, operation: &dyn Operation) -> Result<()> {
        if self.force {
            debug!("Skipping precondition check (--force)");
            return Ok(());
        }

        let kind = operation.kind();
        let required = kind.required_tier();
        if required == 0 {
            return Ok(());
        }

        let records = self.store.load().await?;
        let blocking: Vec<&str> = records
            .iter()
            .filter(|r| !r.status.is_terminal() && r.status.tier() < required)
            .map(|r| r.id.as_str())
            .collect();

        if blocking.is_empty() {
            return Ok(());
        }

        Err(ReviewError::ProcessOrderViolation {
            operation: kind.label().to_string(),
            blocking: blocking.join(", "),
        })
    }

    fn append_history(&self, report: &OperationReport) -> Result<()> {
        let history_file = self.paths.history_file();
        let mut entries: Vec<HistoryEntry> = if history_file.is_file() {
            let content = std::fs::read_to_string(&history_file)?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };

        entries.push(HistoryEntry {
            operation: report.operation.clone(),
            finished_at: chrono::Utc::now().to_rfc3339(),
            processed: report.processed,
        });

        if let Some(parent) = history_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&history_file, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    pub fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        let history_file = self.paths.history_file();
        if !history_file.is_file() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&history_file)?;
        Ok(serde_json::from_str(&content)?)
    }
}
