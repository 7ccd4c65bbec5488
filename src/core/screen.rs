use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::settings::ScreenSettings;
use crate::core::{Operation, OperationKind, OperationReport, Record, RecordStore, Result};
use crate::domain::model::RecordState;
use crate::utils::error::ReviewError;

/// How a screening step obtains its decisions.
#[derive(Debug, Clone)]
pub enum TableAction {
    /// Report what is pending without deciding anything.
    Run,
    /// Include every pending record.
    IncludeAll,
    /// Write pending records to a CSV decision table.
    Export(PathBuf),
    /// Apply decisions from a filled-in CSV table.
    Import(PathBuf),
}

/// Screens prescreen-included records against the configured criteria.
/// Decisions arrive through CSV tables so that screening can happen in
/// a spreadsheet and be committed like any other change.
pub struct ScreenOperation {
    settings: ScreenSettings,
    action: TableAction,
}

impl ScreenOperation {
    pub fn new(settings: ScreenSettings, action: TableAction) -> Self {
        Self { settings, action }
    }

    fn criteria_names(&self) -> Vec<&str> {
        self.settings.criteria.keys().map(String::as_str).collect()
    }

    fn require_criteria(&self) -> Result<()> {
        if self.settings.criteria.is_empty() {
            return Err(ReviewError::MissingSetting {
                field: "screen.criteria".to_string(),
            });
        }
        Ok(())
    }

    fn export_table(&self, records: &[Record], path: &PathBuf) -> Result<()> {
        self.require_criteria()?;
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["id".to_string(), "title".to_string()];
        header.extend(self.criteria_names().iter().map(|n| n.to_string()));
        writer.write_record(&header)?;

        for record in records
            .iter()
            .filter(|r| r.status == RecordState::PrescreenIncluded)
        {
            let mut row = vec![
                record.id.clone(),
                record.field("title").unwrap_or("").to_string(),
            ];
            row.extend(self.criteria_names().iter().map(|_| String::new()));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn import_table(&self, records: &mut [Record], path: &PathBuf) -> Result<usize> {
        self.require_criteria()?;
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let mut decisions: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for result in reader.records() {
            let row = result?;
            let mut cells: BTreeMap<String, String> = headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.to_string(), v.trim().to_lowercase()))
                .collect();
            let Some(id) = cells.remove("id") else {
                continue;
            };
            decisions.insert(id, cells);
        }

        let mut decided = 0usize;
        for record in records
            .iter_mut()
            .filter(|r| r.status == RecordState::PrescreenIncluded)
        {
            let Some(cells) = decisions.get(&record.id) else {
                continue;
            };

            let verdicts: Vec<(String, String)> = self
                .criteria_names()
                .iter()
                .filter_map(|name| {
                    cells
                        .get(*name)
                        .filter(|v| !v.is_empty())
                        .map(|v| (name.to_string(), v.clone()))
                })
                .collect();

            if verdicts.len() < self.settings.criteria.len() {
                warn!("Incomplete decisions for {}, leaving undecided", record.id);
                continue;
            }

            let excluded = verdicts.iter().any(|(_, v)| v == "out");
            record.status = if excluded {
                RecordState::Excluded
            } else {
                RecordState::Included
            };
            record.set_field(
                "screening_criteria",
                verdicts
                    .iter()
                    .map(|(name, v)| format!("{}={}", name, v))
                    .collect::<Vec<_>>()
                    .join(";"),
            );
            decided += 1;
        }
        Ok(decided)
    }

    fn include_all(&self, records: &mut [Record]) -> usize {
        let mut decided = 0usize;
        let marks = self
            .criteria_names()
            .iter()
            .map(|name| format!("{}=in", name))
            .collect::<Vec<_>>()
            .join(";");

        for record in records
            .iter_mut()
            .filter(|r| r.status == RecordState::PrescreenIncluded)
        {
            record.status = RecordState::Included;
            if !marks.is_empty() {
                record.set_field("screening_criteria", marks.clone());
            }
            decided += 1;
        }
        decided
    }
}

#[async_trait]
impl Operation for ScreenOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Screen
    }

    async fn run(&self, store: &dyn RecordStore) -> Result<OperationReport> {
        let mut records = store.load().await?;
        let mut report = OperationReport::new(self.kind());

        match &self.action {
            TableAction::Run => {
                let pending = records
                    .iter()
                    .filter(|r| r.status == RecordState::PrescreenIncluded)
                    .count();
                report.note(format!("{} records awaiting screening", pending));
                info!("{} records awaiting screening", pending);
            }
            TableAction::IncludeAll => {
                report.processed = self.include_all(&mut records);
                store.save(&records).await?;
                info!("Included {} records", report.processed);
            }
            TableAction::Export(path) => {
                self.export_table(&records, path)?;
                report.output_path = Some(path.display().to_string());
                info!("Exported screening table to {}", path.display());
            }
            TableAction::Import(path) => {
                report.processed = self.import_table(&mut records, path)?;
                store.save(&records).await?;
                info!("Applied {} screening decisions", report.processed);
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{CriterionType, ScreenCriterion};
    use crate::core::store::JsonRecordStore;
    use tempfile::TempDir;

    fn screen_settings() -> ScreenSettings {
        let mut criteria = BTreeMap::new();
        criteria.insert(
            "empirical".to_string(),
            ScreenCriterion {
                explanation: "Reports an empirical study".to_string(),
                criterion_type: CriterionType::InclusionCriterion,
                comment: None,
            },
        );
        criteria.insert(
            "peer_reviewed".to_string(),
            ScreenCriterion {
                explanation: "Published in a peer-reviewed outlet".to_string(),
                criterion_type: CriterionType::InclusionCriterion,
                comment: None,
            },
        );
        ScreenSettings {
            explanation: None,
            criteria,
        }
    }

    fn pending_record(id: &str, title: &str) -> Record {
        let mut record = Record::new(id, "article");
        record.status = RecordState::PrescreenIncluded;
        record.set_field("title", title);
        record
    }

    #[tokio::test]
    async fn test_include_all_marks_all_criteria() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));
        store
            .save(&[pending_record("Rai2020", "Platforms")])
            .await
            .unwrap();

        let op = ScreenOperation::new(screen_settings(), TableAction::IncludeAll);
        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 1);

        let records = store.load().await.unwrap();
        assert_eq!(records[0].status, RecordState::Included);
        assert_eq!(
            records[0].field("screening_criteria"),
            Some("empirical=in;peer_reviewed=in")
        );
    }

    #[tokio::test]
    async fn test_export_then_import_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));
        store
            .save(&[
                pending_record("Rai2020", "Platforms"),
                pending_record("Aho1986", "Compilers"),
            ])
            .await
            .unwrap();

        let table = dir.path().join("screen.csv");
        let op = ScreenOperation::new(screen_settings(), TableAction::Export(table.clone()));
        op.run(&store).await.unwrap();

        let content = std::fs::read_to_string(&table).unwrap();
        assert!(content.starts_with("id,title,empirical,peer_reviewed"));

        std::fs::write(
            &table,
            "id,title,empirical,peer_reviewed\nRai2020,Platforms,in,in\nAho1986,Compilers,in,out\n",
        )
        .unwrap();

        let op = ScreenOperation::new(screen_settings(), TableAction::Import(table));
        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 2);

        let records = store.load().await.unwrap();
        let rai = records.iter().find(|r| r.id == "Rai2020").unwrap();
        let aho = records.iter().find(|r| r.id == "Aho1986").unwrap();
        assert_eq!(rai.status, RecordState::Included);
        assert_eq!(aho.status, RecordState::Excluded);
        assert_eq!(
            aho.field("screening_criteria"),
            Some("empirical=in;peer_reviewed=out")
        );
    }

    #[tokio::test]
    async fn test_incomplete_decisions_leave_record_pending() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));
        store
            .save(&[pending_record("Rai2020", "Platforms")])
            .await
            .unwrap();

        let table = dir.path().join("screen.csv");
        std::fs::write(
            &table,
            "id,title,empirical,peer_reviewed\nRai2020,Platforms,in,\n",
        )
        .unwrap();

        let op = ScreenOperation::new(screen_settings(), TableAction::Import(table));
        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 0);

        let records = store.load().await.unwrap();
        assert_eq!(records[0].status, RecordState::PrescreenIncluded);
    }

    #[tokio::test]
    async fn test_export_without_criteria_fails() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));
        store.save(&[]).await.unwrap();

        let settings = ScreenSettings::default();
        let table = dir.path().join("screen.csv");
        let op = ScreenOperation::new(settings, TableAction::Export(table));
        let err = op.run(&store).await.unwrap_err();
        assert!(matches!(err, ReviewError::MissingSetting { .. }));
    }
}
