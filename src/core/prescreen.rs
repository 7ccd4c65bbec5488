use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::settings::PrescreenSettings;
use crate::core::screen::TableAction;
use crate::core::{Operation, OperationKind, OperationReport, Record, RecordStore, Result};
use crate::domain::model::RecordState;

/// Title fragments that mark complementary material rather than a
/// study, e.g. editorials and calls for papers.
const COMPLEMENTARY_TITLES: [&str; 6] = [
    "editorial",
    "call for papers",
    "about the authors",
    "erratum",
    "commentary",
    "response to",
];

/// Prescreens processed records on metadata alone. Scope rules from
/// the settings decide automatically; undecidable records pass through
/// as prescreen-included for the full-text screen.
pub struct PrescreenOperation {
    settings: PrescreenSettings,
    action: TableAction,
}

impl PrescreenOperation {
    pub fn new(settings: PrescreenSettings, action: TableAction) -> Self {
        Self { settings, action }
    }

    /// Reasons a record falls outside the review scope; empty means in
    /// scope.
    fn exclusion_reasons(&self, record: &Record) -> Vec<String> {
        let mut reasons = Vec::new();

        if !self.settings.entrytype_scope.is_empty()
            && !self
                .settings
                .entrytype_scope
                .iter()
                .any(|t| t == &record.entrytype)
        {
            reasons.push(format!("entrytype out of scope ({})", record.entrytype));
        }

        let outlet = record
            .field("journal")
            .or_else(|| record.field("booktitle"))
            .unwrap_or("");
        if !self.settings.outlet_inclusion.is_empty()
            && !self
                .settings
                .outlet_inclusion
                .iter()
                .any(|o| o.eq_ignore_ascii_case(outlet))
        {
            reasons.push(format!("outlet not in inclusion list ({})", outlet));
        }
        if self
            .settings
            .outlet_exclusion
            .iter()
            .any(|o| o.eq_ignore_ascii_case(outlet))
        {
            reasons.push(format!("outlet excluded ({})", outlet));
        }

        if let Some(year) = record.field("year").and_then(|y| y.parse::<i32>().ok()) {
            if let Some(from) = self.settings.time_scope_from {
                if year < from {
                    reasons.push(format!("published before {}", from));
                }
            }
            if let Some(to) = self.settings.time_scope_to {
                if year > to {
                    reasons.push(format!("published after {}", to));
                }
            }
        }

        if self.settings.exclude_complementary_materials {
            let title = record.field("title").unwrap_or("").to_lowercase();
            if COMPLEMENTARY_TITLES
                .iter()
                .any(|fragment| title.contains(fragment))
            {
                reasons.push("complementary material".to_string());
            }
        }

        reasons
    }

    fn apply_scope_rules(&self, records: &mut [Record]) -> (usize, usize) {
        let mut included = 0usize;
        let mut excluded = 0usize;

        for record in records
            .iter_mut()
            .filter(|r| r.status == RecordState::Processed)
        {
            let reasons = self.exclusion_reasons(record);
            if reasons.is_empty() {
                record.status = RecordState::PrescreenIncluded;
                included += 1;
            } else {
                record.status = RecordState::PrescreenExcluded;
                record.set_field("prescreen_exclusion_reasons", reasons.join("; "));
                excluded += 1;
            }
        }
        (included, excluded)
    }

    fn export_table(&self, records: &[Record], path: &PathBuf) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["id", "title", "year", "journal", "decision"])?;
        for record in records
            .iter()
            .filter(|r| r.status == RecordState::Processed)
        {
            writer.write_record([
                record.id.as_str(),
                record.field("title").unwrap_or(""),
                record.field("year").unwrap_or(""),
                record
                    .field("journal")
                    .or_else(|| record.field("booktitle"))
                    .unwrap_or(""),
                "",
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn import_table(&self, records: &mut [Record], path: &PathBuf) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let mut decisions: BTreeMap<String, String> = BTreeMap::new();
        for result in reader.records() {
            let row = result?;
            let cells: BTreeMap<&str, &str> = headers.iter().zip(row.iter()).collect();
            if let (Some(id), Some(decision)) = (cells.get("id"), cells.get("decision")) {
                decisions.insert(id.to_string(), decision.trim().to_lowercase());
            }
        }

        let mut decided = 0usize;
        for record in records
            .iter_mut()
            .filter(|r| r.status == RecordState::Processed)
        {
            match decisions.get(&record.id).map(String::as_str) {
                Some("in") => {
                    record.status = RecordState::PrescreenIncluded;
                    decided += 1;
                }
                Some("out") => {
                    record.status = RecordState::PrescreenExcluded;
                    record.set_field("prescreen_exclusion_reasons", "manual decision");
                    decided += 1;
                }
                Some("") | None => {}
                Some(other) => {
                    warn!("Unknown decision '{}' for {}, skipping", other, record.id);
                }
            }
        }
        Ok(decided)
    }
}

#[async_trait]
impl Operation for PrescreenOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Prescreen
    }

    async fn run(&self, store: &dyn RecordStore) -> Result<OperationReport> {
        let mut records = store.load().await?;
        let mut report = OperationReport::new(self.kind());

        match &self.action {
            TableAction::Run => {
                let (included, excluded) = self.apply_scope_rules(&mut records);
                store.save(&records).await?;
                report.processed = included + excluded;
                report.note(format!("{} included, {} excluded", included, excluded));
                info!("Prescreen: {} included, {} excluded", included, excluded);
            }
            TableAction::IncludeAll => {
                let mut included = 0usize;
                for record in records
                    .iter_mut()
                    .filter(|r| r.status == RecordState::Processed)
                {
                    record.status = RecordState::PrescreenIncluded;
                    included += 1;
                }
                store.save(&records).await?;
                report.processed = included;
                info!("Prescreen: included all {} records", included);
            }
            TableAction::Export(path) => {
                self.export_table(&records, path)?;
                report.output_path = Some(path.display().to_string());
                info!("Exported prescreen table to {}", path.display());
            }
            TableAction::Import(path) => {
                report.processed = self.import_table(&mut records, path)?;
                store.save(&records).await?;
                info!("Applied {} prescreen decisions", report.processed);
            }
        }
        Ok(report)
    }
}
