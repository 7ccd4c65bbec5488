use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::config::settings::CleanseSettings;
use crate::core::quality::QualityModel;
use crate::core::{Operation, OperationKind, OperationReport, Record, RecordStore, Result};
use crate::domain::model::RecordState;

/// Maps common export spellings to ISO 639-3 codes.
fn normalize_language_code(value: &str) -> Option<&'static str> {
    match value {
        "ENG" | "EN" | "English" | "english" => Some("eng"),
        "GER" | "DE" | "German" | "german" => Some("deu"),
        "FR" | "French" | "french" => Some("fra"),
        "ES" | "Spanish" | "spanish" => Some("spa"),
        _ => None,
    }
}

/// Normalizes imported records and runs the quality model over them.
/// Clean records advance to `processed`, defective ones to
/// `needs_manual_cleansing`.
pub struct CleanseOperation {
    settings: CleanseSettings,
    quality: QualityModel,
    html_tag_re: Regex,
    whitespace_re: Regex,
}

impl CleanseOperation {
    pub fn new(settings: CleanseSettings) -> Self {
        Self {
            settings,
            quality: QualityModel::new(),
            html_tag_re: Regex::new(r"<[^>]*>").unwrap(),
            whitespace_re: Regex::new(r"\s+").unwrap(),
        }
    }

    fn cleanse_record(&self, record: &mut Record) {
        let keys: Vec<String> = record.fields.keys().cloned().collect();
        for key in &keys {
            let Some(value) = record.fields.get(key) else {
                continue;
            };
            let mut cleaned = value.clone();

            if self.settings.remove_html_tags {
                cleaned = self.html_tag_re.replace_all(&cleaned, "").to_string();
            }
            if self.settings.trim_whitespace {
                cleaned = self
                    .whitespace_re
                    .replace_all(cleaned.trim(), " ")
                    .to_string();
            }
            record.fields.insert(key.clone(), cleaned);
        }

        if self.settings.normalize_language {
            if let Some(code) = record
                .field("language")
                .and_then(normalize_language_code)
            {
                record.set_field("language", code);
            }
        }

        // Journals labelled "... conference proceedings." are really
        // proceedings entries with the container in the wrong field.
        if let Some(journal) = record.field("journal").map(str::to_string) {
            if journal.to_lowercase().ends_with("conference proceedings.") {
                record.entrytype = "inproceedings".to_string();
                record.fields.remove("journal");
                record.set_field("booktitle", journal.trim_end_matches('.'));
            }
        }

        if !self.settings.fields_to_keep.is_empty() {
            record
                .fields
                .retain(|key, _| self.settings.fields_to_keep.iter().any(|k| k == key));
        }
    }
}

#[async_trait]
impl Operation for CleanseOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Cleanse
    }

    async fn run(&self, store: &dyn RecordStore) -> Result<OperationReport> {
        let mut records = store.load().await?;
        let mut report = OperationReport::new(self.kind());
        let mut flagged = 0usize;

        for record in records
            .iter_mut()
            .filter(|r| r.status == RecordState::Imported)
        {
            self.cleanse_record(record);
            self.quality.assess(record);

            if record.has_defects() {
                record.status = RecordState::NeedsManualCleansing;
                flagged += 1;
                debug!("Record {} needs manual cleansing", record.id);
            } else {
                record.status = RecordState::Processed;
            }
            report.processed += 1;
        }

        store.save(&records).await?;
        if flagged > 0 {
            report.note(format!("{} records need manual cleansing", flagged));
        }
        info!(
            "Cleansed {} records ({} flagged for manual work)",
            report.processed, flagged
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::JsonRecordStore;
    use tempfile::TempDir;

    fn imported_record(id: &str) -> Record {
        let mut record = Record::new(id, "article");
        record.status = RecordState::Imported;
        record.set_field("author", "Rai, Arun");
        record.set_field("title", "Digital platforms and ecosystems");
        record.set_field("journal", "MIS Quarterly");
        record.set_field("year", "2020");
        record.set_field("volume", "44");
        record.set_field("number", "1");
        record
    }

    #[tokio::test]
    async fn test_clean_record_advances_to_processed() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));
        store.save(&[imported_record("Rai2020")]).await.unwrap();

        let op = CleanseOperation::new(CleanseSettings::default());
        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 1);

        let records = store.load().await.unwrap();
        assert_eq!(records[0].status, RecordState::Processed);
    }

    #[tokio::test]
    async fn test_defective_record_needs_manual_cleansing() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));

        let mut record = imported_record("Dutton2021");
        record.set_field("author", "DUTTON, JANE");
        store.save(&[record]).await.unwrap();

        let op = CleanseOperation::new(CleanseSettings::default());
        op.run(&store).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records[0].status, RecordState::NeedsManualCleansing);
        assert!(records[0].notes.contains_key("author"));
    }

    #[tokio::test]
    async fn test_html_and_whitespace_normalization() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));

        let mut record = imported_record("Rai2020");
        record.set_field("title", "  Digital  <i>platform</i>   research ");
        store.save(&[record]).await.unwrap();

        let op = CleanseOperation::new(CleanseSettings::default());
        op.run(&store).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records[0].field("title"), Some("Digital platform research"));
    }

    #[tokio::test]
    async fn test_language_normalization() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));

        let mut record = imported_record("Rai2020");
        record.set_field("language", "ENG");
        store.save(&[record]).await.unwrap();

        let op = CleanseOperation::new(CleanseSettings::default());
        op.run(&store).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records[0].field("language"), Some("eng"));
        assert_eq!(records[0].status, RecordState::Processed);
    }

    #[tokio::test]
    async fn test_conference_proceedings_journal_becomes_booktitle() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));

        let mut record = imported_record("Smith2019");
        record.set_field("journal", "ICIS Conference Proceedings.");
        record.fields.remove("volume");
        record.fields.remove("number");
        store.save(&[record]).await.unwrap();

        let op = CleanseOperation::new(CleanseSettings::default());
        op.run(&store).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records[0].entrytype, "inproceedings");
        assert_eq!(records[0].field("journal"), None);
        assert_eq!(
            records[0].field("booktitle"),
            Some("ICIS Conference Proceedings")
        );
    }

    #[tokio::test]
    async fn test_fields_to_keep_filter() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));

        let mut record = imported_record("Rai2020");
        record.set_field("abstract", "Long text");
        store.save(&[record]).await.unwrap();

        let settings = CleanseSettings {
            fields_to_keep: vec![
                "author".to_string(),
                "title".to_string(),
                "journal".to_string(),
                "year".to_string(),
                "volume".to_string(),
                "number".to_string(),
            ],
            ..CleanseSettings::default()
        };
        let op = CleanseOperation::new(settings);
        op.run(&store).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records[0].field("abstract"), None);
        assert_eq!(records[0].field("title").is_some(), true);
    }

    #[tokio::test]
    async fn test_non_imported_records_untouched() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records.json"));

        let mut record = imported_record("Rai2020");
        record.status = RecordState::Included;
        record.set_field("title", "  spaced  ");
        store.save(&[record]).await.unwrap();

        let op = CleanseOperation::new(CleanseSettings::default());
        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 0);

        let records = store.load().await.unwrap();
        assert_eq!(records[0].field("title"), Some("  spaced  "));
    }
}
