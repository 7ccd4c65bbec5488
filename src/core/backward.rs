use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

use crate::config::project::ProjectPaths;
use crate::config::settings::{ReviewSettings, SearchSource, SearchType};
use crate::core::{Operation, OperationKind, OperationReport, RecordStore, Result};
use crate::domain::model::RecordState;

const BACKWARD_FILE: &str = "backward_search.csv";

/// Collects the reference lists of included records into a new search
/// source file, registering that source in the settings.
pub struct BackwardSearchOperation {
    paths: ProjectPaths,
}

impl BackwardSearchOperation {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    fn register_source(&self) -> Result<()> {
        let mut settings = ReviewSettings::from_file(self.paths.settings_file())?;
        if settings.source_for_file(BACKWARD_FILE).is_some() {
            return Ok(());
        }
        settings.sources.push(SearchSource {
            name: "backward_search".to_string(),
            filename: BACKWARD_FILE.to_string(),
            search_type: SearchType::Backward,
            comment: Some("References cited by included records".to_string()),
        });
        settings.save(self.paths.settings_file())
    }
}

#[async_trait]
impl Operation for BackwardSearchOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::BackwardSearch
    }

    async fn run(&self, store: &dyn RecordStore) -> Result<OperationReport> {
        let records = store.load().await?;
        let mut report = OperationReport::new(self.kind());

        // reference title -> ids of the records citing it
        let mut cited: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| matches!(r.status, RecordState::Included | RecordState::Synthesized))
        {
            let Some(references) = record.field("references") else {
                continue;
            };
            for reference in references.split(';') {
                let reference = reference.trim();
                if reference.is_empty() {
                    continue;
                }
                cited
                    .entry(reference.to_string())
                    .or_default()
                    .push(record.id.clone());
            }
        }

        let output = self.paths.search_dir().join(BACKWARD_FILE);
        std::fs::create_dir_all(self.paths.search_dir())?;
        let mut writer = csv::Writer::from_path(&output)?;
        writer.write_record(["title", "cited_by"])?;
        for (title, citing) in &cited {
            writer.write_record([title.as_str(), citing.join(";").as_str()])?;
        }
        writer.flush()?;

        self.register_source()?;

        report.processed = cited.len();
        report.output_path = Some(output.display().to_string());
        info!(
            "Collected {} cited references into {}",
            cited.len(),
            output.display()
        );
        Ok(report)
    }
}
