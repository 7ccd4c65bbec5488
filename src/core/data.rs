use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::info;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::config::project::ProjectPaths;
use crate::config::settings::DataSettings;
use crate::core::{Operation, OperationKind, OperationReport, Record, RecordStore, Result};
use crate::domain::model::RecordState;

/// Builds the synthesis outputs for the included records: a sample
/// profile, an extraction table and an optional zip bundle. Records
/// with a filled-in synthesis cell advance to `synthesized`.
pub struct DataOperation {
    paths: ProjectPaths,
    settings: DataSettings,
}

impl DataOperation {
    pub fn new(paths: ProjectPaths, settings: DataSettings) -> Self {
        Self { paths, settings }
    }

    fn extraction_file(&self) -> std::path::PathBuf {
        self.paths.output_dir().join("data_extraction.csv")
    }

    fn profile_file(&self) -> std::path::PathBuf {
        self.paths.output_dir().join("sample_profile.csv")
    }

    /// Outlet and year distribution of the included sample.
    fn write_sample_profile(&self, records: &[&Record]) -> Result<()> {
        let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
        for record in records {
            let outlet = record
                .field("journal")
                .or_else(|| record.field("booktitle"))
                .unwrap_or("unknown")
                .to_string();
            let year = record.field("year").unwrap_or("unknown").to_string();
            *counts.entry((outlet, year)).or_insert(0) += 1;
        }

        let mut writer = csv::Writer::from_path(self.profile_file())?;
        writer.write_record(["outlet", "year", "count"])?;
        for ((outlet, year), count) in &counts {
            writer.write_record([outlet.as_str(), year.as_str(), &count.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn read_synthesis_cells(&self) -> Result<BTreeMap<String, String>> {
        let path = self.extraction_file();
        let mut cells = BTreeMap::new();
        if !path.is_file() {
            return Ok(cells);
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        for result in reader.records() {
            let row = result?;
            let fields: BTreeMap<&str, &str> = headers.iter().zip(row.iter()).collect();
            if let (Some(id), Some(synthesis)) = (fields.get("id"), fields.get("synthesis")) {
                if !synthesis.trim().is_empty() {
                    cells.insert(id.to_string(), synthesis.trim().to_string());
                }
            }
        }
        Ok(cells)
    }

    fn write_extraction_table(
        &self,
        records: &[&Record],
        cells: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.extraction_file())?;
        writer.write_record(["id", "title", "synthesis"])?;
        for record in records {
            writer.write_record([
                record.id.as_str(),
                record.field("title").unwrap_or(""),
                cells.get(&record.id).map(String::as_str).unwrap_or(""),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_bundle(&self, filename: &str) -> Result<std::path::PathBuf> {
        let output_path = self.paths.output_dir().join(filename);

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            for source in [self.profile_file(), self.extraction_file()] {
                if !source.is_file() {
                    continue;
                }
                let name = source
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                zip.start_file(name, SimpleFileOptions::default())?;
                zip.write_all(std::fs::read(&source)?.as_slice())?;
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        std::fs::write(&output_path, &zip_data)?;
        Ok(output_path)
    }
}

#[async_trait]
impl Operation for DataOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Data
    }

    async fn run(&self, store: &dyn RecordStore) -> Result<OperationReport> {
        let mut records = store.load().await?;
        let mut report = OperationReport::new(self.kind());

        std::fs::create_dir_all(self.paths.output_dir())?;
        let cells = self.read_synthesis_cells()?;

        let mut synthesized = 0usize;
        for record in records.iter_mut() {
            if record.status == RecordState::Included && cells.contains_key(&record.id) {
                record.status = RecordState::Synthesized;
                synthesized += 1;
            }
        }

        let included: Vec<&Record> = records
            .iter()
            .filter(|r| matches!(r.status, RecordState::Included | RecordState::Synthesized))
            .collect();

        if self.settings.profile {
            self.write_sample_profile(&included)?;
            report.note(format!(
                "sample profile: {}",
                self.profile_file().display()
            ));
        }

        self.write_extraction_table(&included, &cells)?;
        report.processed = included.len();
        report.output_path = Some(self.extraction_file().display().to_string());

        if let Some(compression) = &self.settings.compression {
            if compression.enabled {
                let bundle = self.write_bundle(&compression.filename)?;
                report.note(format!("bundle: {}", bundle.display()));
            }
        }

        store.save(&records).await?;
        info!(
            "Data outputs written for {} records ({} synthesized)",
            report.processed, synthesized
        );
        Ok(report)
    }
}
