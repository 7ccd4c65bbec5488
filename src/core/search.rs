use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::project::ProjectPaths;
use crate::config::settings::{IdPattern, ReviewSettings, SearchSource};
use crate::core::{Operation, OperationKind, OperationReport, Record, RecordStore, Result};
use crate::domain::model::RecordState;
use crate::utils::error::ReviewError;

/// Imports rows from the registered source files under `data/search/`
/// into the dataset, assigning identifiers and skipping rows that have
/// already been imported. Row provenance is derived from the title, so
/// origins stay stable when new rows are inserted mid-file.
pub struct SearchOperation {
    paths: ProjectPaths,
    settings: ReviewSettings,
}

impl SearchOperation {
    pub fn new(paths: ProjectPaths, settings: ReviewSettings) -> Self {
        Self { paths, settings }
    }

    fn read_source_rows(&self, source: &SearchSource) -> Result<Vec<BTreeMap<String, String>>> {
        let path = self.paths.search_dir().join(&source.filename);
        if !path.is_file() {
            warn!("Source file not found: {}", path.display());
            return Ok(Vec::new());
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        match extension.as_str() {
            "csv" => {
                let mut reader = csv::Reader::from_path(&path)?;
                let headers = reader.headers()?.clone();
                let mut rows = Vec::new();
                for result in reader.records() {
                    let row = result?;
                    let mut fields = BTreeMap::new();
                    for (header, value) in headers.iter().zip(row.iter()) {
                        if !value.trim().is_empty() {
                            fields.insert(header.to_string(), value.trim().to_string());
                        }
                    }
                    rows.push(fields);
                }
                Ok(rows)
            }
            "json" => {
                let content = std::fs::read_to_string(&path)?;
                let values: Vec<serde_json::Value> = serde_json::from_str(&content)?;
                let rows = values
                    .into_iter()
                    .map(|value| {
                        let mut fields = BTreeMap::new();
                        if let serde_json::Value::Object(map) = value {
                            for (key, val) in map {
                                let text = match val {
                                    serde_json::Value::String(s) => s,
                                    other => other.to_string(),
                                };
                                if !text.trim().is_empty() {
                                    fields.insert(key, text.trim().to_string());
                                }
                            }
                        }
                        fields
                    })
                    .collect();
                Ok(rows)
            }
            other => Err(ReviewError::Parameter(format!(
                "Unsupported source file format: {} ({})",
                other, source.filename
            ))),
        }
    }

    fn warn_unregistered_files(&self) {
        let Ok(entries) = std::fs::read_dir(self.paths.search_dir()) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if self.settings.source_for_file(&name).is_none() {
                warn!("File in data/search/ has no registered source: {}", name);
            }
        }
    }
}

#[async_trait]
impl Operation for SearchOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Search
    }

    async fn run(&self, store: &dyn RecordStore) -> Result<OperationReport> {
        let mut records = store.load().await?;
        let mut report = OperationReport::new(self.kind());

        self.warn_unregistered_files();

        for source in &self.settings.sources {
            let rows = self.read_source_rows(source)?;
            let mut imported = 0usize;

            for fields in rows {
                let Some(title) = fields.get("title") else {
                    warn!("Skipping row without title in {}", source.filename);
                    continue;
                };
                let origin = format!("{}/{}", source.filename, sanitize(title).to_lowercase());
                if records.iter().any(|r| r.origin.contains(&origin)) {
                    continue;
                }

                let mut record = Record::new("", fields
                    .get("entrytype")
                    .cloned()
                    .unwrap_or_else(|| "article".to_string()));
                record.status = RecordState::Imported;
                record.origin.push(origin);
                record.fields = fields;
                record.fields.remove("entrytype");

                match assign_id(&records, &record, self.settings.project.id_pattern) {
                    Some(id) => {
                        record.id = id;
                        records.push(record);
                        imported += 1;
                    }
                    None => {
                        info!("remove duplicate {}", record.field("title").unwrap_or(""));
                    }
                }
            }

            if imported > 0 {
                report.note(format!("{}: {} new records", source.name, imported));
            }
            report.processed += imported;
        }

        store.save(&records).await?;
        info!("Imported {} new records", report.processed);
        Ok(report)
    }
}

fn sanitize(part: &str) -> String {
    part.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Builds the identifier stem from the author and year fields per the
/// configured pattern; the first title word stands in when no author
/// is available.
fn id_stem(record: &Record, pattern: IdPattern) -> String {
    let surnames = record.author_surnames();
    let year = record.field("year").map(sanitize).unwrap_or_default();

    let stem = if surnames.is_empty() {
        record
            .field("title")
            .and_then(|t| t.split_whitespace().next())
            .map(sanitize)
            .unwrap_or_else(|| "Anonymous".to_string())
    } else {
        match pattern {
            IdPattern::FirstAuthorYear => sanitize(&surnames[0]),
            IdPattern::ThreeAuthorsYear => surnames
                .iter()
                .take(3)
                .map(|s| sanitize(s))
                .collect::<Vec<_>>()
                .join(""),
        }
    };

    format!("{}{}", stem, year)
}

/// Returns a free identifier for the record, or None when the record
/// duplicates one already stored under the same stem.
fn assign_id(records: &[Record], record: &Record, pattern: IdPattern) -> Option<String> {
    let stem = id_stem(record, pattern);

    let colliding: Vec<&Record> = records
        .iter()
        .filter(|r| r.id == stem || r.id.starts_with(&format!("{}-", stem)))
        .collect();

    if colliding.is_empty() {
        return Some(stem);
    }
    if colliding.iter().any(|r| r.similarity(record) >= 0.9) {
        return None;
    }

    let mut suffix = 1usize;
    loop {
        let candidate = format!("{}-{}", stem, suffix);
        if !records.iter().any(|r| r.id == candidate) {
            return Some(candidate);
        }
        suffix += 1;
    }
}

/// Prints the registered sources to stdout.
pub fn view_sources(settings: &ReviewSettings) {
    if settings.sources.is_empty() {
        println!("No sources registered in review.toml");
        return;
    }
    println!("Registered sources:");
    for source in &settings.sources {
        println!(
            "  {} ({:?}) -> data/search/{}",
            source.name, source.search_type, source.filename
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{default_settings, ReviewType, SearchType};
    use crate::core::store::JsonRecordStore;
    use tempfile::TempDir;

    fn project_with_source(dir: &TempDir, filename: &str) -> (ProjectPaths, ReviewSettings) {
        let paths = ProjectPaths::new(dir.path());
        std::fs::create_dir_all(paths.search_dir()).unwrap();

        let mut settings = default_settings("Test", ReviewType::Literature);
        settings.sources.push(SearchSource {
            name: "TestDb".to_string(),
            filename: filename.to_string(),
            search_type: SearchType::Db,
            comment: None,
        });
        (paths, settings)
    }

    #[tokio::test]
    async fn test_import_csv_rows() {
        let dir = TempDir::new().unwrap();
        let (paths, settings) = project_with_source(&dir, "export.csv");
        std::fs::write(
            paths.search_dir().join("export.csv"),
            "title,author,year\nDigital platforms,\"Rai, Arun\",2020\nCompiler design,\"Aho, Alfred\",1986\n",
        )
        .unwrap();

        let store = JsonRecordStore::new(paths.records_file());
        let op = SearchOperation::new(paths, settings);
        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 2);

        let records = store.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "Rai2020");
        assert_eq!(records[0].status, RecordState::Imported);
        assert_eq!(records[0].origin, vec!["export.csv/digitalplatforms"]);
        assert_eq!(records[1].id, "Aho1986");
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (paths, settings) = project_with_source(&dir, "export.csv");
        std::fs::write(
            paths.search_dir().join("export.csv"),
            "title,author,year\nDigital platforms,\"Rai, Arun\",2020\n",
        )
        .unwrap();

        let store = JsonRecordStore::new(paths.records_file());
        let op = SearchOperation::new(paths, settings);
        op.run(&store).await.unwrap();
        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_near_duplicates_are_dropped() {
        let dir = TempDir::new().unwrap();
        let (paths, settings) = project_with_source(&dir, "export.csv");
        std::fs::write(
            paths.search_dir().join("export.csv"),
            "title,author,year\nDigital platforms and ecosystems,\"Rai, Arun\",2020\nThe digital platforms and ecosystems,\"Rai, Arun\",2020\n",
        )
        .unwrap();

        let store = JsonRecordStore::new(paths.records_file());
        let op = SearchOperation::new(paths, settings);
        let report = op.run(&store).await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inserted_rows_do_not_shift_existing_origins() {
        let dir = TempDir::new().unwrap();
        let (paths, settings) = project_with_source(&dir, "export.csv");
        std::fs::write(
            paths.search_dir().join("export.csv"),
            "title,author,year\nPlatform governance,\"Rai, Arun\",2020\nCompiler design,\"Aho, Alfred\",1986\n",
        )
        .unwrap();

        let store = JsonRecordStore::new(paths.records_file());
        let op = SearchOperation::new(paths.clone(), settings);
        op.run(&store).await.unwrap();

        // A row inserted at the top must not re-import the rows below it.
        std::fs::write(
            paths.search_dir().join("export.csv"),
            "title,author,year\nTrust in online markets,\"Gefen, David\",2019\nPlatform governance,\"Rai, Arun\",2020\nCompiler design,\"Aho, Alfred\",1986\n",
        )
        .unwrap();

        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 1);

        let records = store.load().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records
                .iter()
                .filter(|r| r.id.starts_with("Rai2020"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_id_collision_gets_suffix() {
        let dir = TempDir::new().unwrap();
        let (paths, settings) = project_with_source(&dir, "export.csv");
        std::fs::write(
            paths.search_dir().join("export.csv"),
            "title,author,year\nPlatform governance,\"Rai, Arun\",2020\nEcosystem orchestration in practice,\"Rai, Anita\",2020\n",
        )
        .unwrap();

        let store = JsonRecordStore::new(paths.records_file());
        let op = SearchOperation::new(paths, settings);
        op.run(&store).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records[0].id, "Rai2020");
        assert_eq!(records[1].id, "Rai2020-1");
    }

    #[tokio::test]
    async fn test_three_authors_pattern() {
        let dir = TempDir::new().unwrap();
        let (paths, mut settings) = project_with_source(&dir, "export.csv");
        settings.project.id_pattern = IdPattern::ThreeAuthorsYear;
        std::fs::write(
            paths.search_dir().join("export.csv"),
            "title,author,year\nA study,\"Mourato, Inês and Dias, Álvaro and Pereira, Leandro\",2022\n",
        )
        .unwrap();

        let store = JsonRecordStore::new(paths.records_file());
        let op = SearchOperation::new(paths, settings);
        op.run(&store).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records[0].id, "MouratoDiasPereira2022");
    }

    #[tokio::test]
    async fn test_json_source() {
        let dir = TempDir::new().unwrap();
        let (paths, settings) = project_with_source(&dir, "export.json");
        std::fs::write(
            paths.search_dir().join("export.json"),
            r#"[{"title": "Platform governance", "author": "Rai, Arun", "year": 2020}]"#,
        )
        .unwrap();

        let store = JsonRecordStore::new(paths.records_file());
        let op = SearchOperation::new(paths, settings);
        op.run(&store).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records[0].id, "Rai2020");
        assert_eq!(records[0].field("year"), Some("2020"));
    }

    #[tokio::test]
    async fn test_rows_without_title_are_skipped() {
        let dir = TempDir::new().unwrap();
        let (paths, settings) = project_with_source(&dir, "export.csv");
        std::fs::write(
            paths.search_dir().join("export.csv"),
            "title,author,year\n,\"Rai, Arun\",2020\n",
        )
        .unwrap();

        let store = JsonRecordStore::new(paths.records_file());
        let op = SearchOperation::new(paths, settings);
        let report = op.run(&store).await.unwrap();
        assert_eq!(report.processed, 0);
    }
}
