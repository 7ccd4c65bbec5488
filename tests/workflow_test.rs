use litrev::config::project::{init_project, ProjectPaths};
use litrev::config::settings::{ReviewType, SearchSource, SearchType};
use litrev::core::cleanse::CleanseOperation;
use litrev::core::data::DataOperation;
use litrev::core::engine::ReviewEngine;
use litrev::core::prescreen::PrescreenOperation;
use litrev::core::screen::{ScreenOperation, TableAction};
use litrev::core::search::SearchOperation;
use litrev::core::store::JsonRecordStore;
use litrev::core::RecordStore;
use litrev::RecordState;
use tempfile::TempDir;

const SEARCH_CSV: &str = "\
title,author,year,journal,volume,number\n\
Digital platforms and ecosystems,\"Rai, Arun\",2020,MIS Quarterly,44,1\n\
Editorial: welcome to the new issue,\"Straub, Detmar\",2021,MIS Quarterly,45,1\n\
Trust in online markets,\"Gefen, David\",2019,Information Systems Research,30,2\n";

fn setup_project(dir: &TempDir) -> (ProjectPaths, litrev::ReviewSettings) {
    let paths = ProjectPaths::new(dir.path());
    init_project(&paths, "Platform review", ReviewType::Literature).unwrap();

    let mut settings = paths.load_settings().unwrap();
    settings.sources.push(SearchSource {
        name: "TestDb".to_string(),
        filename: "export.csv".to_string(),
        search_type: SearchType::Db,
        comment: None,
    });
    settings.save(paths.settings_file()).unwrap();

    std::fs::write(paths.search_dir().join("export.csv"), SEARCH_CSV).unwrap();
    (paths, settings)
}

#[tokio::test]
async fn test_full_workflow_from_search_to_data() {
    let dir = TempDir::new().unwrap();
    let (paths, settings) = setup_project(&dir);

    let store = JsonRecordStore::new(paths.records_file());
    let engine = ReviewEngine::new(store, paths.clone(), false);

    // search: three rows become three imported records
    let report = engine
        .execute(&SearchOperation::new(paths.clone(), settings.clone()))
        .await
        .unwrap();
    assert_eq!(report.processed, 3);

    // cleanse: well-formed metadata moves on to processed
    engine
        .execute(&CleanseOperation::new(settings.cleanse.clone()))
        .await
        .unwrap();
    let records = engine.store().load().await.unwrap();
    assert!(records
        .iter()
        .all(|r| r.status == RecordState::Processed));

    // prescreen: the editorial is complementary material
    engine
        .execute(&PrescreenOperation::new(
            settings.prescreen.clone(),
            TableAction::Run,
        ))
        .await
        .unwrap();
    let records = engine.store().load().await.unwrap();
    let editorial = records.iter().find(|r| r.id == "Straub2021").unwrap();
    assert_eq!(editorial.status, RecordState::PrescreenExcluded);
    assert_eq!(
        records
            .iter()
            .filter(|r| r.status == RecordState::PrescreenIncluded)
            .count(),
        2
    );

    // screen: include everything that survived the prescreen
    engine
        .execute(&ScreenOperation::new(
            settings.screen.clone(),
            TableAction::IncludeAll,
        ))
        .await
        .unwrap();
    let records = engine.store().load().await.unwrap();
    assert_eq!(
        records
            .iter()
            .filter(|r| r.status == RecordState::Included)
            .count(),
        2
    );

    // data: outputs cover the included sample
    let report = engine
        .execute(&DataOperation::new(paths.clone(), settings.data.clone()))
        .await
        .unwrap();
    assert_eq!(report.processed, 2);
    assert!(paths.output_dir().join("sample_profile.csv").is_file());
    assert!(paths.output_dir().join("data_extraction.csv").is_file());

    // history recorded one entry per mutating operation
    let history = engine.load_history().unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].operation, "search");
    assert_eq!(history[4].operation, "data");
}

#[tokio::test]
async fn test_operation_order_is_enforced() {
    let dir = TempDir::new().unwrap();
    let (paths, settings) = setup_project(&dir);

    let store = JsonRecordStore::new(paths.records_file());
    let engine = ReviewEngine::new(store, paths.clone(), false);

    engine
        .execute(&SearchOperation::new(paths.clone(), settings.clone()))
        .await
        .unwrap();

    // Screening before cleansing violates the state model.
    let err = engine
        .execute(&ScreenOperation::new(
            settings.screen.clone(),
            TableAction::IncludeAll,
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        litrev::ReviewError::ProcessOrderViolation { .. }
    ));
}

#[tokio::test]
async fn test_rerunning_search_imports_nothing_new() {
    let dir = TempDir::new().unwrap();
    let (paths, settings) = setup_project(&dir);

    let store = JsonRecordStore::new(paths.records_file());
    let engine = ReviewEngine::new(store, paths.clone(), false);

    let op = SearchOperation::new(paths.clone(), settings.clone());
    engine.execute(&op).await.unwrap();
    let report = engine.execute(&op).await.unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(engine.store().load().await.unwrap().len(), 3);
}
