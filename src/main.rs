use clap::Parser;
use std::path::PathBuf;

use litrev::config::project::{self, ProjectPaths};
use litrev::config::settings::ReviewType;
use litrev::core::backward::BackwardSearchOperation;
use litrev::core::cleanse::CleanseOperation;
use litrev::core::data::DataOperation;
use litrev::core::engine::ReviewEngine;
use litrev::core::prescreen::PrescreenOperation;
use litrev::core::screen::{ScreenOperation, TableAction};
use litrev::core::search::{self, SearchOperation};
use litrev::core::status::StatusOperation;
use litrev::core::store::JsonRecordStore;
use litrev::core::Operation;
use litrev::utils::logger;
use litrev::utils::validation::Validate;
use litrev::{Cli, Command, ReviewError};

fn table_action(
    include_all: bool,
    export_table: Option<PathBuf>,
    import_table: Option<PathBuf>,
) -> TableAction {
    if include_all {
        TableAction::IncludeAll
    } else if let Some(path) = export_table {
        TableAction::Export(path)
    } else if let Some(path) = import_table {
        TableAction::Import(path)
    } else {
        TableAction::Run
    }
}

async fn run(cli: Cli) -> litrev::Result<()> {
    let paths = ProjectPaths::new(&cli.project);

    if let Command::Init { title, review_type } = &cli.command {
        let review_type: ReviewType = review_type.parse()?;
        project::init_project(&paths, title, review_type)?;
        println!("✅ Initialized review project at {}", paths.root.display());
        return Ok(());
    }

    paths.require_project()?;
    let settings = paths.load_settings()?;
    settings.validate()?;

    let store = JsonRecordStore::new(paths.records_file());
    let engine = if cli.monitor {
        ReviewEngine::new_with_monitoring(store, paths.clone(), cli.force)
    } else {
        ReviewEngine::new(store, paths.clone(), cli.force)
    };

    match cli.command {
        Command::Init { .. } => unreachable!("handled above"),
        Command::Run => {
            let operations: Vec<Box<dyn Operation>> = vec![
                Box::new(SearchOperation::new(paths.clone(), settings.clone())),
                Box::new(CleanseOperation::new(settings.cleanse.clone())),
                Box::new(PrescreenOperation::new(
                    settings.prescreen.clone(),
                    TableAction::Run,
                )),
                Box::new(ScreenOperation::new(
                    settings.screen.clone(),
                    TableAction::Run,
                )),
                Box::new(DataOperation::new(paths.clone(), settings.data.clone())),
            ];
            let reports = engine.execute_all(operations).await?;
            println!("✅ Workflow complete ({} operations)", reports.len());
        }
        Command::Status { analytics } => {
            engine
                .execute(&StatusOperation::new(paths.clone(), analytics))
                .await?;
        }
        Command::Search { view } => {
            if view {
                search::view_sources(&settings);
            } else {
                let report = engine
                    .execute(&SearchOperation::new(paths.clone(), settings.clone()))
                    .await?;
                println!("✅ Imported {} new records", report.processed);
            }
        }
        Command::BackwardSearch => {
            let report = engine
                .execute(&BackwardSearchOperation::new(paths.clone()))
                .await?;
            println!("✅ Collected {} cited references", report.processed);
        }
        Command::CleanseRecords => {
            let report = engine
                .execute(&CleanseOperation::new(settings.cleanse.clone()))
                .await?;
            println!("✅ Cleansed {} records", report.processed);
            for detail in &report.details {
                println!("   {}", detail);
            }
        }
        Command::Screen1 {
            include_all,
            export_table,
            import_table,
        } => {
            let action = table_action(include_all, export_table, import_table);
            let report = engine
                .execute(&PrescreenOperation::new(settings.prescreen.clone(), action))
                .await?;
            println!("✅ Prescreen done ({} records)", report.processed);
            for detail in &report.details {
                println!("   {}", detail);
            }
        }
        Command::Screen {
            include_all,
            export_table,
            import_table,
        } => {
            let action = table_action(include_all, export_table, import_table);
            let report = engine
                .execute(&ScreenOperation::new(settings.screen.clone(), action))
                .await?;
            println!("✅ Screen done ({} records)", report.processed);
            for detail in &report.details {
                println!("   {}", detail);
            }
        }
        Command::Data => {
            let report = engine
                .execute(&DataOperation::new(paths.clone(), settings.data.clone()))
                .await?;
            println!("✅ Data outputs written for {} records", report.processed);
            if let Some(path) = &report.output_path {
                println!("📁 Extraction table: {}", path);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = run(cli).await {
        tracing::error!("Operation failed: {}", e);
        eprintln!("❌ {}", e);
        if matches!(e, ReviewError::ProcessOrderViolation { .. }) {
            eprintln!("💡 Use --force to override the operation order check");
        }
        if matches!(e, ReviewError::UnstagedChanges(_)) {
            eprintln!("💡 Commit or stash your changes, or rerun with --force");
        }
        std::process::exit(1);
    }
}
