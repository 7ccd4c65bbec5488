pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};

pub use config::project::ProjectPaths;
pub use config::settings::ReviewSettings;
pub use core::engine::ReviewEngine;
pub use core::store::JsonRecordStore;
pub use domain::model::{Record, RecordState};
pub use utils::error::{ReviewError, Result};
