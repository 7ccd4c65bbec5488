pub mod backward;
pub mod cleanse;
pub mod data;
pub mod engine;
pub mod prescreen;
pub mod quality;
pub mod screen;
pub mod search;
pub mod status;
pub mod store;

pub use crate::domain::model::{OperationKind, OperationReport, Record, RecordState};
pub use crate::domain::ports::{Operation, RecordStore};
pub use crate::utils::error::Result;
