use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid setting {field}: {message}")]
    InvalidSettings { field: String, message: String },

    #[error("Missing setting: {field}")]
    MissingSetting { field: String },

    #[error("Directory is not empty: {0}")]
    NonEmptyDirectory(String),

    #[error("Repository setup error: {0}")]
    RepoSetup(String),

    #[error("Operation order violation: {operation} cannot run while records are in an earlier state ({blocking})")]
    ProcessOrderViolation { operation: String, blocking: String },

    #[error("Unstaged changes in the git worktree: {0}")]
    UnstagedChanges(String),

    #[error("Invalid parameter: {0}")]
    Parameter(String),
}

pub type Result<T> = std::result::Result<T, ReviewError>;
