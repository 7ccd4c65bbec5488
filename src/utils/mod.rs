pub mod error;
pub mod logger;
pub mod monitor;
pub mod repo;
pub mod validation;
