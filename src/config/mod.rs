pub mod project;
pub mod settings;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "litrev")]
#[command(about = "A workflow manager for collaborative literature reviews")]
pub struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip operation precondition checks
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Log system resource usage after each operation
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialize a new review project
    Init {
        #[arg(long, default_value = "Untitled review")]
        title: String,

        #[arg(long, default_value = "literature")]
        review_type: String,
    },

    /// Run all pending operations in workflow order
    Run,

    /// Show the current state of the review
    Status {
        /// Also show the operation history
        #[arg(short, long)]
        analytics: bool,
    },

    /// Import new result files from data/search/
    Search {
        /// List registered sources instead of importing
        #[arg(long)]
        view: bool,
    },

    /// Collect references of included records into a new source
    #[command(name = "backward_search")]
    BackwardSearch,

    /// Normalize imported records and assess their quality
    #[command(name = "cleanse_records")]
    CleanseRecords,

    /// Prescreen records based on metadata scope rules
    #[command(name = "screen_1")]
    Screen1 {
        /// Include every record without applying scope rules
        #[arg(long)]
        include_all: bool,

        /// Write pending decisions to a CSV table
        #[arg(long, value_name = "FILE")]
        export_table: Option<PathBuf>,

        /// Apply decisions from a CSV table
        #[arg(long, value_name = "FILE")]
        import_table: Option<PathBuf>,
    },

    /// Screen prescreen-included records against the criteria
    Screen {
        /// Include every record, marking all criteria as met
        #[arg(long)]
        include_all: bool,

        /// Write pending decisions to a CSV table
        #[arg(long, value_name = "FILE")]
        export_table: Option<PathBuf>,

        /// Apply decisions from a CSV table
        #[arg(long, value_name = "FILE")]
        import_table: Option<PathBuf>,
    },

    /// Build the sample profile and data extraction outputs
    Data,
}
