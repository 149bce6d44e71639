pub mod cli;
pub mod core;
pub mod report;
pub mod storage;

pub use crate::core::{deduplicator::Deduplicator, planner::DedupPlan};
pub use crate::report::DedupReport;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Schema error: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, DedupError>;
