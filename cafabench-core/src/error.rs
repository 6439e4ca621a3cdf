use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a split, build, or verify run.
///
/// Short or comment rows in annotation files are not errors; readers skip
/// them. Benchmark rule violations are reported as [`crate::Violation`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("required input {} is missing or empty", path.display())]
    MissingRequiredInput { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read or write tab-delimited data: {0}")]
    Csv(#[from] csv::Error),

    #[error("benchmark line {line} has {columns} columns, expected 2")]
    InvalidBenchmarkLine { line: u64, columns: usize },

    #[error("invalid evidence code list {0:?}")]
    InvalidEvidenceCodes(String),
}

pub type Result<T> = std::result::Result<T, Error>;
