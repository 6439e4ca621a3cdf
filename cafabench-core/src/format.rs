//! Advisory checks run before a split, build or verify.
//!
//! Only missing or empty required inputs are errors; everything else is
//! logged and left to the readers, which skip what they cannot use.

use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::ingest::open_required;
use crate::{AnnotationRecord, MetadataReader, Result};

const SUPPORTED_GAF_VERSIONS: &[&str] = &["1.0", "2.0"];

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GafCheck {
    /// Declares GAF 1.0 or 2.0.
    Supported(String),
    /// Declares some other GAF version.
    Unsupported(String),
    /// No version line, but the first row is a well-formed annotation.
    Headerless,
    /// Neither a version line nor a readable first row.
    Unrecognized,
}

pub fn check_annotation_file(path: &Path) -> Result<GafCheck> {
    let file = open_required(path)?;
    let mut reader = MetadataReader::new(BufReader::new(file));
    reader.read_metadata()?;

    if let Some(version) = reader.gaf_version() {
        let version = version.to_string();
        if SUPPORTED_GAF_VERSIONS.contains(&version.as_str()) {
            return Ok(GafCheck::Supported(version));
        }
        warn!(path = %path.display(), version = %version, "annotation file is not GAF 1.0 or 2.0");
        return Ok(GafCheck::Unsupported(version));
    }

    let mut first = String::new();
    BufReader::new(reader).read_line(&mut first)?;
    if AnnotationRecord::parse_line(&first).is_some() {
        return Ok(GafCheck::Headerless);
    }
    warn!(path = %path.display(), "annotation file has no gaf-version line and no readable first row");
    Ok(GafCheck::Unrecognized)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BenchmarkFileState {
    Missing,
    Empty,
    Present,
}

pub fn check_benchmark_file(path: &Path) -> BenchmarkFileState {
    match std::fs::metadata(path) {
        Err(_) => {
            warn!(path = %path.display(), "benchmark file does not exist");
            BenchmarkFileState::Missing
        }
        Ok(meta) if meta.len() == 0 => {
            warn!(path = %path.display(), "benchmark file is empty");
            BenchmarkFileState::Empty
        }
        Ok(_) => BenchmarkFileState::Present,
    }
}
