use std::convert::TryFrom;
use std::fs::File;
use std::io::{self, BufRead, Cursor, Read};
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Aspect, Error, Result};

/// Strips the leading `!` metadata block from a GOA file.
///
/// The metadata is captured line for line and is available once the first
/// data line has been reached. Reading from a `MetadataReader` yields only
/// the data section.
pub struct MetadataReader<B> {
    reader: B,
    metadata: String,
    metadata_finished: bool,
    buffer: Cursor<String>,
}

impl<B: BufRead> MetadataReader<B> {
    pub fn new(reader: B) -> MetadataReader<B> {
        MetadataReader {
            reader,
            metadata: String::new(),
            metadata_finished: false,
            buffer: Cursor::new(String::new()),
        }
    }

    pub fn metadata(&self) -> Option<&str> {
        if !self.metadata_finished { return None; }
        Some(&self.metadata)
    }

    /// The value of the `!gaf-version:` line, if the metadata declared one.
    pub fn gaf_version(&self) -> Option<&str> {
        self.metadata()?
            .lines()
            .filter_map(|line| line.trim().strip_prefix('!'))
            .filter_map(|line| line.trim_start().strip_prefix("gaf-version:"))
            .map(str::trim)
            .next()
    }

    /// Consumes the metadata block without touching the data section.
    ///
    /// The first data line is held back and returned by the next `read`.
    pub fn read_metadata(&mut self) -> io::Result<&str> {
        while !self.metadata_finished {
            let mut line = String::new();
            let len = self.reader.read_line(&mut line)?;
            if len == 0 {
                self.metadata_finished = true;
                break;
            }

            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('!') {
                self.metadata.push_str(&line);
            } else {
                self.buffer = Cursor::new(line);
                self.metadata_finished = true;
            }
        }
        Ok(&self.metadata)
    }
}

impl<B: BufRead> Read for MetadataReader<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.metadata_finished {
            self.read_metadata()?;
        }

        let len = self.buffer.read(buf)?;
        if len != 0 { return Ok(len); }
        self.reader.read(buf)
    }
}

/// The columns of a GAF row the benchmark engine works with.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub protein_id: String,
    pub go_id: String,
    pub evidence_code: String,
    pub aspect: Aspect,
}

impl AnnotationRecord {
    /// GAF 1.0 has 15 columns; anything shorter is not an annotation row.
    pub const MIN_FIELDS: usize = 15;

    const PROTEIN_ID: usize = 1;
    const GO_ID: usize = 4;
    const EVIDENCE_CODE: usize = 6;
    const ASPECT: usize = 8;

    pub fn new(protein_id: &str, go_id: &str, aspect: Aspect, evidence_code: &str) -> AnnotationRecord {
        AnnotationRecord {
            protein_id: protein_id.to_string(),
            go_id: go_id.to_string(),
            evidence_code: evidence_code.to_string(),
            aspect,
        }
    }

    /// Extracts a record from a split row.
    ///
    /// Returns `None` for rows with fewer than [`Self::MIN_FIELDS`] columns
    /// (trailing empty columns do not count) and for rows whose aspect column
    /// is not `F`, `P` or `C`.
    pub fn from_row(row: &StringRecord) -> Option<AnnotationRecord> {
        if effective_len(row) < Self::MIN_FIELDS {
            return None;
        }

        let aspect = Aspect::try_from(row.get(Self::ASPECT)?).ok()?;
        Some(AnnotationRecord {
            protein_id: row.get(Self::PROTEIN_ID)?.to_string(),
            go_id: row.get(Self::GO_ID)?.to_string(),
            evidence_code: row.get(Self::EVIDENCE_CODE)?.to_string(),
            aspect,
        })
    }

    pub fn parse_line(line: &str) -> Option<AnnotationRecord> {
        let line = line.trim();
        if line.starts_with('!') {
            return None;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        Self::from_row(&StringRecord::from(fields))
    }
}

pub(crate) fn effective_len(row: &StringRecord) -> usize {
    row.len() - row.iter().rev().take_while(|field| field.is_empty()).count()
}

/// Streams [`AnnotationRecord`]s out of tab-delimited GOA data.
///
/// Comment lines and malformed rows are skipped and counted.
pub struct AnnotationReader<R> {
    reader: csv::Reader<R>,
    row: StringRecord,
    skipped: u64,
}

impl<R: Read> AnnotationReader<R> {
    pub fn new(reader: R) -> AnnotationReader<R> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .quoting(false)
            .comment(Some(b'!'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        AnnotationReader { reader, row: StringRecord::new(), skipped: 0 }
    }

    /// Reads the next well-formed record.
    ///
    /// After a record is returned, [`Self::raw`] holds all of its columns.
    pub fn read_record(&mut self) -> Result<Option<AnnotationRecord>> {
        while self.reader.read_record(&mut self.row)? {
            match AnnotationRecord::from_row(&self.row) {
                Some(record) => return Ok(Some(record)),
                None => {
                    self.skipped += 1;
                    trace!(
                        line = self.row.position().map(|pos| pos.line()).unwrap_or(0),
                        columns = self.row.len(),
                        "skipping malformed annotation row"
                    );
                }
            }
        }
        Ok(None)
    }

    /// The columns of the row most recently read.
    pub fn raw(&self) -> &StringRecord {
        &self.row
    }

    /// Number of rows skipped as malformed so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: Read> Iterator for AnnotationReader<R> {
    type Item = Result<AnnotationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Opens a required annotation input.
pub fn open_input(path: &Path) -> Result<AnnotationReader<File>> {
    Ok(AnnotationReader::new(open_required(path)?))
}

/// Opens a file that must exist and must not be empty.
pub(crate) fn open_required(path: &Path) -> Result<File> {
    let missing = || Error::MissingRequiredInput { path: path.to_path_buf() };
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => missing(),
        _ => Error::Io(e),
    })?;
    if file.metadata()?.len() == 0 {
        return Err(missing());
    }
    Ok(file)
}
