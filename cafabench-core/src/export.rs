use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::ingest::effective_len;
use crate::{BenchmarkEntry, BenchmarkSink, Error, Result, Segment};

/// Writes GOA rows back out, preceded by a metadata block.
pub struct GafWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl<W: Write> GafWriter<W> {
    pub fn new(mut writer: W, metadata: &str) -> Result<GafWriter<W>> {
        write!(&mut writer, "{}", metadata)?;
        if !metadata.is_empty() && !metadata.ends_with('\n') {
            writeln!(&mut writer)?;
        }

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);
        Ok(GafWriter { writer, rows: 0 })
    }

    pub fn write_row(&mut self, row: &StringRecord) -> Result<()> {
        self.writer.write_record(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}

/// File locations of the six benchmark files sharing one prefix.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BenchmarkPaths {
    paths: Vec<PathBuf>,
}

impl BenchmarkPaths {
    /// `<prefix>.LK_bpo.txt`, `<prefix>.NK_mfo.txt` and so on.
    pub fn from_prefix<P: AsRef<Path>>(prefix: P) -> BenchmarkPaths {
        let prefix = prefix.as_ref();
        let paths = Segment::ALL.iter()
            .map(|segment| {
                let mut name = prefix.as_os_str().to_owned();
                name.push(format!(".{}.txt", segment.file_suffix()));
                PathBuf::from(name)
            })
            .collect();
        BenchmarkPaths { paths }
    }

    pub fn get(&self, segment: Segment) -> &Path {
        &self.paths[segment.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item=(Segment, &Path)> {
        Segment::ALL.iter().map(move |segment| (*segment, self.get(*segment)))
    }
}

/// Streams benchmark entries into six tab-delimited outputs.
pub struct BenchmarkWriter<W: Write> {
    writers: Vec<csv::Writer<W>>,
}

impl BenchmarkWriter<File> {
    pub fn create(paths: &BenchmarkPaths) -> Result<BenchmarkWriter<File>> {
        BenchmarkWriter::new(|segment| Ok(File::create(paths.get(segment))?))
    }
}

impl<W: Write> BenchmarkWriter<W> {
    /// Opens one output per segment, in [`Segment::ALL`] order.
    pub fn new<F>(mut open: F) -> Result<BenchmarkWriter<W>>
        where F: FnMut(Segment) -> Result<W>,
    {
        let mut writers = Vec::with_capacity(Segment::ALL.len());
        for segment in Segment::ALL.iter() {
            let writer = csv::WriterBuilder::new()
                .has_headers(false)
                .delimiter(b'\t')
                .quote_style(csv::QuoteStyle::Never)
                .from_writer(open(*segment)?);
            writers.push(writer);
        }
        Ok(BenchmarkWriter { writers })
    }

    pub fn flush(&mut self) -> Result<()> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flushes and hands back the underlying outputs in [`Segment::ALL`] order.
    pub fn into_inner(self) -> Result<Vec<W>> {
        self.writers.into_iter()
            .map(|writer| writer.into_inner().map_err(|e| {
                Error::Io(io::Error::new(e.error().kind(), e.error().to_string()))
            }))
            .collect()
    }
}

impl<W: Write> BenchmarkSink for BenchmarkWriter<W> {
    fn emit(&mut self, segment: Segment, entry: BenchmarkEntry) -> Result<()> {
        self.writers[segment.slot()].serialize(&entry)?;
        Ok(())
    }
}

/// Reads `protein_id<TAB>go_id` lines.
pub struct BenchmarkReader<R> {
    reader: csv::Reader<R>,
    row: StringRecord,
}

impl<R: Read> BenchmarkReader<R> {
    pub fn new(reader: R) -> BenchmarkReader<R> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(reader);
        BenchmarkReader { reader, row: StringRecord::new() }
    }
}

impl<R: Read> Iterator for BenchmarkReader<R> {
    type Item = Result<BenchmarkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.row) {
            Err(e) => Some(Err(e.into())),
            Ok(false) => None,
            Ok(true) => {
                let columns = effective_len(&self.row);
                if columns != 2 {
                    let line = self.row.position().map(|pos| pos.line()).unwrap_or(0);
                    return Some(Err(Error::InvalidBenchmarkLine { line, columns }));
                }
                Some(Ok(BenchmarkEntry::new(&self.row[0], &self.row[1])))
            }
        }
    }
}

pub fn read_benchmark<R: Read>(reader: R) -> BenchmarkReader<R> {
    BenchmarkReader::new(reader)
}
