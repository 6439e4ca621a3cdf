use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{BufRead, Write};

use csv::StringRecord;
use tracing::{debug, info};

use crate::{
    AnnotationReader, AnnotationRecord, Aspect, EvidenceClass, EvidenceCodes, GafWriter, MetadataReader, Result,
};

const DB_REFERENCE: usize = 5;
const TAXON: usize = 12;
const ASSIGNED_BY: usize = 14;

/// Restrictions on which t2 experimental rows may count as gained knowledge.
///
/// Empty sets accept everything. Taxa are NCBI taxonomy ids, sources are
/// matched against the Assigned_By column case-insensitively, and PubMed
/// ids are compared without their `PMID:` prefix.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SplitFilter {
    pub taxa: BTreeSet<String>,
    pub aspects: BTreeSet<Aspect>,
    pub sources: BTreeSet<String>,
    /// Reject rows that cite no PubMed id.
    pub require_pubmed: bool,
    /// Minimum number of distinct PubMed ids behind a `(protein, GO term)`
    /// pair across all accepted t2 rows.
    pub min_references: Option<usize>,
    /// Rows citing any of these PubMed ids are rejected.
    pub blacklist: BTreeSet<String>,
}

impl SplitFilter {
    pub fn taxa<I, S>(mut self, taxa: I) -> SplitFilter
        where I: IntoIterator<Item=S>,
              S: AsRef<str>,
    {
        self.taxa = taxa.into_iter()
            .map(|taxon| taxon_id(taxon.as_ref()).to_string())
            .filter(|taxon| !taxon.is_empty())
            .collect();
        self
    }

    pub fn aspects<I: IntoIterator<Item=Aspect>>(mut self, aspects: I) -> SplitFilter {
        self.aspects = aspects.into_iter().collect();
        self
    }

    pub fn sources<I, S>(mut self, sources: I) -> SplitFilter
        where I: IntoIterator<Item=S>,
              S: AsRef<str>,
    {
        self.sources = sources.into_iter()
            .map(|source| source.as_ref().trim().to_ascii_uppercase())
            .filter(|source| !source.is_empty())
            .collect();
        self
    }

    pub fn require_pubmed(mut self, require: bool) -> SplitFilter {
        self.require_pubmed = require;
        self
    }

    pub fn min_references(mut self, threshold: Option<usize>) -> SplitFilter {
        self.min_references = threshold;
        self
    }

    pub fn blacklist<I, S>(mut self, pmids: I) -> SplitFilter
        where I: IntoIterator<Item=S>,
              S: AsRef<str>,
    {
        self.blacklist = pmids.into_iter()
            .map(|pmid| pubmed_id(pmid.as_ref()).to_string())
            .filter(|pmid| !pmid.is_empty())
            .collect();
        self
    }

    /// Checks every per-row restriction; the reference threshold needs all
    /// rows of a pair and is applied by [`SplitFilter::is_confident`].
    pub fn accepts(&self, row: &StringRecord, record: &AnnotationRecord) -> bool {
        if !self.aspects.is_empty() && !self.aspects.contains(&record.aspect) {
            return false;
        }
        if !self.taxa.is_empty() {
            let taxa = row.get(TAXON).unwrap_or("");
            let matched = taxa.split('|')
                .any(|taxon| self.taxa.contains(taxon_id(taxon)));
            if !matched {
                return false;
            }
        }
        if !self.sources.is_empty() {
            let source = row.get(ASSIGNED_BY).unwrap_or("").to_ascii_uppercase();
            if !self.sources.contains(&source) {
                return false;
            }
        }
        if self.require_pubmed && pubmed_ids(row).next().is_none() {
            return false;
        }
        if pubmed_ids(row).any(|pmid| self.blacklist.contains(pmid)) {
            return false;
        }
        true
    }

    pub fn is_confident(&self, references: usize) -> bool {
        self.min_references.map(|min| references >= min).unwrap_or(true)
    }
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    match value.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&value[prefix.len()..]),
        _ => None,
    }
}

fn taxon_id(value: &str) -> &str {
    let value = value.trim();
    strip_prefix_ci(value, "taxon:").unwrap_or(value)
}

fn pubmed_id(value: &str) -> &str {
    let value = value.trim();
    strip_prefix_ci(value, "PMID:").unwrap_or(value)
}

/// PubMed ids cited in the DB:Reference column.
fn pubmed_ids(row: &StringRecord) -> impl Iterator<Item=&str> {
    row.get(DB_REFERENCE)
        .unwrap_or("")
        .split('|')
        .filter_map(|reference| strip_prefix_ci(reference.trim(), "PMID:"))
        .filter(|id| !id.is_empty())
}

fn keep_gained<W: Write>(
    t2_exp: &mut GafWriter<W>,
    gained: &mut HashMap<String, HashSet<Aspect>>,
    row: &StringRecord,
    record: AnnotationRecord,
) -> Result<()> {
    t2_exp.write_row(row)?;
    gained.entry(record.protein_id)
        .or_insert_with(HashSet::new)
        .insert(record.aspect);
    Ok(())
}

/// Row counts written by [`split_t1`].
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SplitStats {
    pub t1_iea: u64,
    pub t1_exp: u64,
    pub t2_exp: u64,
    /// Experimental t2 rows rejected by the [`SplitFilter`].
    pub t2_filtered: u64,
    /// Well-formed t1 rows for proteins that can never become benchmarks.
    pub t1_dropped: u64,
    /// Malformed rows in either input.
    pub skipped: u64,
}

/// Separates experimental from non-experimental records.
pub fn split_by_evidence<I>(records: I, codes: &EvidenceCodes) -> (Vec<AnnotationRecord>, Vec<AnnotationRecord>)
    where I: IntoIterator<Item=AnnotationRecord>,
{
    records.into_iter()
        .partition(|record| codes.classify(record) == EvidenceClass::Experimental)
}

fn header(version: Option<&str>) -> String {
    let mut header = String::new();
    if let Some(version) = version {
        header.push_str(&format!("!gaf-version: {}\n", version));
    }
    header.push_str("!Generated by cafabench split\n");
    header
}

/// Writes the three benchmark inputs from two raw GOA snapshots.
///
/// Experimental t2 rows accepted by `filter` go to `t2_exp`. A t1 row is
/// kept only if its protein gained experimental annotation at t2:
/// experimental t1 rows go to `t1_exp`, and the remaining t1 rows go to
/// `t1_iea` when the protein gained annotation in that row's aspect. Rows
/// are copied verbatim.
pub fn split_t1<R, S, W>(
    t1: R,
    t2: S,
    codes: &EvidenceCodes,
    filter: &SplitFilter,
    t1_iea: W,
    t1_exp: W,
    t2_exp: W,
) -> Result<SplitStats>
    where R: BufRead,
          S: BufRead,
          W: Write,
{
    let mut stats = SplitStats::default();

    let mut t2 = MetadataReader::new(t2);
    t2.read_metadata()?;
    let mut t2_exp = GafWriter::new(t2_exp, &header(t2.gaf_version()))?;

    let mut gained: HashMap<String, HashSet<Aspect>> = HashMap::new();
    // Rows held back until every reference of their pair has been seen.
    let mut pending: Vec<(StringRecord, AnnotationRecord)> = Vec::new();
    let mut references: HashMap<(String, String), HashSet<String>> = HashMap::new();

    let mut t2_reader = AnnotationReader::new(t2);
    while let Some(record) = t2_reader.read_record()? {
        if codes.classify(&record) != EvidenceClass::Experimental {
            continue;
        }
        let row = t2_reader.raw();
        if !filter.accepts(row, &record) {
            stats.t2_filtered += 1;
            continue;
        }
        if filter.min_references.is_some() {
            references.entry((record.protein_id.clone(), record.go_id.clone()))
                .or_default()
                .extend(pubmed_ids(row).map(str::to_string));
            pending.push((row.clone(), record));
        } else {
            keep_gained(&mut t2_exp, &mut gained, row, record)?;
        }
    }
    for (row, record) in pending {
        let count = references.get(&(record.protein_id.clone(), record.go_id.clone()))
            .map(HashSet::len)
            .unwrap_or(0);
        if filter.is_confident(count) {
            keep_gained(&mut t2_exp, &mut gained, &row, record)?;
        } else {
            debug!(protein = %record.protein_id, go_id = %record.go_id, references = count, "too few references");
            stats.t2_filtered += 1;
        }
    }
    stats.t2_exp = t2_exp.finish()?;
    stats.skipped += t2_reader.skipped();

    let mut t1 = MetadataReader::new(t1);
    t1.read_metadata()?;
    let t1_header = header(t1.gaf_version());
    let mut t1_iea = GafWriter::new(t1_iea, &t1_header)?;
    let mut t1_exp = GafWriter::new(t1_exp, &t1_header)?;

    let mut t1_reader = AnnotationReader::new(t1);
    while let Some(record) = t1_reader.read_record()? {
        let aspects = match gained.get(&record.protein_id) {
            Some(aspects) => aspects,
            None => {
                stats.t1_dropped += 1;
                continue;
            }
        };
        match codes.classify(&record) {
            EvidenceClass::Experimental => t1_exp.write_row(t1_reader.raw())?,
            EvidenceClass::NonExperimental if aspects.contains(&record.aspect) => {
                t1_iea.write_row(t1_reader.raw())?
            }
            EvidenceClass::NonExperimental => stats.t1_dropped += 1,
        }
    }
    stats.t1_iea = t1_iea.finish()?;
    stats.t1_exp = t1_exp.finish()?;
    stats.skipped += t1_reader.skipped();

    info!(
        t1_iea = stats.t1_iea,
        t1_exp = stats.t1_exp,
        t2_exp = stats.t2_exp,
        filtered = stats.t2_filtered,
        dropped = stats.t1_dropped,
        skipped = stats.skipped,
        "split annotation snapshots"
    );
    Ok(stats)
}
