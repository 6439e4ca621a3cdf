use std::borrow::Borrow;
use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    build_index, AnnotationRecord, Aspect, AspectIndex, BenchmarkEntry, EvidenceCodes, KnowledgeType, ProteinIndex,
    Result, Segment,
};

/// A benchmark entry that breaks the rule of its benchmark.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum Violation {
    #[error("an undesired protein {protein_id} got selected in the benchmark file")]
    UnexpectedProtein { protein_id: String },

    #[error("selected protein {protein_id} already had experimental evidence at time t1")]
    PriorKnowledgeViolation { protein_id: String },

    #[error("selected protein {protein_id} has not gained experimental evidence for {go_id} at time t2")]
    NoKnowledgeGainViolation { protein_id: String, go_id: String },
}

impl Violation {
    pub fn protein_id(&self) -> &str {
        match self {
            Violation::UnexpectedProtein { protein_id }
            | Violation::PriorKnowledgeViolation { protein_id }
            | Violation::NoKnowledgeGainViolation { protein_id, .. } => protein_id,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VerifyOptions {
    /// Stop checking a benchmark file at its first violation.
    pub stop_at_first_violation: bool,
    /// Restrict the t1 and t2 experimental rows to these evidence codes, as
    /// [`crate::BuildOptions::evidence_filter`] does for the build.
    pub evidence_filter: Option<EvidenceCodes>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        VerifyOptions { stop_at_first_violation: true, evidence_filter: None }
    }
}

/// Re-checks benchmark entries against freshly built annotation indices.
pub struct Verifier {
    t1_iea: ProteinIndex,
    t1_exp: AspectIndex,
    t2_exp: AspectIndex,
    options: VerifyOptions,
}

impl Verifier {
    pub fn new(t1_iea: ProteinIndex, t1_exp: AspectIndex, t2_exp: AspectIndex, options: VerifyOptions) -> Verifier {
        Verifier { t1_iea, t1_exp, t2_exp, options }
    }

    pub fn from_records<I, J, K>(t1_iea: I, t1_exp: J, t2_exp: K, options: VerifyOptions) -> Verifier
        where I: IntoIterator,
              I::Item: Borrow<AnnotationRecord>,
              J: IntoIterator,
              J::Item: Borrow<AnnotationRecord>,
              K: IntoIterator,
              K::Item: Borrow<AnnotationRecord>,
    {
        let filter = options.evidence_filter.as_ref();
        let t1_iea = build_index(t1_iea, None, None);
        let t1_exp = AspectIndex::build(t1_exp, filter);
        let t2_exp = AspectIndex::build(t2_exp, filter);
        info!(
            t1_iea_proteins = t1_iea.len(),
            t1_exp_pairs = t1_exp.pair_count(),
            t2_exp_pairs = t2_exp.pair_count(),
            "indexed annotations for verification"
        );
        Verifier::new(t1_iea, t1_exp, t2_exp, options)
    }

    /// Checks one entry against the rule of `segment`.
    pub fn check(&self, segment: Segment, entry: &BenchmarkEntry) -> std::result::Result<(), Violation> {
        match segment.knowledge {
            KnowledgeType::LimitedKnowledge => self.check_lk(segment.aspect, entry),
            KnowledgeType::NoKnowledge => self.check_nk(segment.aspect, entry),
        }
    }

    fn check_lk(&self, aspect: Aspect, entry: &BenchmarkEntry) -> std::result::Result<(), Violation> {
        let protein_id = &entry.protein_id;
        if !self.t1_iea.contains_key(protein_id) {
            return Err(Violation::UnexpectedProtein { protein_id: protein_id.clone() });
        }
        if self.t1_exp.contains(aspect, protein_id) {
            return Err(Violation::PriorKnowledgeViolation { protein_id: protein_id.clone() });
        }
        if !self.t2_exp.contains_term(aspect, protein_id, &entry.go_id) {
            return Err(Violation::NoKnowledgeGainViolation {
                protein_id: protein_id.clone(),
                go_id: entry.go_id.clone(),
            });
        }
        Ok(())
    }

    // Unlike LK, only the protein has to be present in the t2 aspect index;
    // the GO term of the entry is not looked up.
    fn check_nk(&self, aspect: Aspect, entry: &BenchmarkEntry) -> std::result::Result<(), Violation> {
        let protein_id = &entry.protein_id;
        if !self.t1_iea.contains_key(protein_id) {
            return Err(Violation::UnexpectedProtein { protein_id: protein_id.clone() });
        }
        if self.t1_exp.contains_any(protein_id) {
            return Err(Violation::PriorKnowledgeViolation { protein_id: protein_id.clone() });
        }
        if !self.t2_exp.contains(aspect, protein_id) {
            return Err(Violation::NoKnowledgeGainViolation {
                protein_id: protein_id.clone(),
                go_id: entry.go_id.clone(),
            });
        }
        Ok(())
    }

    /// Verifies one benchmark stream.
    ///
    /// Read errors abort; rule violations are collected in the report.
    pub fn verify<I>(&self, segment: Segment, entries: I) -> Result<SegmentReport>
        where I: IntoIterator<Item=Result<BenchmarkEntry>>,
    {
        let mut report = SegmentReport::new(segment);
        for entry in entries {
            let entry = entry?;
            report.checked += 1;
            if let Err(violation) = self.check(segment, &entry) {
                warn!(segment = %segment, entry = report.checked, "{}", violation);
                report.violations.push(violation);
                if self.options.stop_at_first_violation {
                    break;
                }
            }
        }
        Ok(report)
    }

    fn verify_entries<I>(&self, segment: Segment, entries: I) -> Vec<Violation>
        where I: IntoIterator,
              I::Item: Borrow<BenchmarkEntry>,
    {
        let mut violations = Vec::new();
        for entry in entries {
            if let Err(violation) = self.check(segment, entry.borrow()) {
                violations.push(violation);
                if self.options.stop_at_first_violation {
                    break;
                }
            }
        }
        violations
    }
}

/// Verifies an LK benchmark for `aspect` from scratch.
pub fn verify_lk<I, J, K, E>(t1_iea: I, t1_exp: J, t2_exp: K, entries: E, aspect: Aspect, options: VerifyOptions) -> Vec<Violation>
    where I: IntoIterator,
          I::Item: Borrow<AnnotationRecord>,
          J: IntoIterator,
          J::Item: Borrow<AnnotationRecord>,
          K: IntoIterator,
          K::Item: Borrow<AnnotationRecord>,
          E: IntoIterator,
          E::Item: Borrow<BenchmarkEntry>,
{
    Verifier::from_records(t1_iea, t1_exp, t2_exp, options)
        .verify_entries(Segment::new(KnowledgeType::LimitedKnowledge, aspect), entries)
}

/// Verifies an NK benchmark for `aspect` from scratch.
pub fn verify_nk<I, J, K, E>(t1_iea: I, t1_exp: J, t2_exp: K, entries: E, aspect: Aspect, options: VerifyOptions) -> Vec<Violation>
    where I: IntoIterator,
          I::Item: Borrow<AnnotationRecord>,
          J: IntoIterator,
          J::Item: Borrow<AnnotationRecord>,
          K: IntoIterator,
          K::Item: Borrow<AnnotationRecord>,
          E: IntoIterator,
          E::Item: Borrow<BenchmarkEntry>,
{
    Verifier::from_records(t1_iea, t1_exp, t2_exp, options)
        .verify_entries(Segment::new(KnowledgeType::NoKnowledge, aspect), entries)
}

/// Outcome of verifying one benchmark file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SegmentReport {
    pub segment: Segment,
    pub source: Option<String>,
    pub checked: u64,
    pub violations: Vec<Violation>,
}

impl SegmentReport {
    pub fn new(segment: Segment) -> SegmentReport {
        SegmentReport { segment, source: None, checked: 0, violations: Vec::new() }
    }

    pub fn with_source<S: Into<String>>(mut self, source: S) -> SegmentReport {
        self.source = Some(source.into());
        self
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for SegmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment)?;
        if let Some(source) = &self.source {
            write!(f, " ({})", source)?;
        }
        if self.passed() {
            return write!(f, ": no violations found in {} entries", self.checked);
        }
        write!(f, ": verification failed")?;
        for violation in &self.violations {
            write!(f, "\n\t{}", violation)?;
        }
        Ok(())
    }
}

/// Results for all benchmark files of one verify run.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VerificationReport {
    pub reports: Vec<SegmentReport>,
    pub skipped: Vec<Segment>,
}

impl VerificationReport {
    pub fn push(&mut self, report: SegmentReport) {
        self.reports.push(report);
    }

    /// Records a benchmark file that could not be verified.
    pub fn skip(&mut self, segment: Segment) {
        self.skipped.push(segment);
    }

    /// Number of benchmark files verified without violations.
    pub fn success_count(&self) -> usize {
        self.reports.iter().filter(|report| report.passed()).count()
    }

    pub fn total_checked(&self) -> u64 {
        self.reports.iter().map(|report| report.checked).sum()
    }

    /// At least one benchmark file was verified and none had violations.
    pub fn passed(&self) -> bool {
        !self.reports.is_empty() && self.reports.iter().all(SegmentReport::passed)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            writeln!(f, "{}", report)?;
        }
        for segment in &self.skipped {
            writeln!(f, "{}: skipped, benchmark file not found", segment)?;
        }
        write!(
            f,
            "{} of {} benchmark files passed verification",
            self.success_count(),
            self.reports.len() + self.skipped.len()
        )
    }
}
