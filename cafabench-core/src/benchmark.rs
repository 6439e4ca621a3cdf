use std::borrow::Borrow;
use std::collections::HashSet;

use itertools::Itertools;
use tracing::{debug, info};

use crate::{AnnotationRecord, Aspect, AspectIndex, BenchmarkEntry, EvidenceCodes, KnowledgeType, Result, Segment};

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Write each `(protein, GO term)` pair at most once per benchmark.
    ///
    /// Off by default: every t1 row of a protein re-emits its gained terms,
    /// so proteins with several t1 rows in one aspect repeat their lines.
    pub dedupe_benchmark_entries: bool,
    /// Restrict the t1 and t2 experimental rows to these evidence codes.
    ///
    /// `None` trusts that the experimental inputs were already filtered.
    pub evidence_filter: Option<EvidenceCodes>,
}

/// Receives benchmark entries in the order they are derived.
pub trait BenchmarkSink {
    fn emit(&mut self, segment: Segment, entry: BenchmarkEntry) -> Result<()>;
}

/// Counters for one benchmark build.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BuildStats {
    pub t1_iea_rows: u64,
    pub emitted: [u64; 6],
    pub suppressed_duplicates: u64,
}

impl BuildStats {
    pub fn emitted_for(&self, segment: Segment) -> u64 {
        self.emitted[segment.slot()]
    }

    pub fn total_emitted(&self) -> u64 {
        self.emitted.iter().sum()
    }
}

/// Derives LK and NK benchmark entries from the t1 non-experimental rows.
///
/// The t1 and t2 experimental indices are built up front. Each t1-IEA row
/// then decides, for its own aspect, whether the protein enters the LK and
/// NK benchmarks and emits every GO term it gained at t2.
pub struct BenchmarkBuilder {
    t1_exp: AspectIndex,
    t2_exp: AspectIndex,
    dedupe: Option<[HashSet<BenchmarkEntry>; 6]>,
    stats: BuildStats,
}

impl BenchmarkBuilder {
    pub fn new(t1_exp: AspectIndex, t2_exp: AspectIndex, options: &BuildOptions) -> BenchmarkBuilder {
        BenchmarkBuilder {
            t1_exp,
            t2_exp,
            dedupe: if options.dedupe_benchmark_entries { Some(Default::default()) } else { None },
            stats: BuildStats::default(),
        }
    }

    pub fn from_records<I, J>(t1_exp: I, t2_exp: J, options: &BuildOptions) -> BenchmarkBuilder
        where I: IntoIterator,
              I::Item: Borrow<AnnotationRecord>,
              J: IntoIterator,
              J::Item: Borrow<AnnotationRecord>,
    {
        let filter = options.evidence_filter.as_ref();
        let t1_exp = AspectIndex::build(t1_exp, filter);
        let t2_exp = AspectIndex::build(t2_exp, filter);
        info!(
            t1_exp_pairs = t1_exp.pair_count(),
            t2_exp_pairs = t2_exp.pair_count(),
            "indexed experimental annotations"
        );
        BenchmarkBuilder::new(t1_exp, t2_exp, options)
    }

    /// Handles one t1-IEA row, returning how many entries reached the sink.
    pub fn process<S: BenchmarkSink>(&mut self, row: &AnnotationRecord, sink: &mut S) -> Result<u64> {
        let entries = self.derive(row);
        let written = entries.len() as u64;
        for (segment, entry) in entries {
            sink.emit(segment, entry)?;
        }
        Ok(written)
    }

    /// The entries one t1-IEA row contributes, after duplicate suppression.
    fn derive(&mut self, row: &AnnotationRecord) -> Vec<(Segment, BenchmarkEntry)> {
        self.stats.t1_iea_rows += 1;
        let aspect = row.aspect;
        let protein = row.protein_id.as_str();

        let gained = match self.t2_exp.terms(aspect, protein) {
            Some(terms) => terms,
            None => return Vec::new(),
        };

        let mut qualified = Vec::with_capacity(2);
        if !self.t1_exp.contains(aspect, protein) {
            qualified.push(Segment::new(KnowledgeType::LimitedKnowledge, aspect));
        }
        if !self.t1_exp.contains_any(protein) {
            qualified.push(Segment::new(KnowledgeType::NoKnowledge, aspect));
        }

        let mut entries = Vec::new();
        for segment in qualified {
            for go_id in gained.iter().sorted() {
                let entry = BenchmarkEntry::new(protein, go_id);
                if let Some(seen) = self.dedupe.as_mut() {
                    if !seen[segment.slot()].insert(entry.clone()) {
                        self.stats.suppressed_duplicates += 1;
                        continue;
                    }
                }
                self.stats.emitted[segment.slot()] += 1;
                entries.push((segment, entry));
            }
        }
        entries
    }

    /// Drives the build from a fallible t1-IEA row stream.
    pub fn run<I, S>(mut self, t1_iea: I, sink: &mut S) -> Result<BuildStats>
        where I: IntoIterator<Item=Result<AnnotationRecord>>,
              S: BenchmarkSink,
    {
        for row in t1_iea {
            self.process(&row?, sink)?;
        }
        self.finish()
    }

    fn finish(self) -> Result<BuildStats> {
        let BenchmarkBuilder { stats, .. } = self;
        for segment in Segment::ALL.iter() {
            debug!(segment = %segment, entries = stats.emitted_for(*segment), "benchmark built");
        }
        info!(
            rows = stats.t1_iea_rows,
            entries = stats.total_emitted(),
            suppressed = stats.suppressed_duplicates,
            "benchmark build finished"
        );
        Ok(stats)
    }
}

/// In-memory benchmark entries for all six segments.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Benchmarks {
    entries: [Vec<BenchmarkEntry>; 6],
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub entries: usize,
    pub proteins: usize,
}

impl Benchmarks {
    pub fn get(&self, segment: Segment) -> &[BenchmarkEntry] {
        &self.entries[segment.slot()]
    }

    pub fn lk(&self, aspect: Aspect) -> &[BenchmarkEntry] {
        self.get(Segment::new(KnowledgeType::LimitedKnowledge, aspect))
    }

    pub fn nk(&self, aspect: Aspect) -> &[BenchmarkEntry] {
        self.get(Segment::new(KnowledgeType::NoKnowledge, aspect))
    }

    pub fn iter(&self) -> impl Iterator<Item=(Segment, &[BenchmarkEntry])> {
        Segment::ALL.iter().map(move |segment| (*segment, self.get(*segment)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Vec::is_empty)
    }

    pub fn summary(&self) -> Vec<SegmentSummary> {
        self.iter()
            .map(|(segment, entries)| SegmentSummary {
                segment,
                entries: entries.len(),
                proteins: entries.iter().map(|entry| &entry.protein_id).unique().count(),
            })
            .collect()
    }
}

impl Benchmarks {
    fn push(&mut self, segment: Segment, entry: BenchmarkEntry) {
        self.entries[segment.slot()].push(entry);
    }
}

impl BenchmarkSink for Benchmarks {
    fn emit(&mut self, segment: Segment, entry: BenchmarkEntry) -> Result<()> {
        self.push(segment, entry);
        Ok(())
    }
}

/// Builds all six benchmarks in memory.
pub fn build_benchmarks<I, J, K>(t1_iea: I, t1_exp: J, t2_exp: K, options: &BuildOptions) -> Benchmarks
    where I: IntoIterator,
          I::Item: Borrow<AnnotationRecord>,
          J: IntoIterator,
          J::Item: Borrow<AnnotationRecord>,
          K: IntoIterator,
          K::Item: Borrow<AnnotationRecord>,
{
    let mut builder = BenchmarkBuilder::from_records(t1_exp, t2_exp, options);
    let mut benchmarks = Benchmarks::default();
    for row in t1_iea {
        for (segment, entry) in builder.derive(row.borrow()) {
            benchmarks.push(segment, entry);
        }
    }
    benchmarks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use crate::Aspect::*;

    fn rec(protein: &str, go: &str, aspect: Aspect, evidence: &str) -> AnnotationRecord {
        AnnotationRecord::new(protein, go, aspect, evidence)
    }

    fn entries(pairs: &[(&str, &str)]) -> Vec<BenchmarkEntry> {
        pairs.iter().map(|(p, g)| BenchmarkEntry::new(p, g)).collect()
    }

    fn build(t1_iea: &[AnnotationRecord], t1_exp: &[AnnotationRecord], t2_exp: &[AnnotationRecord]) -> Benchmarks {
        build_benchmarks(t1_iea, t1_exp, t2_exp, &BuildOptions::default())
    }

    #[test]
    fn test_gain_without_prior_knowledge() {
        let benchmarks = build(
            &[rec("P1", "GO:1", BiologicalProcess, "IEA")],
            &[],
            &[rec("P1", "GO:1", BiologicalProcess, "EXP")],
        );
        assert_eq!(benchmarks.lk(BiologicalProcess), &entries(&[("P1", "GO:1")])[..]);
        assert_eq!(benchmarks.nk(BiologicalProcess), &entries(&[("P1", "GO:1")])[..]);
        for aspect in &[CellularComponent, MolecularFunction] {
            assert!(benchmarks.lk(*aspect).is_empty());
            assert!(benchmarks.nk(*aspect).is_empty());
        }
    }

    #[test]
    fn test_prior_knowledge_blocks_both() {
        let benchmarks = build(
            &[rec("P2", "GO:2", MolecularFunction, "IEA")],
            &[rec("P2", "GO:2", MolecularFunction, "EXP")],
            &[rec("P2", "GO:2", MolecularFunction, "EXP")],
        );
        assert!(benchmarks.is_empty());
    }

    #[test]
    fn test_other_aspect_knowledge_blocks_only_nk() {
        let benchmarks = build(
            &[rec("P3", "GO:3", CellularComponent, "IEA")],
            &[rec("P3", "GO:9", MolecularFunction, "EXP")],
            &[rec("P3", "GO:3", CellularComponent, "EXP")],
        );
        assert_eq!(benchmarks.lk(CellularComponent), &entries(&[("P3", "GO:3")])[..]);
        assert!(benchmarks.nk(CellularComponent).is_empty());
    }

    #[test]
    fn test_every_gained_term_is_emitted() {
        let benchmarks = build(
            &[rec("P4", "GO:100", BiologicalProcess, "IEA")],
            &[],
            &[
                rec("P4", "GO:2", BiologicalProcess, "IDA"),
                rec("P4", "GO:1", BiologicalProcess, "IMP"),
                rec("P4", "GO:7", CellularComponent, "IDA"),
            ],
        );
        assert_eq!(benchmarks.lk(BiologicalProcess), &entries(&[("P4", "GO:1"), ("P4", "GO:2")])[..]);
        // No t1-IEA row in CCO, so the CCO gain is not a candidate.
        assert!(benchmarks.lk(CellularComponent).is_empty());
    }

    #[test]
    fn test_protein_outside_universe_never_emitted() {
        let benchmarks = build(
            &[rec("P1", "GO:1", BiologicalProcess, "IEA")],
            &[],
            &[rec("P5", "GO:1", BiologicalProcess, "EXP")],
        );
        assert!(benchmarks.is_empty());
    }

    #[test]
    fn test_duplicate_rows_repeat_entries() {
        let t1_iea = [
            rec("P1", "GO:1", BiologicalProcess, "IEA"),
            rec("P1", "GO:5", BiologicalProcess, "ISS"),
        ];
        let t2_exp = [rec("P1", "GO:1", BiologicalProcess, "EXP")];
        let benchmarks = build(&t1_iea, &[], &t2_exp);
        assert_eq!(benchmarks.lk(BiologicalProcess), &entries(&[("P1", "GO:1"), ("P1", "GO:1")])[..]);

        let options = BuildOptions { dedupe_benchmark_entries: true, ..Default::default() };
        let deduped = build_benchmarks(&t1_iea, &[] as &[AnnotationRecord], &t2_exp, &options);
        assert_eq!(deduped.lk(BiologicalProcess), &entries(&[("P1", "GO:1")])[..]);
        assert_eq!(deduped.nk(BiologicalProcess), &entries(&[("P1", "GO:1")])[..]);
    }

    #[test]
    fn test_evidence_filter_on_experimental_rows() {
        let t1_exp = [rec("P1", "GO:8", MolecularFunction, "TAS")];
        let t2_exp = [rec("P1", "GO:1", BiologicalProcess, "IDA")];
        let t1_iea = [rec("P1", "GO:1", BiologicalProcess, "IEA")];

        let unfiltered = build(&t1_iea, &t1_exp, &t2_exp);
        assert!(unfiltered.nk(BiologicalProcess).is_empty());

        // Without TAS in the set the t1 MFO row no longer counts as knowledge.
        let options = BuildOptions {
            evidence_filter: Some(EvidenceCodes::new(&["IDA"])),
            ..Default::default()
        };
        let filtered = build_benchmarks(&t1_iea, &t1_exp, &t2_exp, &options);
        assert_eq!(filtered.nk(BiologicalProcess), &entries(&[("P1", "GO:1")])[..]);
    }

    #[test]
    fn test_nk_contained_in_lk() {
        let t1_iea = [
            rec("A", "GO:1", BiologicalProcess, "IEA"),
            rec("B", "GO:1", BiologicalProcess, "IEA"),
            rec("B", "GO:2", CellularComponent, "IEA"),
            rec("C", "GO:3", MolecularFunction, "IEA"),
            rec("D", "GO:3", MolecularFunction, "IEA"),
        ];
        let t1_exp = [
            rec("B", "GO:9", MolecularFunction, "EXP"),
            rec("D", "GO:3", MolecularFunction, "EXP"),
        ];
        let t2_exp = [
            rec("A", "GO:1", BiologicalProcess, "EXP"),
            rec("B", "GO:1", BiologicalProcess, "EXP"),
            rec("B", "GO:2", CellularComponent, "EXP"),
            rec("C", "GO:3", MolecularFunction, "EXP"),
            rec("C", "GO:4", MolecularFunction, "EXP"),
            rec("D", "GO:5", MolecularFunction, "EXP"),
        ];
        let benchmarks = build(&t1_iea, &t1_exp, &t2_exp);
        for aspect in Aspect::ALL.iter() {
            let lk: HashSet<_> = benchmarks.lk(*aspect).iter().collect();
            assert!(benchmarks.nk(*aspect).iter().all(|entry| lk.contains(entry)));
        }
        assert_eq!(benchmarks.nk(BiologicalProcess), &entries(&[("A", "GO:1")])[..]);
        assert_eq!(benchmarks.lk(BiologicalProcess), &entries(&[("A", "GO:1"), ("B", "GO:1")])[..]);
        assert!(benchmarks.get(Segment::new(KnowledgeType::LimitedKnowledge, MolecularFunction))
            .iter().all(|entry| entry.protein_id != "D"));
    }

    #[test]
    fn test_run_counts_and_summary() {
        let t1_iea = vec![
            Ok(rec("P1", "GO:1", BiologicalProcess, "IEA")),
            Ok(rec("P1", "GO:1", BiologicalProcess, "IEA")),
            Ok(rec("P2", "GO:2", CellularComponent, "IEA")),
        ];
        let t2_exp = [
            rec("P1", "GO:1", BiologicalProcess, "EXP"),
            rec("P1", "GO:2", BiologicalProcess, "EXP"),
        ];
        let builder = BenchmarkBuilder::from_records(&[] as &[AnnotationRecord], &t2_exp, &BuildOptions::default());
        let mut benchmarks = Benchmarks::default();
        let stats = builder.run(t1_iea, &mut benchmarks).unwrap();

        assert_eq!(stats.t1_iea_rows, 3);
        assert_eq!(stats.emitted_for(Segment::new(KnowledgeType::LimitedKnowledge, BiologicalProcess)), 4);
        assert_eq!(stats.total_emitted(), 8);

        let summary = benchmarks.summary();
        assert_eq!(summary[0], SegmentSummary {
            segment: Segment::new(KnowledgeType::LimitedKnowledge, BiologicalProcess),
            entries: 4,
            proteins: 1,
        });
        assert_eq!(summary[1].entries, 0);
    }

    #[test]
    fn test_in_memory_build_matches_streamed_run() {
        let t1_iea = [
            rec("P1", "GO:1", BiologicalProcess, "IEA"),
            rec("P1", "GO:1", BiologicalProcess, "IEA"),
            rec("P2", "GO:3", MolecularFunction, "IEA"),
        ];
        let t1_exp = [rec("P2", "GO:4", CellularComponent, "EXP")];
        let t2_exp = [
            rec("P1", "GO:2", BiologicalProcess, "EXP"),
            rec("P1", "GO:1", BiologicalProcess, "EXP"),
            rec("P2", "GO:3", MolecularFunction, "IDA"),
        ];

        for dedupe in &[false, true] {
            let options = BuildOptions { dedupe_benchmark_entries: *dedupe, ..Default::default() };
            let built = build_benchmarks(&t1_iea, &t1_exp, &t2_exp, &options);

            let builder = BenchmarkBuilder::from_records(&t1_exp, &t2_exp, &options);
            let mut streamed = Benchmarks::default();
            let stats = builder.run(t1_iea.iter().cloned().map(Ok), &mut streamed).unwrap();

            assert_eq!(built, streamed);
            assert_eq!(stats.total_emitted(), built.summary().iter().map(|s| s.entries as u64).sum::<u64>());
        }
    }
}
