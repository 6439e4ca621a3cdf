use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::ops::Index;

use crate::{AnnotationRecord, Aspect, EvidenceCodes, Result};

pub type TermSet = HashSet<String>;

/// Protein id to the GO terms annotated to it.
pub type ProteinIndex = HashMap<String, TermSet>;

/// Collects `(protein, GO term)` pairs from `records`.
///
/// With an `aspect` only rows of that aspect contribute, and with `evidence`
/// only rows whose evidence code is in the set.
pub fn build_index<I>(records: I, aspect: Option<Aspect>, evidence: Option<&EvidenceCodes>) -> ProteinIndex
    where I: IntoIterator,
          I::Item: Borrow<AnnotationRecord>,
{
    let mut index = ProteinIndex::new();
    for record in records {
        let record = record.borrow();
        if aspect.map(|aspect| aspect != record.aspect).unwrap_or(false) {
            continue;
        }
        if !accepts(evidence, record) {
            continue;
        }
        insert(&mut index, record);
    }
    index
}

/// [`build_index`] over a fallible record stream; stops at the first read error.
pub fn try_build_index<I>(records: I, aspect: Option<Aspect>, evidence: Option<&EvidenceCodes>) -> Result<ProteinIndex>
    where I: IntoIterator<Item=Result<AnnotationRecord>>,
{
    itertools::process_results(records, |records| build_index(records, aspect, evidence))
}

fn accepts(evidence: Option<&EvidenceCodes>, record: &AnnotationRecord) -> bool {
    evidence.map(|codes| codes.is_experimental(&record.evidence_code)).unwrap_or(true)
}

fn insert(index: &mut ProteinIndex, record: &AnnotationRecord) {
    index.entry(record.protein_id.clone())
        .or_insert_with(HashSet::new)
        .insert(record.go_id.clone());
}

/// One [`ProteinIndex`] per ontology aspect.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct AspectIndex {
    by_aspect: [ProteinIndex; 3],
}

impl AspectIndex {
    pub fn build<I>(records: I, evidence: Option<&EvidenceCodes>) -> AspectIndex
        where I: IntoIterator,
              I::Item: Borrow<AnnotationRecord>,
    {
        let mut index = AspectIndex::default();
        for record in records {
            let record = record.borrow();
            if accepts(evidence, record) {
                index.insert(record);
            }
        }
        index
    }

    /// [`AspectIndex::build`] over a fallible record stream.
    pub fn try_build<I>(records: I, evidence: Option<&EvidenceCodes>) -> Result<AspectIndex>
        where I: IntoIterator<Item=Result<AnnotationRecord>>,
    {
        itertools::process_results(records, |records| AspectIndex::build(records, evidence))
    }

    pub fn insert(&mut self, record: &AnnotationRecord) {
        insert(&mut self.by_aspect[record.aspect.slot()], record);
    }

    pub fn terms(&self, aspect: Aspect, protein_id: &str) -> Option<&TermSet> {
        self[aspect].get(protein_id)
    }

    pub fn contains(&self, aspect: Aspect, protein_id: &str) -> bool {
        self[aspect].contains_key(protein_id)
    }

    /// Whether the protein is annotated in any aspect.
    pub fn contains_any(&self, protein_id: &str) -> bool {
        self.by_aspect.iter().any(|index| index.contains_key(protein_id))
    }

    pub fn contains_term(&self, aspect: Aspect, protein_id: &str, go_id: &str) -> bool {
        self.terms(aspect, protein_id)
            .map(|terms| terms.contains(go_id))
            .unwrap_or(false)
    }

    /// Number of `(protein, GO term)` pairs across all aspects.
    pub fn pair_count(&self) -> usize {
        self.by_aspect.iter()
            .flat_map(|index| index.values())
            .map(HashSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_aspect.iter().all(HashMap::is_empty)
    }
}

impl Index<Aspect> for AspectIndex {
    type Output = ProteinIndex;

    fn index(&self, aspect: Aspect) -> &ProteinIndex {
        &self.by_aspect[aspect.slot()]
    }
}
