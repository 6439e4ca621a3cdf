use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{AnnotationRecord, Aspect, Error, KnowledgeType};

/// The evidence codes considered experimental.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EvidenceCodes {
    codes: BTreeSet<String>,
}

impl EvidenceCodes {
    pub const DEFAULT: &'static [&'static str] = &["EXP", "IDA", "IPI", "IMP", "IGI", "IEP", "TAS", "IC"];

    pub fn new<I, S>(codes: I) -> EvidenceCodes
        where I: IntoIterator<Item=S>,
              S: AsRef<str>,
    {
        let codes = codes.into_iter()
            .map(|code| code.as_ref().trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        EvidenceCodes { codes }
    }

    pub fn is_experimental(&self, evidence_code: &str) -> bool {
        self.codes.contains(evidence_code)
    }

    pub fn classify(&self, record: &AnnotationRecord) -> EvidenceClass {
        if self.is_experimental(&record.evidence_code) {
            EvidenceClass::Experimental
        } else {
            EvidenceClass::NonExperimental
        }
    }

    pub fn iter(&self) -> impl Iterator<Item=&str> {
        self.codes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for EvidenceCodes {
    fn default() -> Self {
        EvidenceCodes::new(Self::DEFAULT)
    }
}

impl FromStr for EvidenceCodes {
    type Err = Error;

    /// Parses a comma or whitespace separated list such as `"EXP, IDA IMP"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let codes = EvidenceCodes::new(s.split(|c: char| c == ',' || c.is_whitespace()));
        if codes.is_empty() {
            return Err(Error::InvalidEvidenceCodes(s.to_string()));
        }
        Ok(codes)
    }
}

impl fmt::Display for EvidenceCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.codes.iter().join(","))
    }
}

#[derive(Debug, Hash, Copy, Clone, Eq, PartialEq)]
pub enum EvidenceClass {
    Experimental,
    NonExperimental,
}

/// One of the six benchmark outputs: a knowledge type paired with an aspect.
#[derive(Debug, Hash, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Segment {
    pub knowledge: KnowledgeType,
    pub aspect: Aspect,
}

impl Segment {
    pub const ALL: [Segment; 6] = [
        Segment::new(KnowledgeType::LimitedKnowledge, Aspect::BiologicalProcess),
        Segment::new(KnowledgeType::LimitedKnowledge, Aspect::CellularComponent),
        Segment::new(KnowledgeType::LimitedKnowledge, Aspect::MolecularFunction),
        Segment::new(KnowledgeType::NoKnowledge, Aspect::BiologicalProcess),
        Segment::new(KnowledgeType::NoKnowledge, Aspect::CellularComponent),
        Segment::new(KnowledgeType::NoKnowledge, Aspect::MolecularFunction),
    ];

    pub const fn new(knowledge: KnowledgeType, aspect: Aspect) -> Segment {
        Segment { knowledge, aspect }
    }

    /// Suffix used in benchmark file names, e.g. `LK_bpo`.
    pub fn file_suffix(&self) -> String {
        format!("{}_{}", self.knowledge.code(), self.aspect.ontology().to_ascii_lowercase())
    }

    pub(crate) fn slot(&self) -> usize {
        let knowledge = match self.knowledge {
            KnowledgeType::LimitedKnowledge => 0,
            KnowledgeType::NoKnowledge => 1,
        };
        knowledge * Aspect::ALL.len() + self.aspect.slot()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.knowledge, self.aspect)
    }
}

/// A single `protein_id<TAB>go_id` line of a benchmark file.
#[derive(Debug, Hash, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub protein_id: String,
    pub go_id: String,
}

impl BenchmarkEntry {
    pub fn new(protein_id: &str, go_id: &str) -> BenchmarkEntry {
        BenchmarkEntry { protein_id: protein_id.to_string(), go_id: go_id.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_codes() {
        let codes = EvidenceCodes::default();
        assert!(codes.is_experimental("EXP"));
        assert!(codes.is_experimental("TAS"));
        assert!(!codes.is_experimental("IEA"));
        assert!(!codes.is_experimental("exp"));
        assert_eq!(codes.len(), 8);
    }

    #[test]
    fn test_parse_codes() {
        let codes: EvidenceCodes = "exp, ida  IMP,,".parse().unwrap();
        assert_eq!(codes.iter().collect::<Vec<_>>(), vec!["EXP", "IDA", "IMP"]);
        assert_eq!(codes.to_string(), "EXP,IDA,IMP");
        assert!(" , ".parse::<EvidenceCodes>().is_err());
    }

    #[test]
    fn test_classify() {
        let codes = EvidenceCodes::new(&["IDA"]);
        let experimental = AnnotationRecord::new("P1", "GO:1", Aspect::BiologicalProcess, "IDA");
        let electronic = AnnotationRecord::new("P1", "GO:1", Aspect::BiologicalProcess, "IEA");
        assert_eq!(codes.classify(&experimental), EvidenceClass::Experimental);
        assert_eq!(codes.classify(&electronic), EvidenceClass::NonExperimental);
    }

    #[test]
    fn test_segments() {
        let suffixes: Vec<String> = Segment::ALL.iter().map(Segment::file_suffix).collect();
        assert_eq!(suffixes, vec!["LK_bpo", "LK_cco", "LK_mfo", "NK_bpo", "NK_cco", "NK_mfo"]);
        for (i, segment) in Segment::ALL.iter().enumerate() {
            assert_eq!(segment.slot(), i);
        }
        assert_eq!(Segment::ALL[4].to_string(), "NK-CCO");
    }
}
