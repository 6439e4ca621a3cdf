//! Build and verify CAFA-style benchmark protein sets from two GOA snapshots.
//!
//! Annotation rows from an earlier time point (t1) and a later one (t2) are
//! indexed per ontology aspect. A protein that had no experimental evidence
//! for an aspect at t1 but gained some by t2 is a Limited-Knowledge (LK)
//! benchmark protein for that aspect. If it had no experimental evidence in
//! any aspect at t1 it is also a No-Knowledge (NK) benchmark protein.

#[cfg(test)]
#[macro_use]
extern crate lazy_static;

use std::convert::TryFrom;
use std::fmt;
use serde::{Deserialize, Serialize};

mod error;
mod ingest;
mod models;
mod index;
mod benchmark;
mod verify;
mod export;
mod partition;
mod format;

pub use error::{Error, Result};
pub use ingest::{AnnotationRecord, AnnotationReader, MetadataReader, open_input};
pub use models::{BenchmarkEntry, EvidenceCodes, EvidenceClass, Segment};
pub use index::{build_index, try_build_index, AspectIndex, ProteinIndex, TermSet};
pub use benchmark::{
    build_benchmarks, BenchmarkBuilder, BenchmarkSink, Benchmarks, BuildOptions, BuildStats,
    SegmentSummary,
};
pub use verify::{
    verify_lk, verify_nk, SegmentReport, VerificationReport, Verifier, VerifyOptions, Violation,
};
pub use export::{read_benchmark, BenchmarkPaths, BenchmarkReader, BenchmarkWriter, GafWriter};
pub use partition::{split_by_evidence, split_t1, SplitFilter, SplitStats};
pub use format::{check_annotation_file, check_benchmark_file, BenchmarkFileState, GafCheck};

#[derive(Debug, Hash, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Aspect {
    #[serde(rename = "P")]
    BiologicalProcess,
    #[serde(rename = "C")]
    CellularComponent,
    #[serde(rename = "F")]
    MolecularFunction,
}

impl Aspect {
    pub const ALL: [Aspect; 3] = [
        Aspect::BiologicalProcess,
        Aspect::CellularComponent,
        Aspect::MolecularFunction,
    ];

    /// Single-letter code used in column 9 of GAF files.
    pub fn code(self) -> &'static str {
        match self {
            Aspect::BiologicalProcess => "P",
            Aspect::CellularComponent => "C",
            Aspect::MolecularFunction => "F",
        }
    }

    /// Ontology abbreviation used in benchmark file names.
    pub fn ontology(self) -> &'static str {
        match self {
            Aspect::BiologicalProcess => "BPO",
            Aspect::CellularComponent => "CCO",
            Aspect::MolecularFunction => "MFO",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Aspect::BiologicalProcess => 0,
            Aspect::CellularComponent => 1,
            Aspect::MolecularFunction => 2,
        }
    }
}

impl TryFrom<&str> for Aspect {
    type Error = ();

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let aspect = match value {
            "F" | "MFO" => Aspect::MolecularFunction,
            "P" | "BPO" => Aspect::BiologicalProcess,
            "C" | "CCO" => Aspect::CellularComponent,
            _ => return Err(()),
        };
        Ok(aspect)
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ontology())
    }
}

/// Which benchmark a protein qualifies for.
#[derive(Debug, Hash, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum KnowledgeType {
    /// No experimental evidence in the target aspect at t1.
    #[serde(rename = "LK")]
    LimitedKnowledge,
    /// No experimental evidence in any aspect at t1.
    #[serde(rename = "NK")]
    NoKnowledge,
}

impl KnowledgeType {
    pub const ALL: [KnowledgeType; 2] = [KnowledgeType::LimitedKnowledge, KnowledgeType::NoKnowledge];

    pub fn code(self) -> &'static str {
        match self {
            KnowledgeType::LimitedKnowledge => "LK",
            KnowledgeType::NoKnowledge => "NK",
        }
    }
}

impl TryFrom<&str> for KnowledgeType {
    type Error = ();

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let knowledge = match value {
            "LK" => KnowledgeType::LimitedKnowledge,
            "NK" => KnowledgeType::NoKnowledge,
            _ => return Err(()),
        };
        Ok(knowledge)
    }
}

impl fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
