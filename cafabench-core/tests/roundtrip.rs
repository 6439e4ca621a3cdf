use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use cafabench::{
    open_input, read_benchmark, split_t1, Aspect, AspectIndex, BenchmarkBuilder, BenchmarkEntry, BenchmarkPaths,
    BenchmarkWriter, BuildOptions, EvidenceCodes, KnowledgeType, Segment, SplitFilter, VerificationReport, Verifier,
    VerifyOptions,
};

fn row(protein: &str, go: &str, evidence: &str, aspect: &str) -> String {
    format!(
        "UniProtKB\t{}\tSYM\t\t{}\tPMID:1\t{}\t\t{}\tname\tsyn\tprotein\ttaxon:9606\t20100101\tUniProt\n",
        protein, go, evidence, aspect
    )
}

fn gaf(rows: &[String]) -> String {
    let mut text = String::from("!gaf-version: 2.0\n!date: 2020-01-01\n");
    for row in rows {
        text.push_str(row);
    }
    text
}

fn t1() -> String {
    gaf(&[
        // Q1 is unknown everywhere at t1.
        row("Q1", "GO:0000001", "IEA", "P"),
        row("Q1", "GO:0000002", "IEA", "F"),
        // Q2 already has experimental MF annotation.
        row("Q2", "GO:0000003", "IEA", "P"),
        row("Q2", "GO:0000004", "IDA", "F"),
        // Q3 gains nothing.
        row("Q3", "GO:0000005", "IEA", "C"),
        // Q4 is known experimentally in BP and stays that way.
        row("Q4", "GO:0000006", "EXP", "P"),
        row("Q4", "GO:0000007", "IEA", "C"),
        "UniProtKB\tQ9\ttoo short\n".to_string(),
    ])
}

fn t2() -> String {
    gaf(&[
        row("Q1", "GO:0000010", "EXP", "P"),
        row("Q1", "GO:0000011", "IMP", "P"),
        row("Q1", "GO:0000012", "IEA", "F"),
        row("Q2", "GO:0000013", "IPI", "P"),
        row("Q2", "GO:0000004", "IDA", "F"),
        row("Q3", "GO:0000014", "IEA", "C"),
        row("Q4", "GO:0000015", "TAS", "C"),
    ])
}

fn write(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
}

fn read_file(path: &Path) -> Vec<BenchmarkEntry> {
    read_benchmark(File::open(path).unwrap())
        .collect::<cafabench::Result<_>>()
        .unwrap()
}

fn entries(pairs: &[(&str, &str)]) -> Vec<BenchmarkEntry> {
    pairs.iter().map(|(protein, go)| BenchmarkEntry::new(protein, go)).collect()
}

#[test]
fn split_create_verify() {
    let dir = tempfile::tempdir().unwrap();
    let raw_t1 = dir.path().join("t1.gaf");
    let raw_t2 = dir.path().join("t2.gaf");
    write(&raw_t1, &t1());
    write(&raw_t2, &t2());

    let t1_iea = dir.path().join("t1_iea.gaf");
    let t1_exp = dir.path().join("t1_exp.gaf");
    let t2_exp = dir.path().join("t2_exp.gaf");
    let stats = split_t1(
        BufReader::new(File::open(&raw_t1).unwrap()),
        BufReader::new(File::open(&raw_t2).unwrap()),
        &EvidenceCodes::default(),
        &SplitFilter::default(),
        File::create(&t1_iea).unwrap(),
        File::create(&t1_exp).unwrap(),
        File::create(&t2_exp).unwrap(),
    ).unwrap();
    assert_eq!(stats.t2_exp, 5);
    assert_eq!(stats.skipped, 1);

    let options = BuildOptions::default();
    let builder = BenchmarkBuilder::new(
        AspectIndex::try_build(open_input(&t1_exp).unwrap(), None).unwrap(),
        AspectIndex::try_build(open_input(&t2_exp).unwrap(), None).unwrap(),
        &options,
    );
    let prefix = dir.path().join("out").join("bench");
    fs::create_dir_all(prefix.parent().unwrap()).unwrap();
    let paths = BenchmarkPaths::from_prefix(&prefix);
    let mut writer = BenchmarkWriter::create(&paths).unwrap();
    let build = builder.run(open_input(&t1_iea).unwrap(), &mut writer).unwrap();
    writer.flush().unwrap();

    let lk_bpo = Segment::new(KnowledgeType::LimitedKnowledge, Aspect::BiologicalProcess);
    let nk_bpo = Segment::new(KnowledgeType::NoKnowledge, Aspect::BiologicalProcess);
    let lk_cco = Segment::new(KnowledgeType::LimitedKnowledge, Aspect::CellularComponent);
    assert_eq!(read_file(paths.get(lk_bpo)), entries(&[
        ("Q1", "GO:0000010"),
        ("Q1", "GO:0000011"),
        ("Q2", "GO:0000013"),
    ]));
    assert_eq!(read_file(paths.get(nk_bpo)), entries(&[
        ("Q1", "GO:0000010"),
        ("Q1", "GO:0000011"),
    ]));
    assert_eq!(read_file(paths.get(lk_cco)), entries(&[("Q4", "GO:0000015")]));
    assert_eq!(build.total_emitted(), 6);
    for segment in Segment::ALL.iter() {
        assert_eq!(build.emitted_for(*segment) as usize, read_file(paths.get(*segment)).len());
    }

    let verifier = Verifier::from_records(
        open_input(&t1_iea).unwrap().map(Result::unwrap),
        open_input(&t1_exp).unwrap().map(Result::unwrap),
        open_input(&t2_exp).unwrap().map(Result::unwrap),
        VerifyOptions { stop_at_first_violation: false, ..VerifyOptions::default() },
    );
    let mut report = VerificationReport::default();
    for (segment, path) in paths.iter() {
        let segment_report = verifier.verify(segment, read_benchmark(File::open(path).unwrap())).unwrap();
        report.push(segment_report);
    }
    assert!(report.passed(), "{}", report);
    assert_eq!(report.success_count(), 6);
    assert_eq!(report.total_checked(), 6);
}

#[test]
fn tampered_benchmark_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let t1_iea = dir.path().join("t1_iea.gaf");
    let t1_exp = dir.path().join("t1_exp.gaf");
    let t2_exp = dir.path().join("t2_exp.gaf");
    write(&t1_iea, &gaf(&[row("Q1", "GO:0000001", "IEA", "P")]));
    write(&t1_exp, &gaf(&[row("Q2", "GO:0000002", "IDA", "P")]));
    write(&t2_exp, &gaf(&[
        row("Q1", "GO:0000010", "EXP", "P"),
        row("Q2", "GO:0000011", "EXP", "P"),
    ]));

    let verifier = Verifier::from_records(
        open_input(&t1_iea).unwrap().map(Result::unwrap),
        open_input(&t1_exp).unwrap().map(Result::unwrap),
        open_input(&t2_exp).unwrap().map(Result::unwrap),
        VerifyOptions::default(),
    );
    let lk_bpo = Segment::new(KnowledgeType::LimitedKnowledge, Aspect::BiologicalProcess);
    let tampered = dir.path().join("bench.LK_bpo.txt");
    write(&tampered, "Q1\tGO:0000010\nQ2\tGO:0000011\n");

    let report = verifier.verify(lk_bpo, read_benchmark(File::open(&tampered).unwrap())).unwrap();
    assert!(!report.passed());
    assert_eq!(report.checked, 2);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].protein_id(), "Q2");
}
