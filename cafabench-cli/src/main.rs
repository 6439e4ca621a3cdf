use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use tracing::{error, info};

use std::convert::TryFrom;

use cafabench::{
    Aspect, AspectIndex, BenchmarkBuilder, BenchmarkFileState, BenchmarkPaths, BenchmarkWriter, BuildOptions,
    EvidenceCodes, SplitFilter, VerificationReport, Verifier, VerifyOptions,
};

mod config;
mod logging;

use config::Config;

fn input_arg<'a, 'b>(name: &'static str, help: &'static str) -> Arg<'a, 'b> {
    Arg::with_name(name)
        .long(name)
        .value_name("GAF")
        .required(true)
        .takes_value(true)
        .help(help)
}

fn evidence_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("evidence")
        .long("evidence")
        .value_name("CODES")
        .takes_value(true)
        .multiple(true)
        .help("Experimental evidence codes, comma or space separated")
}

/// A space separated list option where `all` means no restriction.
fn list_arg<'a, 'b>(name: &'static str, short: &'static str, help: &'static str) -> Arg<'a, 'b> {
    Arg::with_name(name)
        .long(name)
        .short(short)
        .takes_value(true)
        .multiple(true)
        .help(help)
}

fn engine_inputs<'a, 'b>(command: App<'a, 'b>) -> App<'a, 'b> {
    command
        .arg(input_arg("t1-iea", "Non-experimental annotations at t1"))
        .arg(input_arg("t1-exp", "Experimental annotations at t1"))
        .arg(input_arg("t2-exp", "Experimental annotations at t2"))
        .arg(evidence_arg())
}

fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("cafabench")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds and verifies LK/NK benchmark sets from two GOA snapshots")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .global(true)
            .help("Raises the log level when RUST_LOG is unset"))
        .subcommand(SubCommand::with_name("split")
            .about("Splits raw t1/t2 snapshots into t1_iea.gaf, t1_exp.gaf and t2_exp.gaf")
            .arg(input_arg("t1", "GOA snapshot at t1"))
            .arg(input_arg("t2", "GOA snapshot at t2"))
            .arg(Arg::with_name("out-dir")
                .long("out-dir")
                .short("o")
                .value_name("DIR")
                .required(true)
                .takes_value(true))
            .arg(evidence_arg())
            .arg(list_arg("organism", "G", "NCBI taxon ids to keep at t2, e.g. 9606 10090"))
            .arg(list_arg("ontology", "N", "Ontologies to keep at t2: F, P, C or MFO, BPO, CCO"))
            .arg(list_arg("source", "S", "Assigned_By sources to keep at t2, e.g. UniProt MGI"))
            .arg(Arg::with_name("pubmed")
                .long("pubmed")
                .short("P")
                .help("Drops t2 annotations without a PubMed reference"))
            .arg(Arg::with_name("confidence")
                .long("confidence")
                .short("C")
                .help("Drops t2 annotations backed by fewer than --threshold papers"))
            .arg(Arg::with_name("threshold")
                .long("threshold")
                .short("T")
                .value_name("PAPERS")
                .takes_value(true)
                .default_value("4"))
            .arg(list_arg("blacklist", "B", "PubMed ids whose annotations are dropped at t2")))
        .subcommand(engine_inputs(SubCommand::with_name("create")
            .about("Writes the six <prefix>.{LK,NK}_{bpo,cco,mfo}.txt benchmark files"))
            .arg(Arg::with_name("output")
                .long("output")
                .short("o")
                .value_name("PREFIX")
                .required(true)
                .takes_value(true))
            .arg(Arg::with_name("dedupe")
                .long("dedupe")
                .help("Writes each protein/term pair at most once per file")))
        .subcommand(engine_inputs(SubCommand::with_name("verify")
            .about("Re-checks benchmark files against the annotation inputs"))
            .arg(Arg::with_name("benchmark")
                .long("benchmark")
                .short("b")
                .value_name("PREFIX")
                .required(true)
                .takes_value(true))
            .arg(Arg::with_name("all-violations")
                .long("all-violations")
                .help("Reports every violation instead of stopping at the first")))
}

fn main() {
    let matches = app().get_matches();
    let verbosity = matches.subcommand().1
        .map(|args| args.occurrences_of("verbose"))
        .unwrap_or(0)
        .max(matches.occurrences_of("verbose"));
    logging::init_logging(verbosity);

    if let Err(e) = run(&matches) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &ArgMatches) -> Result<(), String> {
    let mut config = Config::from_env()?;

    match args.subcommand() {
        ("split", Some(args)) => {
            config.apply_args(args)?;
            split(args, &config)
        }
        ("create", Some(args)) => {
            config.apply_args(args)?;
            create(args, &config)
        }
        ("verify", Some(args)) => {
            config.apply_args(args)?;
            verify(args, &config)
        }
        _ => Err("no subcommand given".to_string()),
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path, String> {
    args.value_of(name)
        .map(Path::new)
        .ok_or_else(|| format!("missing --{}", name))
}

/// Runs the advisory checks over every GAF input; only absent or empty files fail.
fn check_inputs(paths: &[&Path]) -> Result<(), String> {
    for path in paths {
        cafabench::check_annotation_file(path)
            .map_err(|e| format!("failed to check {}: {}", path.display(), e))?;
    }
    Ok(())
}

fn split(args: &ArgMatches, config: &Config) -> Result<(), String> {
    let t1_path = path_arg(args, "t1")?;
    let t2_path = path_arg(args, "t2")?;
    let out_dir = path_arg(args, "out-dir")?;
    check_inputs(&[t1_path, t2_path])?;

    let t1 = File::open(t1_path)
        .map_err(|e| format!("failed to open t1 file: {}", e))?;
    let t2 = File::open(t2_path)
        .map_err(|e| format!("failed to open t2 file: {}", e))?;

    fs::create_dir_all(out_dir)
        .map_err(|e| format!("failed to create {}: {}", out_dir.display(), e))?;
    let open_output = |name: &str| {
        let path = out_dir.join(name);
        File::create(&path)
            .map(BufWriter::new)
            .map_err(|e| format!("failed to create {}: {}", path.display(), e))
    };

    let filter = split_filter(args)?;
    let stats = cafabench::split_t1(
        BufReader::new(t1),
        BufReader::new(t2),
        &config.evidence_codes(),
        &filter,
        open_output("t1_iea.gaf")?,
        open_output("t1_exp.gaf")?,
        open_output("t2_exp.gaf")?,
    ).map_err(|e| format!("failed to split annotations: {}", e))?;

    info!(dir = %out_dir.display(), rows = stats.t1_iea + stats.t1_exp + stats.t2_exp, "wrote split annotation files");
    Ok(())
}

fn list_values<'a>(args: &'a ArgMatches, name: &str) -> Vec<&'a str> {
    let values: Vec<&str> = args.values_of(name).map(|values| values.collect()).unwrap_or_default();
    if values.iter().any(|value| value.eq_ignore_ascii_case("all")) {
        return Vec::new();
    }
    values
}

fn split_filter(args: &ArgMatches) -> Result<SplitFilter, String> {
    let aspects = list_values(args, "ontology").into_iter()
        .map(|value| Aspect::try_from(value.to_ascii_uppercase().as_str())
            .map_err(|_| format!("unknown ontology {:?}, expected F, P, C, MFO, BPO or CCO", value)))
        .collect::<Result<Vec<_>, String>>()?;

    let min_references = if args.is_present("confidence") {
        let threshold = args.value_of("threshold").unwrap_or("4");
        let threshold = threshold.parse::<usize>()
            .map_err(|e| format!("invalid --threshold {:?}: {}", threshold, e))?;
        Some(threshold)
    } else {
        None
    };

    Ok(SplitFilter::default()
        .taxa(list_values(args, "organism"))
        .aspects(aspects)
        .sources(list_values(args, "source"))
        .require_pubmed(args.is_present("pubmed"))
        .min_references(min_references)
        .blacklist(list_values(args, "blacklist")))
}

struct EngineInputs<'a> {
    t1_iea: &'a Path,
    t1_exp: &'a Path,
    t2_exp: &'a Path,
}

impl<'a> EngineInputs<'a> {
    fn from_args(args: &'a ArgMatches) -> Result<EngineInputs<'a>, String> {
        let inputs = EngineInputs {
            t1_iea: path_arg(args, "t1-iea")?,
            t1_exp: path_arg(args, "t1-exp")?,
            t2_exp: path_arg(args, "t2-exp")?,
        };
        check_inputs(&[inputs.t1_iea, inputs.t1_exp, inputs.t2_exp])?;
        Ok(inputs)
    }

    fn experimental(&self, filter: Option<&EvidenceCodes>) -> Result<(AspectIndex, AspectIndex), String> {
        let t1_exp = cafabench::open_input(self.t1_exp)
            .and_then(|records| AspectIndex::try_build(records, filter))
            .map_err(|e| format!("failed to read t1 experimental annotations: {}", e))?;
        let t2_exp = cafabench::open_input(self.t2_exp)
            .and_then(|records| AspectIndex::try_build(records, filter))
            .map_err(|e| format!("failed to read t2 experimental annotations: {}", e))?;
        info!(
            t1_exp_pairs = t1_exp.pair_count(),
            t2_exp_pairs = t2_exp.pair_count(),
            "indexed experimental annotations"
        );
        Ok((t1_exp, t2_exp))
    }
}

fn create(args: &ArgMatches, config: &Config) -> Result<(), String> {
    let inputs = EngineInputs::from_args(args)?;
    let prefix = path_arg(args, "output")?;

    let options = BuildOptions {
        dedupe_benchmark_entries: config.dedupe,
        evidence_filter: config.evidence_codes.clone(),
    };
    let (t1_exp, t2_exp) = inputs.experimental(options.evidence_filter.as_ref())?;
    let t1_iea = cafabench::open_input(inputs.t1_iea)
        .map_err(|e| format!("failed to open t1 non-experimental annotations: {}", e))?;

    let paths = BenchmarkPaths::from_prefix(prefix);
    if let Some(parent) = prefix.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }
    let mut writer = BenchmarkWriter::create(&paths)
        .map_err(|e| format!("failed to create benchmark files: {}", e))?;

    let stats = BenchmarkBuilder::new(t1_exp, t2_exp, &options)
        .run(t1_iea, &mut writer)
        .map_err(|e| format!("failed to build benchmarks: {}", e))?;
    writer.flush()
        .map_err(|e| format!("failed to write benchmark files: {}", e))?;

    for (segment, path) in paths.iter() {
        info!(segment = %segment, entries = stats.emitted_for(segment), path = %path.display(), "wrote benchmark");
    }
    Ok(())
}

fn verify(args: &ArgMatches, config: &Config) -> Result<(), String> {
    let inputs = EngineInputs::from_args(args)?;
    let prefix = path_arg(args, "benchmark")?;

    let t1_iea = cafabench::open_input(inputs.t1_iea)
        .and_then(|records| cafabench::try_build_index(records, None, None))
        .map_err(|e| format!("failed to read t1 non-experimental annotations: {}", e))?;
    let options = VerifyOptions {
        stop_at_first_violation: config.stop_at_first_violation,
        evidence_filter: config.evidence_codes.clone(),
    };
    let (t1_exp, t2_exp) = inputs.experimental(options.evidence_filter.as_ref())?;
    let verifier = Verifier::new(t1_iea, t1_exp, t2_exp, options);

    let mut report = VerificationReport::default();
    for (segment, path) in BenchmarkPaths::from_prefix(prefix).iter() {
        if cafabench::check_benchmark_file(path) == BenchmarkFileState::Missing {
            report.skip(segment);
            continue;
        }
        let file = File::open(path)
            .map_err(|e| format!("failed to open {}: {}", path.display(), e))?;
        let segment_report = verifier.verify(segment, cafabench::read_benchmark(file))
            .map_err(|e| format!("failed to verify {}: {}", path.display(), e))?;
        report.push(segment_report.with_source(path.display().to_string()));
    }

    println!("{}", report);
    if report.reports.is_empty() {
        return Err(format!("no benchmark files found with prefix {}", prefix.display()));
    }
    if report.passed() {
        Ok(())
    } else {
        let failed = report.reports.len() - report.success_count();
        Err(format!("{} benchmark files failed verification", failed))
    }
}
