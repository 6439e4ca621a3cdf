use std::env;

use cafabench::EvidenceCodes;
use clap::ArgMatches;

/// Settings shared by the subcommands.
///
/// Defaults are overridden by `.env`/environment variables, which are in turn
/// overridden by command line flags.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    /// `None` means the built-in experimental code set.
    pub evidence_codes: Option<EvidenceCodes>,
    pub dedupe: bool,
    pub stop_at_first_violation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            evidence_codes: None,
            dedupe: false,
            stop_at_first_violation: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, String> {
        // A missing .env is fine; the variables may come from the shell.
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let evidence_codes = match env::var("CAFABENCH_EVIDENCE_CODES") {
            Ok(value) => Some(parse_codes("CAFABENCH_EVIDENCE_CODES", &value)?),
            Err(_) => None,
        };
        let dedupe = match env::var("CAFABENCH_DEDUPE") {
            Ok(value) => parse_flag("CAFABENCH_DEDUPE", &value)?,
            Err(_) => defaults.dedupe,
        };
        let stop_at_first_violation = match env::var("CAFABENCH_STOP_AT_FIRST_VIOLATION") {
            Ok(value) => parse_flag("CAFABENCH_STOP_AT_FIRST_VIOLATION", &value)?,
            Err(_) => defaults.stop_at_first_violation,
        };

        Ok(Config { evidence_codes, dedupe, stop_at_first_violation })
    }

    /// Applies whichever of `--evidence`, `--dedupe` and `--all-violations`
    /// the subcommand defines and the user passed.
    pub fn apply_args(&mut self, args: &ArgMatches) -> Result<(), String> {
        if let Some(values) = args.values_of("evidence") {
            let joined = values.collect::<Vec<_>>().join(",");
            self.evidence_codes = Some(parse_codes("--evidence", &joined)?);
        }
        if args.is_present("dedupe") {
            self.dedupe = true;
        }
        if args.is_present("all-violations") {
            self.stop_at_first_violation = false;
        }
        Ok(())
    }

    pub fn evidence_codes(&self) -> EvidenceCodes {
        self.evidence_codes.clone().unwrap_or_default()
    }
}

fn parse_codes(source: &str, value: &str) -> Result<EvidenceCodes, String> {
    value.parse().map_err(|e| format!("{}: {}", source, e))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("{} must be true or false, got {:?}", name, other)),
    }
}
