//! Native-side harness
//!
//! Drives every registered entry point against a [`MemoryHost`] and checks
//! the results the way the Kotlin `Main.kt` does. Each entry point is run
//! twice and both observations must agree.

use crate::config::BridgeConfig;
use crate::entry::{
    dir_reader_with_result, native_assertions, result_of_array_string, run_guarded, rusty_array,
    rusty_array_ints, rusty_class, silly_debugger, EntryPoint, DEBUG_OK, DIR_READER_WITH_RESULT,
    ENTRY_POINTS, INT_FIXTURE, RESULT_OF_ARRAY_STRING, RUSTY_MESSAGE, TEXT_FIXTURE,
};
use crate::errors::{BridgeError, BridgeResult};
use crate::host::{HostRuntime, MemoryHost};
use crate::logging::{init_logging, LogConfig};
use crate::marshal::{
    call_text_method, decode_text, read_envelope, read_host_array, ElementKind, Envelope, Sequence,
};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

/// What an entry point call looks like from the host side
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Unit,
    Text(String),
    Sequence(Sequence),
    Envelope(Envelope),
}

/// Call `entry` and read its result back through the host
pub fn observe<H: HostRuntime>(host: &mut H, entry: &EntryPoint, dir: &Path) -> BridgeResult<Observed> {
    let observed = match entry.name {
        "nativeAssertions" => {
            native_assertions(host)?;
            Observed::Unit
        }
        "rustyClass" => {
            let object = rusty_class(host)?;
            Observed::Text(call_text_method(host, &object, "getMessage")?)
        }
        "rustyArray" => {
            let array = rusty_array(host)?;
            Observed::Sequence(read_host_array(host, &array, ElementKind::Text)?)
        }
        "rustyArrayInts" => {
            let array = rusty_array_ints(host)?;
            Observed::Sequence(read_host_array(host, &array, ElementKind::Int)?)
        }
        "resultOfArrayString" => {
            let object = result_of_array_string(host)?;
            Observed::Envelope(read_envelope(host, &RESULT_OF_ARRAY_STRING, &object)?)
        }
        "dirReaderWithResult" => {
            let object = dir_reader_with_result(host, dir)?;
            Observed::Envelope(read_envelope(host, &DIR_READER_WITH_RESULT, &object)?)
        }
        "sillyDebugger" => {
            let text = silly_debugger(host)?;
            Observed::Text(decode_text(host, &text)?)
        }
        other => return Err(BridgeError::Host(format!("no entry point named `{}`", other))),
    };
    Ok(observed)
}

fn mismatch(entry: &str, found: &Observed) -> BridgeError {
    BridgeError::Assertion(format!("{} returned {:?}", entry, found))
}

/// Compare an observation against what the host expects; returns a summary
pub fn verify(entry: &EntryPoint, observed: &Observed) -> BridgeResult<String> {
    match (entry.name, observed) {
        ("nativeAssertions", Observed::Unit) => Ok("passed".to_string()),
        ("rustyClass", Observed::Text(message)) if message == RUSTY_MESSAGE => Ok(message.clone()),
        ("rustyArray", Observed::Sequence(seq)) if *seq == Sequence::text(TEXT_FIXTURE) => {
            Ok(format!("{:?}", TEXT_FIXTURE))
        }
        ("rustyArrayInts", Observed::Sequence(seq)) if *seq == Sequence::ints(INT_FIXTURE) => {
            Ok(format!("{:?}", INT_FIXTURE))
        }
        ("resultOfArrayString", Observed::Envelope(envelope))
            if !envelope.is_failure() && envelope.success_data() == TEXT_FIXTURE =>
        {
            Ok(format!("{} entries", envelope.success_data().len()))
        }
        ("dirReaderWithResult", Observed::Envelope(envelope)) => match envelope.failure_data() {
            [] => Ok(format!("{} entries", envelope.success_data().len())),
            failure => Err(BridgeError::Assertion(failure.join("; "))),
        },
        ("sillyDebugger", Observed::Text(report)) if report == DEBUG_OK => Ok(report.clone()),
        (name, found) => Err(mismatch(name, found)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub entry: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Run, re-run and verify one entry point
pub fn check_entry(host: &mut MemoryHost, entry: &EntryPoint, dir: &Path) -> CheckReport {
    let outcome = run_guarded(entry.name, || {
        let first = observe(host, entry, dir)?;
        let second = observe(host, entry, dir)?;
        if first != second {
            return Err(BridgeError::Assertion(format!(
                "{} is not idempotent: {:?} then {:?}",
                entry.name, first, second
            )));
        }
        verify(entry, &first)
    });

    match outcome {
        Ok(detail) => CheckReport {
            entry: entry.name,
            passed: true,
            detail,
        },
        Err(fatal) => CheckReport {
            entry: entry.name,
            passed: false,
            detail: fatal.message,
        },
    }
}

pub fn run_checks(dir: &Path) -> Vec<CheckReport> {
    let mut host = MemoryHost::with_fixture_classes();
    ENTRY_POINTS
        .iter()
        .map(|entry| check_entry(&mut host, entry, dir))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarnessOptions {
    pub dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

const USAGE: &str = "Usage: rusty-jni-harness [OPTIONS]\n\nOptions:\n  \
    --dir PATH      Directory listed by dirReaderWithResult\n  \
    --config FILE   TOML configuration (default: $RUSTY_JNI_CONFIG)\n  \
    --verbose       Debug logging on stderr";

/// Parse arguments, program name excluded
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<HarnessOptions, String> {
    let mut options = HarnessOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dir" => {
                let value = args.next().ok_or("--dir requires an argument")?;
                options.dir = Some(PathBuf::from(value));
            }
            "--config" => {
                let value = args.next().ok_or("--config requires an argument")?;
                options.config = Some(PathBuf::from(value));
            }
            "--verbose" | "-v" => options.verbose = true,
            "--help" | "-h" => return Err(USAGE.to_string()),
            other => return Err(format!("Unknown option: {}\n\n{}", other, USAGE)),
        }
    }

    Ok(options)
}

/// Entry point for the harness binary; returns the process exit code
pub fn cli_main() -> Result<i32, String> {
    let options = parse_args(std::env::args().skip(1))?;

    let mut config = match &options.config {
        Some(path) => BridgeConfig::from_file(path),
        None => BridgeConfig::load(),
    }
    .map_err(|e| e.to_string())?;
    if let Some(dir) = &options.dir {
        config.dir_reader.path = dir.clone();
    }

    let mut log_config = LogConfig::from_section(&config.logging).map_err(|e| e.to_string())?;
    if options.verbose {
        log_config = log_config.with_level(Level::DEBUG).with_span_events(true);
    }
    init_logging(log_config);

    let reports = run_checks(&config.dir_reader.path);
    for report in &reports {
        let status = if report.passed { "ok  " } else { "FAIL" };
        println!("{} {}: {}", status, report.entry, report.detail);
    }

    let failed = reports.iter().filter(|r| !r.passed).count();
    info!(checks = reports.len(), failed, "Harness finished");

    Ok(if failed == 0 { 0 } else { 1 })
}
