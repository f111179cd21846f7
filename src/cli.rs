//! Command-line interface.
//!
//! `elenchus [options] <subject>` explores a registered subject and
//! writes the constraint tree and a machine-readable summary into the
//! log folder.

use std::fs::{self, File};
use std::path::PathBuf;

use clap::Parser;

use crate::error::{ExploreError, ExploreResult};
use crate::explore::ExplorationEngine;
use crate::invocation::FunctionInvocation;
use crate::solver::SolverKind;
use crate::subjects;

#[derive(Parser)]
#[command(name = "elenchus")]
#[command(about = "Concolic test-input generation for scalar functions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Registered subject function to explore
    pub subject: String,

    /// Maximum number of concrete executions (0 = run until the
    /// worklist drains)
    #[arg(short = 'm', long = "max-iters", default_value_t = 5)]
    pub max_iters: u32,

    /// Write a DOT snapshot of the constraint tree after every execution
    #[arg(short = 'g', long = "graph")]
    pub graph: bool,

    /// Directory for DOT files and the run summary
    #[arg(short = 'f', long = "folder", default_value = "logs")]
    pub folder: PathBuf,

    /// Use the Z3 backend (the default)
    #[arg(long = "z3", conflicts_with = "cvc")]
    pub z3: bool,

    /// Use the CVC backend (drives a cvc5 binary)
    #[arg(long = "cvc")]
    pub cvc: bool,

    /// Save log output to a file instead of stderr
    #[arg(short = 'l', long = "log")]
    pub log: Option<PathBuf>,
}

impl Cli {
    pub fn solver(&self) -> SolverKind {
        if self.cvc {
            SolverKind::Cvc
        } else {
            SolverKind::Z3
        }
    }
}

pub fn run_cli() -> ExploreResult<()> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> ExploreResult<()> {
    init_logging(cli.log.as_ref())?;

    let subject = subjects::builtin(&cli.subject).ok_or_else(|| {
        eprintln!("available subjects: {}", subjects::names().join(", "));
        ExploreError::unknown_subject(&cli.subject)
    })?;

    fs::create_dir_all(&cli.folder)?;

    println!("Exploring {} with {}", subject.name, cli.solver());
    let mut engine =
        ExplorationEngine::new(FunctionInvocation::new(subject.clone()), cli.solver())
            .capture_dot(cli.graph);
    let report = engine.explore(cli.max_iters);

    for (i, (inputs, outcome)) in report
        .generated_inputs
        .iter()
        .zip(report.execution_return_values.iter())
        .enumerate()
    {
        let rendered: Vec<String> = inputs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        println!("  [{}] {} -> {}", i + 1, rendered.join(", "), outcome);
    }
    println!(
        "Condition Coverage using DSE: {}/{} ({:.2}%)",
        report.covered_conditions,
        report.total_conditions,
        report.coverage_percent()
    );

    if let Some(expected) = subject.expected {
        let got: std::collections::HashSet<_> = report
            .execution_return_values
            .iter()
            .filter_map(|o| o.returned())
            .cloned()
            .collect();
        let want: std::collections::HashSet<_> = expected().into_iter().collect();
        let verdict = if got == want { "PASS" } else { "FAIL" };
        println!("Expected-result check: {}", verdict);
    }

    fs::write(cli.folder.join("exploration.dot"), &report.dot)?;
    if cli.graph {
        for (i, dot) in report.dot_snapshots.iter().enumerate() {
            fs::write(cli.folder.join(format!("iteration_{}.dot", i + 1)), dot)?;
        }
    }
    let summary = serde_json::to_string_pretty(&report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(cli.folder.join("summary.json"), summary)?;

    Ok(())
}

fn init_logging(logfile: Option<&PathBuf>) -> ExploreResult<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = logfile {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    // A second engine in the same process keeps the first logger.
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_writes_dot_and_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let folder = dir.path().join("logs");
        let cli = Cli {
            subject: "compare".to_string(),
            max_iters: 5,
            graph: true,
            folder: folder.clone(),
            z3: true,
            cvc: false,
            log: None,
        };

        run_with(cli).expect("exploration succeeds");

        assert!(folder.join("exploration.dot").exists());
        assert!(folder.join("iteration_1.dot").exists());
        let summary = std::fs::read_to_string(folder.join("summary.json")).expect("summary");
        let parsed: serde_json::Value = serde_json::from_str(&summary).expect("valid json");
        assert!(parsed["generated_inputs"].is_array());
    }

    #[test]
    fn unknown_subject_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cli = Cli {
            subject: "missing".to_string(),
            max_iters: 5,
            graph: false,
            folder: dir.path().join("logs"),
            z3: false,
            cvc: false,
            log: None,
        };

        match run_with(cli) {
            Err(ExploreError::UnknownSubject { name }) => assert_eq!(name, "missing"),
            other => panic!("expected UnknownSubject, got {:?}", other.map(|_| ())),
        }
    }
}
