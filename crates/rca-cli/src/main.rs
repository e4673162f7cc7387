//! `rca` command-line runner: analyze, gate-check and ingest over a JSON store bundle

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rca_core::prelude::*;
use rca_core::{build_training_record, run_gate_check};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let store_arg = Arg::new("store")
        .long("store")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON store bundle holding reports and linked summaries");

    Command::new("rca")
        .version(rca_core::VERSION)
        .about("Root-cause forensic analysis for recorded failure reports")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("analyze")
                .about("Analyze one failure report")
                .arg(store_arg.clone())
                .arg(
                    Arg::new("rcr-id")
                        .long("rcr-id")
                        .required(true)
                        .help("Failure report id"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML engine configuration"),
                )
                .arg(
                    Arg::new("skip-learning")
                        .long("skip-learning")
                        .action(ArgAction::SetTrue)
                        .help("Do not emit a learning record"),
                )
                .arg(
                    Arg::new("write-back")
                        .long("write-back")
                        .action(ArgAction::SetTrue)
                        .help("Save the updated bundle back to --store"),
                ),
        )
        .subcommand(
            Command::new("gate-check")
                .about("Check whether a strategic item may be handed off")
                .arg(store_arg.clone())
                .arg(
                    Arg::new("sd-id")
                        .long("sd-id")
                        .required(true)
                        .help("Strategic item id"),
                ),
        )
        .subcommand(
            Command::new("ingest")
                .about("Emit training records for resolved reports as JSON lines")
                .arg(store_arg),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn store_path(args: &ArgMatches) -> Result<&PathBuf> {
    args.get_one::<PathBuf>("store").context("--store is required")
}

fn load_store(path: &Path) -> Result<MemoryStore> {
    MemoryStore::load_bundle(path).with_context(|| format!("loading store bundle {}", path.display()))
}

async fn analyze(args: &ArgMatches) -> Result<ExitCode> {
    let path = store_path(args)?;
    let id = args.get_one::<String>("rcr-id").context("--rcr-id is required")?;
    let config = match args.get_one::<PathBuf>("config") {
        Some(p) => RcaConfig::load(p).with_context(|| format!("loading config {}", p.display()))?,
        None => RcaConfig::default(),
    };
    let options = AnalyzeOptions {
        skip_learning: args.get_flag("skip-learning"),
    };

    let store = Arc::new(load_store(path)?);
    let engine = RcaEngine::new(store.clone(), store.clone()).with_config(config);
    let result = engine.analyze(&ReportId::new(id.as_str()), options).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if args.get_flag("write-back") && !result.is_error() {
        store
            .save_bundle(path)
            .with_context(|| format!("saving store bundle {}", path.display()))?;
        tracing::info!(path = %path.display(), "store bundle updated");
    }

    Ok(if result.is_error() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

async fn gate_check(args: &ArgMatches) -> Result<ExitCode> {
    let store = load_store(store_path(args)?)?;
    let sd_id = args.get_one::<String>("sd-id").context("--sd-id is required")?;
    let result = run_gate_check(&store, sd_id).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn ingest(args: &ArgMatches) -> Result<ExitCode> {
    let bundle = load_store(store_path(args)?)?.to_bundle();
    let now = chrono::Utc::now();

    let mut emitted = 0usize;
    for report in bundle.reports.iter().filter(|r| r.status == ReportStatus::Resolved) {
        println!("{}", serde_json::to_string(&build_training_record(report, now))?);
        emitted += 1;
    }
    tracing::info!(emitted, total = bundle.reports.len(), "training records written");
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("analyze", args)) => analyze(args).await,
        Some(("gate-check", args)) => gate_check(args).await,
        Some(("ingest", args)) => ingest(args),
        _ => unreachable!("subcommand_required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn analyze_requires_store_and_id() {
        assert!(cli().try_get_matches_from(["rca", "analyze", "--rcr-id", "x"]).is_err());
        let m = cli()
            .try_get_matches_from(["rca", "analyze", "--store", "s.json", "--rcr-id", "x", "--skip-learning"])
            .unwrap();
        let (name, args) = m.subcommand().unwrap();
        assert_eq!(name, "analyze");
        assert!(args.get_flag("skip-learning"));
        assert!(!args.get_flag("write-back"));
    }

    #[test]
    fn log_json_is_global() {
        let m = cli()
            .try_get_matches_from(["rca", "gate-check", "--store", "s.json", "--sd-id", "SD-1", "--log-json"])
            .unwrap();
        assert!(m.get_flag("log-json"));
    }

    #[tokio::test]
    async fn analyze_writes_back_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = MemoryStore::new();
        store.insert_report(FailureReport::new("r1", "p", TriggerSource::TestFailure, ScopeType::Prd, 2));
        store.save_bundle(&path).unwrap();

        let m = cli()
            .try_get_matches_from([
                "rca",
                "analyze",
                "--store",
                path.to_str().unwrap(),
                "--rcr-id",
                "r1",
                "--write-back",
            ])
            .unwrap();
        let (_, args) = m.subcommand().unwrap();
        analyze(args).await.unwrap();

        let reloaded = MemoryStore::load_bundle(&path).unwrap();
        let report = reloaded.report(&ReportId::new("r1")).unwrap();
        assert_eq!(report.analysis_attempts, 1);
        assert_eq!(report.status, ReportStatus::InReview);
        assert_eq!(reloaded.learning_records().len(), 1);
    }
}
