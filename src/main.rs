//! rgscout - ripgrep driven file finder
//!
//! Command-line usage:
//!   rgscout search [pattern] [--dir DIR] [--types "*.rs;*.toml"] [--regex]
//!   rgscout export [pattern] --output FILE
//!   rgscout version
//!   rgscout config [--rg PATH] [--dir DIR]

use anyhow::{Context, Result};
use clap::Parser;
use rgscout::cli::{Cli, Commands, QueryArgs, Settings};
use rgscout::export::{ExportJob, ExportOutcome};
use rgscout::search::{ProcessOutcome, SearchSession};
use rgscout::version::{meets_recommended_version, probe_version, RECOMMENDED_MAJOR_VERSION};
use rgscout::{logging, ResultEntry};
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_file.as_deref(), cli.verbose) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::load(cli.config);

    match cli.command {
        Commands::Search { query, json } => run_search(&mut settings, &query, json).await,
        Commands::Export { query, output } => run_export(&mut settings, &query, output).await,
        Commands::Version { rg } => run_version(&mut settings, rg).await,
        Commands::Config { rg, dir } => run_config(&mut settings, rg, dir),
    }
}

async fn run_search(settings: &mut Settings, args: &QueryArgs, json: bool) -> Result<ExitCode> {
    let tool = settings.resolve_tool(args.rg.as_deref())?;
    let directory = settings.resolve_directory(args.dir.as_deref())?;
    let query = args.to_query(directory);

    let mut session = SearchSession::new(tool);
    session.start(&query).context("failed to start search")?;
    eprintln!("{}", ProcessOutcome::RunningStillActive.status_message(0));

    let stop = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Ctrl-C received, stopping search"),
            Err(e) => {
                log::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await
            }
        }
    };
    let outcome = session
        .wait_or_cancel(stop)
        .await
        .or(session.outcome())
        .unwrap_or(ProcessOutcome::Crashed);

    print_results(session.results().entries(), json)?;
    eprintln!("{}", session.status_message());

    Ok(match outcome {
        ProcessOutcome::CompletedWithMatches => ExitCode::SUCCESS,
        ProcessOutcome::CompletedNoMatches => ExitCode::from(1),
        _ => ExitCode::from(2),
    })
}

fn print_results(entries: &[ResultEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
    } else {
        for entry in entries {
            println!("{}\t{}", entry.name, entry.directory);
        }
    }
    Ok(())
}

async fn run_export(settings: &mut Settings, args: &QueryArgs, output: PathBuf) -> Result<ExitCode> {
    let tool = settings.resolve_tool(args.rg.as_deref())?;
    let directory = settings.resolve_directory(args.dir.as_deref())?;
    let job = ExportJob::new(tool, args.to_query(directory), &output);

    eprintln!("Exporting, please wait...");
    let report = job.spawn().await.context("export failed")?;

    match report.outcome() {
        ExportOutcome::Success => {
            println!("Search results exported to {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        ExportOutcome::Failure(_) => {
            eprintln!("Export failed: ripgrep reported an error, or the file is missing or empty");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_version(settings: &mut Settings, rg: Option<PathBuf>) -> Result<ExitCode> {
    let tool = settings.resolve_tool(rg.as_deref())?;
    let version = probe_version(&tool).await?;

    println!("{}", version);
    if !meets_recommended_version(&version) {
        eprintln!(
            "ripgrep {}.0 or newer is recommended for the best experience",
            RECOMMENDED_MAJOR_VERSION
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_config(settings: &mut Settings, rg: Option<PathBuf>, dir: Option<PathBuf>) -> Result<ExitCode> {
    if let Some(rg) = rg {
        settings.resolve_tool(Some(&rg))?;
    }
    if let Some(dir) = dir {
        settings.resolve_directory(Some(&dir))?;
    }

    println!("# {}", settings.path.display());
    println!("{}", serde_json::to_string_pretty(&settings.config)?);
    Ok(ExitCode::SUCCESS)
}
