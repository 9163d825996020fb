//! nas - needs assessment administration tool
//!
//! Runs validation, correction and reporting against a bundle file and
//! prints the result as JSON (or audit text for `diff`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nas_cli::{describe, read_response, write_json, Bundle, Workspace};
use nas_common::config::{ConfigOverrides, ServiceConfig};
use nas_common::Precondition;
use serde::Serialize;
use tracing::{debug, error, info};

/// Command-line arguments for nas
#[derive(Parser, Debug)]
#[command(name = "nas")]
#[command(about = "Needs assessment administration tool")]
#[command(version)]
struct Args {
    /// Bundle file with forms, submissions and corrections
    #[arg(short, long, env = "NAS_BUNDLE")]
    bundle: PathBuf,

    /// Base URL of resource URIs (overrides NAS_ENDPOINT and config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Log filter (overrides NAS_LOG_LEVEL and config file)
    #[arg(long)]
    log_level: Option<String>,

    /// Config file (overrides NAS_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a response against a form
    Validate {
        #[arg(long)]
        form: String,
        /// JSON file holding the response
        #[arg(long)]
        response: PathBuf,
    },
    /// Show the current response and version of a submission
    Current { submission: String },
    /// Show everything corrected since submission as audit text
    Diff { submission: String },
    /// Check a correction and print the record to append to the bundle
    Correct {
        submission: String,
        /// Version the correction supersedes
        #[arg(long)]
        if_match: Option<String>,
        /// JSON file holding the corrected answers
        #[arg(long)]
        response: PathBuf,
        #[arg(long)]
        author: String,
    },
    /// Summarise the current responses of a form
    Report {
        form: String,
        /// Filter as section.question=value, repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Comma separated section.question list
        #[arg(long)]
        group_by: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match ServiceConfig::resolve(&ConfigOverrides {
        endpoint: args.endpoint.clone(),
        log_level: args.log_level.clone(),
        config_file: args.config.clone(),
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting nas v{}", env!("CARGO_PKG_VERSION"));
    debug!(endpoint = %config.endpoint, bundle = %args.bundle.display(), "Configuration resolved");

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("Error: {}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: ServiceConfig) -> Result<()> {
    let bundle = Bundle::load(&args.bundle)?;
    let mut workspace = Workspace::open(bundle, config.endpoint, config.event_capacity).await?;

    match args.command {
        Command::Validate { form, response } => {
            let report = workspace.validate(&form, &read_response(&response)?).await?;
            print_json(&report)?;
            if !report.valid {
                anyhow::bail!("Response is not valid");
            }
        }
        Command::Current { submission } => {
            print_json(&workspace.current(&submission).await?)?;
        }
        Command::Diff { submission } => {
            print!("{}", workspace.diff_text(&submission).await?);
        }
        Command::Correct {
            submission,
            if_match,
            response,
            author,
        } => {
            let precondition = Precondition::parse(if_match.as_deref());
            let id = workspace
                .correct(&submission, read_response(&response)?, &precondition, &author)
                .await
                .map_err(|e| {
                    if let Some(nas_common::Error::InvalidResponse(report)) =
                        e.downcast_ref::<nas_common::Error>()
                    {
                        if let Err(print_err) = print_json(report) {
                            error!("Failed to print validation report: {:#}", print_err);
                        }
                    }
                    e
                })?;
            let record = workspace.bundle.corrections.iter().find(|r| r.id == id);
            print_json(&serde_json::json!({
                "uri": workspace.service.endpoint().correction_uri(&id),
                "correction": record,
                "version": workspace.current(&submission).await?.version,
            }))?;
        }
        Command::Report {
            form,
            filters,
            group_by,
        } => {
            print_json(&workspace.report(&form, &filters, group_by.as_deref()).await?)?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    write_json(std::io::stdout().lock(), value)
}
