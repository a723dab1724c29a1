//! Command-line interface.
//!
//! Every command accepts the global `--json` flag and renders its result
//! through [`output::CommandOutput`].

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{
    init::InitArgs,
    pipeline::{StatusArgs, SubmitArgs},
    score::ScoreArgs,
    thesis::ThesisArgs,
    work::WorkArgs,
};

#[derive(Parser, Debug)]
#[command(name = "diligence")]
#[command(about = "Due-diligence scan pipeline with thesis-aligned confidence scoring", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of `.diligence/`
    #[arg(short, long, global = true, env = "DILIGENCE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write default configuration and create the queue database
    Init(InitArgs),

    /// Submit a company for scanning
    Submit(SubmitArgs),

    /// Show the status of a job
    Status(StatusArgs),

    /// Show job counts for both pipeline queues
    Metrics,

    /// Score an evidence file against a thesis
    Score(ScoreArgs),

    /// Inspect thesis profiles
    Thesis(ThesisArgs),

    /// Run evidence and report workers against the queue database
    Work(WorkArgs),
}

/// Print a command error and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain.get(1..).unwrap_or_default(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
