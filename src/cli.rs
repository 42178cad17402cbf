//! Command line entry points.
//!
//! Without a subcommand the binary serves HTTP and runs the workers. The
//! other commands are one-shot operator tools against the same database.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use crate::api::error::ServiceError;
use crate::api::job::JobService;
use crate::api::{applications, stats};
use crate::api::AppState;
use crate::domain::IntakeItem;
use crate::error::PipelineError;

/// Automated job-application pipeline.
#[derive(Debug, Parser)]
#[command(name = "job-pilot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn selected(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server and the background workers.
    Serve,

    /// Queue postings from a JSON file holding one object or an array.
    Enqueue {
        file: PathBuf,
    },

    /// Approve the submission waiting on a job.
    Approve {
        job_id: i64,
    },

    /// Reject the submission waiting on a job.
    Reject {
        job_id: i64,
    },

    /// Put an unsubmitted application back on the apply queue.
    Requeue {
        application_id: i64,
    },

    /// List jobs waiting for approval.
    Pending,

    /// Print analytics counts and queue depths.
    Report,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<IntakeItem>),
    One(IntakeItem),
}

pub fn parse_intake(raw: &str) -> Result<Vec<IntakeItem>, PipelineError> {
    match serde_json::from_str(raw) {
        Ok(OneOrMany::Many(items)) => Ok(items),
        Ok(OneOrMany::One(item)) => Ok(vec![item]),
        Err(e) => Err(PipelineError::InvalidInput(format!(
            "expected an intake object or an array of them: {e}"
        ))),
    }
}

async fn read_intake(path: &Path) -> Result<Vec<IntakeItem>, PipelineError> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_intake(&raw)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), ServiceError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

/// Run a one-shot command. `Serve` is handled by `main`.
pub async fn run(command: &Command, state: &AppState) -> Result<(), ServiceError> {
    match command {
        Command::Serve => Ok(()),
        Command::Enqueue { file } => {
            let items = read_intake(file).await?;
            info!("Enqueueing {} postings from {}", items.len(), file.display());
            let service = JobService::new(state.store.clone(), state.raw_jobs.clone());
            let response = service.bulk_enqueue(items).await?;
            print_json(&response)
        }
        Command::Approve { job_id } => {
            state.gate.approve(*job_id).await?;
            println!("Job {job_id} approved");
            Ok(())
        }
        Command::Reject { job_id } => {
            state.gate.reject(*job_id).await?;
            println!("Job {job_id} rejected");
            Ok(())
        }
        Command::Requeue { application_id } => {
            applications::requeue(state, *application_id).await?;
            println!("Application {application_id} requeued");
            Ok(())
        }
        Command::Pending => {
            let tickets = state.gate.pending().await?;
            if tickets.is_empty() {
                println!("No jobs waiting for approval");
                return Ok(());
            }
            print_json(&tickets)
        }
        Command::Report => print_json(&stats::collect(state).await?),
    }
}
