//! gatetune CLI - fine-tune a hosted model from curated gateway traffic
//!
//! Extracts inferences whose feedback passes a metric, rebuilds them as chat
//! conversations, splits them by episode, runs a fine-tuning job and prints
//! the gateway config fragments for the resulting model.

mod commands;
mod config;
mod progress;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::types::{ProviderArgs, RecipeArgs};
use commands::{prepare, run, status, wait};

/// gatetune - supervised fine-tuning from gateway feedback
#[derive(Parser, Debug)]
#[command(
    name = "gatetune",
    author,
    version,
    about = "Fine-tune a hosted model on gateway inferences that passed a metric",
    long_about = "Fine-tune a hosted model on gateway inferences that passed a metric.\nSecrets are read from CLICKHOUSE_URL and OPENAI_API_KEY."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full recipe and print config fragments for the new model
    ///
    /// Needs CLICKHOUSE_URL and OPENAI_API_KEY.
    Run {
        #[command(flatten)]
        recipe: RecipeArgs,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Write the fragments here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build train/validation JSONL files locally without fine-tuning
    ///
    /// Needs CLICKHOUSE_URL.
    Prepare {
        #[command(flatten)]
        recipe: RecipeArgs,

        /// Directory for train.jsonl, validation.jsonl and manifest.json
        #[arg(short, long, default_value = "dataset")]
        output_dir: PathBuf,

        /// Print the manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Wait on a submitted job and print its config fragments
    ///
    /// Needs OPENAI_API_KEY.
    Wait {
        /// Fine-tuning job id
        job_id: String,

        #[command(flatten)]
        recipe: RecipeArgs,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Write the fragments here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the current status of a fine-tuning job
    ///
    /// Needs OPENAI_API_KEY.
    Status {
        /// Fine-tuning job id
        job_id: String,

        /// Provider base URL (overrides OPENAI_BASE_URL)
        #[arg(long)]
        provider_url: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Run { recipe, provider, output } => run::execute(recipe, provider, output).await,
        Command::Prepare { recipe, output_dir, json } => prepare::execute(recipe, output_dir, json).await,
        Command::Wait { job_id, recipe, provider, output } => {
            wait::execute(job_id, recipe, provider, output).await
        }
        Command::Status { job_id, provider_url, json } => {
            status::execute(job_id, ProviderArgs { provider_url, max_wait: None }, json).await
        }
    }
}
