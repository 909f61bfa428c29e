//! Argument types shared between main.rs and the commands.

use clap::Args;
use std::path::PathBuf;

/// Run settings; each flag overrides the recipe file.
#[derive(Args, Debug, Clone, Default)]
pub struct RecipeArgs {
    /// Recipe file (defaults to ./gatetune.toml when present)
    #[arg(long)]
    pub recipe: Option<PathBuf>,

    /// Gateway config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Function whose inferences are used
    #[arg(long)]
    pub function: Option<String>,

    /// Metric that selects the curated samples
    #[arg(long)]
    pub metric: Option<String>,

    /// Variant whose templates rebuild the conversations
    #[arg(long)]
    pub variant: Option<String>,

    /// Base model to fine-tune (defaults to the variant's model)
    #[arg(long)]
    pub model: Option<String>,

    /// Feedback threshold for float metrics
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Share of episodes held out for validation
    #[arg(long)]
    pub val_fraction: Option<f64>,

    /// Maximum number of samples to fetch
    #[arg(long)]
    pub max_samples: Option<u64>,

    /// Seed for the episode shuffle
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seconds between job status polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Suffix for the fine-tuned model name
    #[arg(long)]
    pub suffix: Option<String>,

    /// Number of training epochs
    #[arg(long)]
    pub n_epochs: Option<u32>,
}

/// Fine-tuning provider connection and wait limits.
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// Provider base URL (overrides OPENAI_BASE_URL)
    #[arg(long)]
    pub provider_url: Option<String>,

    /// Stop waiting after this many seconds; the remote job keeps running
    #[arg(long, value_name = "SECONDS")]
    pub max_wait: Option<u64>,
}
