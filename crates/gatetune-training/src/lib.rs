//! Gatetune Training
//!
//! Supervised fine-tuning from gateway traffic:
//! - Extracting inferences whose latest feedback passes a metric threshold
//! - Rebuilding training conversations from variant templates
//! - Splitting by episode so no session leaks across train and validation
//! - Driving a hosted fine-tuning job and emitting gateway config for the result

pub mod artifacts;
pub mod clickhouse;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod fragment;
pub mod job;
pub mod layout;
pub mod metric;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod reconstruct;
pub mod settings;
pub mod split;
pub mod template;

pub use artifacts::{ArtifactKind, DatasetArtifact, DatasetManifest, write_dataset};
pub use clickhouse::ClickHouseStore;
pub use config::{FunctionType, GatewayConfig, VariantConfig};
pub use dataset::{Conversation, DatasetId, RawSample, RenderedMessage, Role};
pub use error::{TemplateError, TrainingError, TrainingResult};
pub use extract::{ExtractRequest, SampleQuery, SampleStore};
pub use fragment::ConfigFragments;
pub use job::{FineTuneHyperParams, FineTuneJob, FineTuneRequest, JobStatus};
pub use layout::DatasetLayout;
pub use metric::{Comparator, FeedbackValue, MetricDefinition, MetricLevel, MetricType, Optimize};
pub use openai::OpenAIFineTuning;
pub use orchestrator::Orchestrator;
pub use pipeline::{RunOutcome, prepare_dataset, resume, run};
pub use progress::{ProgressEvent, ProgressSink, TracingProgressSink};
pub use provider::FineTuneProvider;
pub use settings::{RecipeSettings, Secrets};
pub use split::{DatasetSplit, Episodic};
pub use template::TemplateSet;
