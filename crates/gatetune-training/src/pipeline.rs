//! End-to-end driver: extract, reconstruct, split, then fine-tune.

use crate::config::{FunctionType, GatewayConfig, VariantConfig};
use crate::dataset::Conversation;
use crate::error::{TrainingError, TrainingResult};
use crate::extract::{ExtractRequest, SampleStore, extract};
use crate::fragment::ConfigFragments;
use crate::job::{FineTuneJob, FineTuneRequest};
use crate::orchestrator::Orchestrator;
use crate::progress::ProgressSink;
use crate::provider::FineTuneProvider;
use crate::reconstruct::to_conversation;
use crate::settings::RecipeSettings;
use crate::split::{DatasetSplit, split};
use crate::template::TemplateSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything resolved from the gateway config before any remote call.
#[derive(Debug)]
struct Resolved<'a> {
    function_name: &'a str,
    function_type: FunctionType,
    variant: &'a VariantConfig,
    templates: TemplateSet,
}

fn resolve<'a>(config: &'a GatewayConfig, settings: &'a RecipeSettings) -> TrainingResult<Resolved<'a>> {
    settings.validate()?;
    let function_name = settings.function_name()?;
    let function_type = config.function(function_name)?.function_type()?;
    let variant = config.variant(function_name, settings.variant_name()?)?;
    let templates = TemplateSet::load(config, variant)?;
    Ok(Resolved { function_name, function_type, variant, templates })
}

/// Base model to fine-tune: the explicit setting, else the source variant's model.
pub fn base_model<'a>(settings: &'a RecipeSettings, variant: &'a VariantConfig) -> TrainingResult<&'a str> {
    settings
        .model_name
        .as_deref()
        .or(variant.model.as_deref())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            TrainingError::Config("missing setting `model_name` and the variant names no model".to_string())
        })
}

async fn prepare_resolved(
    store: &dyn SampleStore,
    config: &GatewayConfig,
    settings: &RecipeSettings,
    resolved: &Resolved<'_>,
) -> TrainingResult<DatasetSplit<Conversation>> {
    let metric_name = settings.metric_name()?;
    let request = ExtractRequest {
        function_name: resolved.function_name,
        function_type: resolved.function_type,
        metric_name,
        metric: config.metric(metric_name)?,
        threshold: settings.threshold,
        max_samples: settings.max_samples,
    };

    let samples = extract(store, &request).await?;
    if samples.is_empty() {
        return Err(TrainingError::NoSamples {
            function_name: resolved.function_name.to_string(),
            metric_name: metric_name.to_string(),
        });
    }

    let split = split(samples, settings.val_fraction, settings.seed)?;
    info!(
        train_episodes = split.train_episodes.len(),
        validation_episodes = split.validation_episodes.len(),
        train = split.train.len(),
        validation = split.validation.len(),
        requested = settings.val_fraction,
        realized = split.realized_validation_fraction(),
        "Split samples by episode"
    );

    split.try_map(|sample| to_conversation(&sample, resolved.function_type, &resolved.templates))
}

/// Extract, reconstruct and split the curated samples.
pub async fn prepare_dataset(
    store: &dyn SampleStore,
    config: &GatewayConfig,
    settings: &RecipeSettings,
) -> TrainingResult<DatasetSplit<Conversation>> {
    let resolved = resolve(config, settings)?;
    prepare_resolved(store, config, settings, &resolved).await
}

/// Outcome of a completed fine-tuning run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub job: FineTuneJob,
    pub fragments: ConfigFragments,
}

/// Run the whole recipe and return the config fragments for the new model.
pub async fn run(
    store: &dyn SampleStore,
    provider: &dyn FineTuneProvider,
    config: &GatewayConfig,
    settings: &RecipeSettings,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> TrainingResult<RunOutcome> {
    let resolved = resolve(config, settings)?;
    let model = base_model(settings, resolved.variant)?;

    let dataset = prepare_resolved(store, config, settings, &resolved).await?;

    let orchestrator = Orchestrator::new(provider, progress);
    let training_file = orchestrator.upload("train", &dataset.train).await?;
    let validation_file = if dataset.validation.is_empty() {
        info!("Validation set is empty; submitting without a validation file");
        None
    } else {
        Some(orchestrator.upload("validation", &dataset.validation).await?)
    };

    let request = FineTuneRequest {
        training_file,
        validation_file,
        model: model.to_string(),
        suffix: settings.suffix.clone(),
        hyperparameters: settings.hyperparameters.clone(),
    };
    let job = orchestrator.submit(&request).await?;

    finish(&orchestrator, &job.id, resolved.function_name, resolved.variant, settings, cancel).await
}

/// Wait on an already submitted job and build its config fragments.
pub async fn resume(
    provider: &dyn FineTuneProvider,
    config: &GatewayConfig,
    settings: &RecipeSettings,
    job_id: &str,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> TrainingResult<RunOutcome> {
    settings.validate()?;
    let function_name = settings.function_name()?;
    let variant = config.variant(function_name, settings.variant_name()?)?;

    let orchestrator = Orchestrator::new(provider, progress);
    finish(&orchestrator, job_id, function_name, variant, settings, cancel).await
}

async fn finish(
    orchestrator: &Orchestrator<'_>,
    job_id: &str,
    function_name: &str,
    variant: &VariantConfig,
    settings: &RecipeSettings,
    cancel: &CancellationToken,
) -> TrainingResult<RunOutcome> {
    let job = orchestrator.await_terminal(job_id, settings.poll_interval(), cancel).await?;
    let fragments = orchestrator.fragments_for(&job, function_name, variant)?;
    Ok(RunOutcome { job, fragments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawSample;
    use crate::extract::SampleQuery;
    use crate::metric::FeedbackValue;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    const CONFIG: &str = r#"
[metrics.exact_match]
type = "boolean"
level = "inference"
optimize = "max"

[functions.answer]
type = "chat"

[functions.answer.variants.baseline]
type = "chat_completion"
model = "gpt-4o-mini"
"#;

    struct FixedStore {
        rows: Vec<RawSample>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl SampleStore for FixedStore {
        async fn query_samples(&self, _query: &SampleQuery) -> TrainingResult<Vec<RawSample>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.rows.clone())
        }
    }

    fn sample(episode: &str) -> RawSample {
        RawSample {
            variant_name: "baseline".to_string(),
            input: r#"{"messages":[{"role":"user","content":[{"type":"text","value":"hi"}]}]}"#.to_string(),
            output: r#"[{"type":"text","text":"hello"}]"#.to_string(),
            feedback_value: FeedbackValue::Boolean(true),
            episode_id: episode.to_string(),
        }
    }

    fn settings() -> RecipeSettings {
        RecipeSettings {
            function_name: Some("answer".to_string()),
            metric_name: Some("exact_match".to_string()),
            variant_name: Some("baseline".to_string()),
            ..Default::default()
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig::from_toml_str(CONFIG, PathBuf::new()).unwrap()
    }

    #[tokio::test]
    async fn test_prepare_dataset_splits_by_episode() {
        let store = FixedStore {
            rows: (0..10).map(|i| sample(&format!("ep-{}", i % 5))).collect(),
            calls: Mutex::default(),
        };
        let split = prepare_dataset(&store, &config(), &settings()).await.unwrap();

        assert_eq!(split.train_episodes.len(), 4);
        assert_eq!(split.validation_episodes.len(), 1);
        assert_eq!(split.train.len() + split.validation.len(), 10);
        assert_eq!(split.train[0].messages.last().unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_empty_extraction_is_fatal() {
        let store = FixedStore { rows: vec![], calls: Mutex::default() };
        let err = prepare_dataset(&store, &config(), &settings()).await.unwrap_err();
        assert!(matches!(err, TrainingError::NoSamples { .. }));
    }

    #[tokio::test]
    async fn test_bad_settings_fail_before_querying() {
        let store = FixedStore { rows: vec![sample("e")], calls: Mutex::default() };
        let mut bad = settings();
        bad.variant_name = Some("missing".to_string());
        assert!(matches!(
            prepare_dataset(&store, &config(), &bad).await,
            Err(TrainingError::Config(_))
        ));

        let mut bad = settings();
        bad.val_fraction = 1.5;
        assert!(prepare_dataset(&store, &config(), &bad).await.is_err());
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_base_model_falls_back_to_variant() {
        let config = config();
        let variant = config.variant("answer", "baseline").unwrap();
        assert_eq!(base_model(&settings(), variant).unwrap(), "gpt-4o-mini");

        let explicit = RecipeSettings { model_name: Some("gpt-4o".to_string()), ..settings() };
        assert_eq!(base_model(&explicit, variant).unwrap(), "gpt-4o");
    }
}
