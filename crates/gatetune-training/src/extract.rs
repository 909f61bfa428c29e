//! Feedback-filtered sample extraction.
//!
//! Selects inferences of one function whose latest feedback for a metric
//! passes the threshold. Feedback is ranked per target by timestamp (feedback
//! id breaks ties, so the surviving row is reproducible) and only rank 1 is
//! joined to the inference rows.

use crate::config::FunctionType;
use crate::dataset::RawSample;
use crate::error::{TrainingError, TrainingResult};
use crate::metric::{Comparator, MetricDefinition, MetricLevel, MetricType};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A parameterized query against the analytical store.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleQuery {
    pub sql: String,
    pub params: BTreeMap<&'static str, String>,
    pub comparison_operator: Comparator,
}

/// Source of stored inference samples.
#[async_trait]
pub trait SampleStore: Send + Sync {
    async fn query_samples(&self, query: &SampleQuery) -> TrainingResult<Vec<RawSample>>;
}

/// What to extract.
#[derive(Debug, Clone)]
pub struct ExtractRequest<'a> {
    pub function_name: &'a str,
    pub function_type: FunctionType,
    pub metric_name: &'a str,
    pub metric: MetricDefinition,
    pub threshold: f64,
    pub max_samples: u64,
}

#[must_use]
pub fn inference_table(function_type: FunctionType) -> &'static str {
    match function_type {
        FunctionType::Chat => "ChatInference",
        FunctionType::Json => "JsonInference",
    }
}

#[must_use]
pub fn feedback_table(metric_type: MetricType) -> &'static str {
    match metric_type {
        MetricType::Float => "FloatMetricFeedback",
        MetricType::Boolean => "BooleanMetricFeedback",
    }
}

/// Inference column the feedback's `target_id` refers to.
#[must_use]
pub fn join_key(level: MetricLevel) -> &'static str {
    match level {
        MetricLevel::Episode => "episode_id",
        MetricLevel::Inference => "id",
    }
}

pub fn build_query(request: &ExtractRequest<'_>) -> TrainingResult<SampleQuery> {
    if request.max_samples == 0 {
        return Err(TrainingError::InvalidSetting("max_samples must be >= 1".to_string()));
    }
    if !request.threshold.is_finite() {
        return Err(TrainingError::InvalidSetting(format!(
            "threshold must be finite, got {}",
            request.threshold
        )));
    }

    let comparator = request.metric.comparator();
    let threshold = request.metric.effective_threshold(request.threshold);
    if request.metric.metric_type == MetricType::Boolean {
        debug!(
            requested = request.threshold,
            effective = threshold,
            "Boolean metric: threshold replaced by the preferred value"
        );
    }

    let sql = format!(
        "SELECT
    i.variant_name AS variant_name,
    i.input AS input,
    i.output AS output,
    f.value AS value,
    toString(i.episode_id) AS episode_id
FROM {inference_table} AS i
INNER JOIN (
    SELECT target_id, value
    FROM (
        SELECT
            target_id,
            value,
            ROW_NUMBER() OVER (PARTITION BY target_id ORDER BY timestamp DESC, id DESC) AS rn
        FROM {feedback_table}
        WHERE metric_name = {{metric_name:String}}
          AND value {op} {{threshold:Float64}}
    )
    WHERE rn = 1
) AS f ON i.{join_key} = f.target_id
WHERE i.function_name = {{function_name:String}}
LIMIT {{max_samples:UInt64}}
FORMAT JSONEachRow",
        inference_table = inference_table(request.function_type),
        feedback_table = feedback_table(request.metric.metric_type),
        join_key = join_key(request.metric.level),
        op = comparator.as_sql(),
    );

    let params = BTreeMap::from([
        ("function_name", request.function_name.to_string()),
        ("metric_name", request.metric_name.to_string()),
        ("threshold", threshold.to_string()),
        ("max_samples", request.max_samples.to_string()),
    ]);

    Ok(SampleQuery { sql, params, comparison_operator: comparator })
}

/// Fetch the samples for `request` from `store`.
///
/// Rows that do not pass the metric filter mean the store and the query
/// disagree; that aborts the run rather than training on them.
pub async fn extract(store: &dyn SampleStore, request: &ExtractRequest<'_>) -> TrainingResult<Vec<RawSample>> {
    let query = build_query(request)?;
    info!(
        function = request.function_name,
        metric = request.metric_name,
        comparison = %query.comparison_operator,
        max_samples = request.max_samples,
        "Querying curated samples"
    );

    let samples = store.query_samples(&query).await?;

    for sample in &samples {
        if !request.metric.passes(&sample.feedback_value, request.threshold) {
            return Err(TrainingError::structural(
                sample.label(),
                format!(
                    "feedback value {} does not satisfy {} {}",
                    sample.feedback_value,
                    query.comparison_operator,
                    request.metric.effective_threshold(request.threshold)
                ),
            ));
        }
    }

    info!(count = samples.len(), "Fetched samples");
    Ok(samples)
}
