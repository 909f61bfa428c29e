//! Metric definitions and the feedback filter derived from them.

use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Boolean,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricLevel {
    Inference,
    Episode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimize {
    Max,
    Min,
}

impl FromStr for MetricType {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(Self::Boolean),
            "float" => Ok(Self::Float),
            other => Err(TrainingError::unsupported("metric type", other)),
        }
    }
}

impl FromStr for MetricLevel {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inference" => Ok(Self::Inference),
            "episode" => Ok(Self::Episode),
            other => Err(TrainingError::unsupported("metric level", other)),
        }
    }
}

impl FromStr for Optimize {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            other => Err(TrainingError::unsupported("metric optimize direction", other)),
        }
    }
}

/// Comparison applied between a feedback value and the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    AtLeast,
    AtMost,
}

impl Comparator {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
        }
    }

    #[must_use]
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::AtLeast => value >= threshold,
            Self::AtMost => value <= threshold,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A typed `[metrics.<name>]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub level: MetricLevel,
    pub optimize: Optimize,
}

impl MetricDefinition {
    #[must_use]
    pub fn comparator(&self) -> Comparator {
        match self.optimize {
            Optimize::Max => Comparator::AtLeast,
            Optimize::Min => Comparator::AtMost,
        }
    }

    /// Threshold actually sent to the warehouse.
    ///
    /// Boolean feedback is stored as 0/1, so a row passes exactly when it holds
    /// the preferred value: `true` when maximizing, `false` when minimizing.
    #[must_use]
    pub fn effective_threshold(&self, requested: f64) -> f64 {
        match (self.metric_type, self.optimize) {
            (MetricType::Float, _) => requested,
            (MetricType::Boolean, Optimize::Max) => 1.0,
            (MetricType::Boolean, Optimize::Min) => 0.0,
        }
    }

    #[must_use]
    pub fn passes(&self, value: &FeedbackValue, requested_threshold: f64) -> bool {
        let threshold = self.effective_threshold(requested_threshold);
        match (self.metric_type, value) {
            (MetricType::Float, FeedbackValue::Float(v)) => self.comparator().holds(*v, threshold),
            (MetricType::Boolean, FeedbackValue::Boolean(b)) => {
                self.comparator().holds(if *b { 1.0 } else { 0.0 }, threshold)
            }
            _ => false,
        }
    }
}

/// A feedback value as returned by the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackValue {
    Boolean(bool),
    Float(f64),
}

impl fmt::Display for FeedbackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}
