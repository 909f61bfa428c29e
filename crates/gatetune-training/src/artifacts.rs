//! Local dataset files and their manifest.

use crate::dataset::{Conversation, DatasetId, compute_dataset_id, to_jsonl};
use crate::error::{TrainingError, TrainingResult};
use crate::layout::DatasetLayout;
use crate::settings::RecipeSettings;
use crate::split::DatasetSplit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    TrainJsonl,
    ValidationJsonl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub records: usize,
    pub episodes: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub dataset_id: DatasetId,
    pub created_at: DateTime<Utc>,
    pub function_name: Option<String>,
    pub metric_name: Option<String>,
    pub variant_name: Option<String>,
    pub threshold: f64,
    pub val_fraction: f64,
    pub realized_val_fraction: f64,
    pub seed: u64,
    pub artifacts: Vec<DatasetArtifact>,
}

impl DatasetManifest {
    pub fn load(path: &Path) -> TrainingResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub fn sha256_file(path: &Path) -> TrainingResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

fn write_artifact(
    kind: ArtifactKind,
    path: PathBuf,
    conversations: &[Conversation],
    episodes: usize,
) -> TrainingResult<DatasetArtifact> {
    std::fs::write(&path, to_jsonl(conversations)?)?;
    let sha256 = sha256_file(&path)?;
    Ok(DatasetArtifact { kind, path, records: conversations.len(), episodes, sha256 })
}

/// Write both halves of `split` and a manifest describing them.
///
/// The validation file is written even when empty so the directory always
/// has the same shape.
pub fn write_dataset(
    layout: &DatasetLayout,
    split: &DatasetSplit<Conversation>,
    settings: &RecipeSettings,
) -> TrainingResult<DatasetManifest> {
    if split.train.is_empty() {
        return Err(TrainingError::InvalidSetting("refusing to write an empty training set".to_string()));
    }
    layout.ensure_dirs()?;

    let artifacts = vec![
        write_artifact(ArtifactKind::TrainJsonl, layout.train_path(), &split.train, split.train_episodes.len())?,
        write_artifact(
            ArtifactKind::ValidationJsonl,
            layout.validation_path(),
            &split.validation,
            split.validation_episodes.len(),
        )?,
    ];

    let all: Vec<Conversation> = split.train.iter().chain(&split.validation).cloned().collect();
    let manifest = DatasetManifest {
        dataset_id: compute_dataset_id(&all)?,
        created_at: Utc::now(),
        function_name: settings.function_name.clone(),
        metric_name: settings.metric_name.clone(),
        variant_name: settings.variant_name.clone(),
        threshold: settings.threshold,
        val_fraction: settings.val_fraction,
        realized_val_fraction: split.realized_validation_fraction(),
        seed: settings.seed,
        artifacts,
    };

    std::fs::write(layout.manifest_path(), serde_json::to_vec_pretty(&manifest)?)?;
    info!(
        dir = %layout.root().display(),
        dataset_id = %manifest.dataset_id,
        train = split.train.len(),
        validation = split.validation.len(),
        "Wrote dataset"
    );
    Ok(manifest)
}
