use crate::error::TrainingResult;
use std::path::{Path, PathBuf};

/// Files written by `prepare` inside an output directory.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn train_path(&self) -> PathBuf {
        self.root.join("train.jsonl")
    }

    #[must_use]
    pub fn validation_path(&self) -> PathBuf {
        self.root.join("validation.jsonl")
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn ensure_dirs(&self) -> TrainingResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}
