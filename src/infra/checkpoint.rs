// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Writes a snapshot after every epoch and restores one to resume
// training.
//
// Everything is keyed on a destination prefix, e.g. models/nvidia:
//
//   models/
//     nvidia_16.mpk              ← weights after epoch 16
//     nvidia_16.json             ← architecture used for those weights
//     nvidia_17.mpk
//     nvidia_17.json
//     ...
//     nvidia_latest.json         ← { "epoch": 17, "best_epoch": 16 }
//     nvidia_train_config.json   ← full run configuration
//
// Weights and architecture are saved side by side because the
// weights alone cannot rebuild the model: loading a record needs a
// freshly initialised model of exactly the same shape.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack
//   - Stores them at half precision
//   - Type-safe: loading fails if the architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{SteeringModel, SteeringModelConfig};

/// Contents of `<prefix>_latest.json`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    pub epoch:      usize,
    pub best_epoch: Option<usize>,
}

pub struct CheckpointManager {
    /// Destination prefix, e.g. models/nvidia
    prefix: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the prefix's
    /// parent directory if needed.
    pub fn new(prefix: impl Into<PathBuf>) -> Result<Self> {
        let prefix = prefix.into();
        if let Some(dir) = prefix.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        }
        Ok(Self { prefix })
    }

    /// Path stem of the snapshot for `epoch` (no extension)
    pub fn snapshot_stem(&self, epoch: usize) -> PathBuf {
        self.sibling(&format!("_{epoch}"))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.prefix.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Save weights and architecture for `epoch`, then move the
    /// latest pointer.
    pub fn save_epoch<B: Backend>(
        &self,
        model:      &SteeringModel<B>,
        model_cfg:  &SteeringModelConfig,
        epoch:      usize,
        best_epoch: Option<usize>,
    ) -> Result<PathBuf> {
        let stem = self.snapshot_stem(epoch);

        // Recorder appends its own .mpk extension
        CompactRecorder::new()
            .record(model.clone().into_record(), stem.clone())
            .with_context(|| format!("Failed to save weights to '{}'", stem.display()))?;

        write_json(&with_suffix(&stem, ".json"), model_cfg)?;

        write_json(
            &self.sibling("_latest.json"),
            &LatestSnapshot { epoch, best_epoch },
        )?;

        tracing::debug!("Saved snapshot '{}'", stem.display());
        Ok(stem)
    }

    /// Read the latest pointer, if a run has saved one.
    pub fn latest(&self) -> Result<Option<LatestSnapshot>> {
        let path = self.sibling("_latest.json");
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.sibling("_train_config.json");
        write_json(&path, cfg)?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

/// Rebuild a model from a snapshot stem such as `models/nvidia_15`:
/// reads `<stem>.json` for the architecture and `<stem>.mpk` for
/// the weights.
pub fn load_snapshot<B: Backend>(
    stem:   &Path,
    device: &B::Device,
) -> Result<(SteeringModel<B>, SteeringModelConfig)> {
    let model_cfg = load_snapshot_config(stem)?;

    let record = CompactRecorder::new()
        .load(stem.to_path_buf(), device)
        .with_context(|| format!("Cannot load weights for snapshot '{}'", stem.display()))?;

    tracing::info!("Resumed {} model from '{}'", model_cfg.architecture, stem.display());
    Ok((model_cfg.init::<B>(device).load_record(record), model_cfg))
}

/// Read only the architecture half of a snapshot.
pub fn load_snapshot_config(stem: &Path) -> Result<SteeringModelConfig> {
    read_json(&with_suffix(stem, ".json"))
        .with_context(|| format!("Cannot read architecture for snapshot '{}'", stem.display()))
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::Architecture;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_snapshot_paths_follow_prefix() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("models/nvidia")).unwrap();
        assert!(dir.path().join("models").is_dir());
        assert_eq!(ckpt.snapshot_stem(16), dir.path().join("models/nvidia_16"));
    }

    #[test]
    fn test_save_and_resume_round_trip() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path().join("comma")).unwrap();

        let cfg   = SteeringModelConfig::new(Architecture::Comma);
        let model: SteeringModel<TestBackend> = cfg.init(&device);
        let stem  = ckpt.save_epoch(&model, &cfg, 3, Some(2)).unwrap();

        assert!(with_suffix(&stem, ".json").exists());
        assert!(with_suffix(&stem, ".mpk").exists());
        assert_eq!(
            ckpt.latest().unwrap(),
            Some(LatestSnapshot { epoch: 3, best_epoch: Some(2) })
        );

        let (restored, restored_cfg) = load_snapshot::<TestBackend>(&stem, &device).unwrap();
        assert_eq!(restored_cfg.architecture, Architecture::Comma);
        assert_eq!(restored.num_params(), model.num_params());

        let images = Tensor::<TestBackend, 4>::ones([1, 3, 66, 200], &device) * 128.0;
        let a = model.forward(images.clone()).into_data().to_vec::<f32>().unwrap();
        let b = restored.forward(images).into_data().to_vec::<f32>().unwrap();
        // CompactRecorder stores half precision
        assert!((a[0] - b[0]).abs() < 5e-2 * a[0].abs().max(1.0));
    }

    #[test]
    fn test_train_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("nvidia")).unwrap();
        let cfg  = TrainConfig { epochs: 20, lr: 1e-4, ..TrainConfig::default() };

        ckpt.save_train_config(&cfg).unwrap();
        assert!(dir.path().join("nvidia_train_config.json").exists());

        let back: TrainConfig = read_json(&dir.path().join("nvidia_train_config.json")).unwrap();
        assert_eq!(back.epochs, 20);
        assert_eq!(back.lr, 1e-4);
    }

    #[test]
    fn test_latest_is_none_before_training() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("fresh")).unwrap();
        assert!(ckpt.latest().unwrap().is_none());
    }

    #[test]
    fn test_missing_snapshot_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let result = load_snapshot::<TestBackend>(&dir.path().join("nope_1"), &device);
        assert!(result.is_err());
    }
}
