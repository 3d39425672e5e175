// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Resolve the architecture    (Layer 5 / 6 on resume)
//   Step 2: Load features + labels      (Layer 4 - data)
//   Step 3: Crop / resize frames        (Layer 4 - data)
//   Step 4: Split train/validation      (Layer 4 - data)
//   Step 5: Build generator + pipeline  (Layer 4 - data)
//   Step 6: Save config                 (Layer 6 - infra)
//   Step 7: Run training loop           (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use burn::data::dataset::Dataset;

use crate::data::{
    augment::{AugmentPipeline, RandomBrightness, RandomTranslate},
    dataset::SteeringDataset,
    generator::TrainGenerator,
    loader::NpyLoader,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::traits::FrameSource;
use crate::infra::{
    checkpoint::{load_snapshot_config, CheckpointManager},
    metrics::MetricsLogger,
};
use crate::ml::model::{Architecture, SteeringModelConfig};
use crate::ml::trainer::{run_training, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Serialisable so every run leaves
// a record of exactly how its snapshots were produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub features:          String,
    pub labels:            String,
    pub destfile:          String,
    pub architecture:      Architecture,
    pub batch_size:        usize,
    pub epochs:            usize,
    pub samples_per_epoch: usize,
    pub val_samples:       usize,
    pub val_fraction:      f64,
    pub lr:                f64,
    pub seed:              Option<u64>,
    pub skip_validate:     bool,
    pub resume:            Option<PathBuf>,
    pub start_epoch:       usize,
    pub crop_rows:         Option<(u32, u32)>,
    pub flip_half:         bool,
    pub brightness:        bool,
    pub translate:         bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            features:          "data/np_data/udacity_final_images.npy".to_string(),
            labels:            "data/np_data/udacity_angles.npy".to_string(),
            destfile:          "models/nvidia".to_string(),
            architecture:      Architecture::Nvidia,
            batch_size:        128,
            epochs:            5,
            samples_per_epoch: 43394,
            val_samples:       800,
            val_fraction:      0.1,
            lr:                1e-3,
            seed:              Some(0),
            skip_validate:     false,
            resume:            None,
            start_epoch:       0,
            crop_rows:         None,
            flip_half:         true,
            brightness:        false,
            translate:         false,
        }
    }
}

impl TrainConfig {
    /// The per-batch augmentation recipe described by this config
    pub fn augment_pipeline(&self) -> AugmentPipeline {
        AugmentPipeline {
            flip_half:  self.flip_half,
            translate:  self.translate.then(RandomTranslate::default),
            brightness: self.brightness.then(RandomBrightness::default),
        }
    }

    fn metrics_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_metrics.csv", self.destfile))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Architecture ──────────────────────────────────────────────
        // A resumed run must keep the snapshot's architecture, whatever
        // --arch says, or the weights will not fit.
        let model_cfg = match &cfg.resume {
            Some(stem) => {
                let restored = load_snapshot_config(stem)?;
                if restored.architecture != cfg.architecture {
                    tracing::warn!(
                        "Snapshot '{}' is a {} model; ignoring --arch {}",
                        stem.display(),
                        restored.architecture,
                        cfg.architecture,
                    );
                }
                restored
            }
            None => SteeringModelConfig::new(cfg.architecture),
        };

        // ── Step 2: Load .npy arrays ──────────────────────────────────────────
        let loader = NpyLoader::new(&cfg.features, &cfg.labels);
        let frames = loader
            .load_all()
            .with_context(|| format!("Loading dataset '{}'", cfg.features))?;

        // ── Step 3: Crop / resize to the model input ──────────────────────────
        let preprocessor = Preprocessor::new(
            cfg.crop_rows,
            model_cfg.input_width as u32,
            model_cfg.input_height as u32,
        );
        let frames = preprocessor.process_all(frames)?;

        let all = SteeringDataset::new(frames);
        if let Some((w, h)) = all.frame_dimensions() {
            tracing::info!("Loaded {} frames at {}x{}", all.len(), w, h);
        }
        if let Some(s) = all.angle_stats() {
            tracing::info!(
                "Angles: min={:.3} max={:.3} mean={:.4} zero={:.1}%",
                s.min, s.max, s.mean, s.zero_fraction * 100.0,
            );
        }

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (train_frames, val_frames) = split_train_val(
            all.into_frames(),
            1.0 - cfg.val_fraction,
            cfg.seed,
        );
        tracing::info!(
            "Split: {} train, {} validation",
            train_frames.len(),
            val_frames.len()
        );

        let val_dataset = SteeringDataset::new(val_frames);
        let val_dataset = if val_dataset.frames().is_empty() {
            if !cfg.skip_validate {
                tracing::warn!("Validation split is empty; training without validation");
            }
            None
        } else {
            Some(val_dataset)
        };

        // ── Step 5: Augmenting generator ──────────────────────────────────────
        let pipeline = cfg.augment_pipeline();
        tracing::info!("Augmentation: {}", pipeline.describe());
        let mut train_gen = TrainGenerator::new(
            SteeringDataset::new(train_frames),
            cfg.batch_size,
            cfg.samples_per_epoch,
            pipeline,
            cfg.seed,
        )?;

        // ── Step 6: Save config for later reference ───────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.destfile)?;
        if let Some(prev) = ckpt_manager.latest()? {
            if cfg.start_epoch < prev.epoch {
                tracing::warn!(
                    "'{}' already has snapshots up to epoch {} (best {}); epochs from {} will be overwritten",
                    cfg.destfile,
                    prev.epoch,
                    prev.best_epoch.map_or_else(|| "unknown".to_string(), |e| e.to_string()),
                    cfg.start_epoch + 1,
                );
            }
        }
        ckpt_manager.save_train_config(cfg)?;
        let metrics = MetricsLogger::new(cfg.metrics_path())?;
        tracing::info!("Logging epoch losses to '{}'", metrics.csv_path().display());

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(
            cfg,
            model_cfg,
            &mut train_gen,
            val_dataset.as_ref(),
            &ckpt_manager,
            &metrics,
        )
    }
}
