// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Generator-driven train + validation loop using Adam and MSE.
//
// Key points:
//   - The TrainGenerator lives across epochs; each epoch draws
//     ceil(samples_per_epoch / batch) batches from it.
//   - model.valid() returns the model on the inner backend, so
//     validation runs without autodiff and with dropout disabled.
//   - Epochs are numbered from start_epoch so a resumed run keeps
//     counting where the previous one stopped; the snapshot after
//     epoch index i is saved as <destfile>_<i + 1>.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use std::path::PathBuf;
use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{SteeringBatch, SteeringBatcher},
    dataset::SteeringDataset,
    generator::{steps_for, TrainGenerator, ValidationGenerator},
};
use crate::infra::{
    checkpoint::{load_snapshot, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{SteeringModel, SteeringModelConfig};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub last_epoch:    usize,
    pub last_snapshot: Option<PathBuf>,
    pub best_epoch:    Option<usize>,
    pub best_val_loss: Option<f64>,
}

/// Build (or resume) the model on the WGPU device and train it.
pub fn run_training(
    cfg:          &TrainConfig,
    model_cfg:    SteeringModelConfig,
    train_gen:    &mut TrainGenerator,
    val_dataset:  Option<&SteeringDataset>,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    let (model, model_cfg) = match &cfg.resume {
        Some(stem) => load_snapshot::<MyBackend>(stem, &device)?,
        None => {
            let model = model_cfg.init::<MyBackend>(&device);
            (model, model_cfg)
        }
    };

    train_loop(cfg, model, &model_cfg, train_gen, val_dataset, ckpt_manager, metrics, &device)
}

#[allow(clippy::too_many_arguments)]
pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    mut model:    SteeringModel<B>,
    model_cfg:    &SteeringModelConfig,
    train_gen:    &mut TrainGenerator,
    val_dataset:  Option<&SteeringDataset>,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
    device:       &B::Device,
) -> Result<TrainSummary> {
    tracing::info!(
        "Model ready: {} architecture, {} parameters",
        model_cfg.architecture,
        model.num_params()
    );

    let mut optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, SteeringModel<B>>();

    let batcher     = SteeringBatcher::new();
    let train_steps = steps_for(cfg.samples_per_epoch, cfg.batch_size);

    tracing::info!(
        "{} batches per epoch, {} per generator pass",
        train_steps,
        train_gen.batches_per_pass()
    );

    let val_dataset = if cfg.skip_validate { None } else { val_dataset };
    if val_dataset.is_none() {
        tracing::info!("Validation disabled for this run");
    }

    let mut summary = TrainSummary {
        last_epoch:    cfg.start_epoch,
        last_snapshot: None,
        best_epoch:    None,
        best_val_loss: None,
    };

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for i in cfg.start_epoch..cfg.start_epoch + cfg.epochs {
        tracing::info!("epoch {}", i);

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for frames in train_gen.by_ref().take(train_steps) {
            let batch: SteeringBatch<B> = batcher.batch(frames, device);
            let (loss, _) = model.forward_loss(batch.images, batch.angles);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let val_loss = match val_dataset {
            Some(ds) => {
                let (loss, batches) = validate::<B>(&model, ds, cfg, device)?;
                tracing::debug!("validation scored {} batches", batches);
                Some(loss)
            }
            None     => None,
        };

        // ── Bookkeeping ───────────────────────────────────────────────────────
        let epoch   = i + 1;
        let metrics_row = EpochMetrics::new(epoch, avg_train_loss, val_loss);
        if metrics_row.is_improvement(summary.best_val_loss) {
            summary.best_val_loss = val_loss;
            summary.best_epoch    = Some(epoch);
        }
        metrics.log(&metrics_row)?;

        let stem = ckpt_manager.save_epoch(&model, model_cfg, epoch, summary.best_epoch)?;

        println!(
            "Epoch {:>3} | batches={} | train_loss={:.5} | val_loss={}",
            epoch,
            train_batches,
            avg_train_loss,
            val_loss.map(|v| format!("{v:.5}")).unwrap_or_else(|| "skipped".to_string()),
        );
        tracing::info!("saved model as {}", stem.display());
        tracing::debug!("generator passes so far: {}", train_gen.passes());

        summary.last_epoch    = epoch;
        summary.last_snapshot = Some(stem);
    }

    tracing::info!("Training complete!");
    Ok(summary)
}

/// Mean validation MSE over ceil(val_samples / batch) sequential
/// batches, and how many batches that was.
fn validate<B: AutodiffBackend>(
    model:   &SteeringModel<B>,
    dataset: &SteeringDataset,
    cfg:     &TrainConfig,
    device:  &B::Device,
) -> Result<(f64, usize)> {
    // model.valid() → SteeringModel<B::InnerBackend>
    let model_valid = model.valid();
    let batcher     = SteeringBatcher::new();
    let generator   = ValidationGenerator::new(dataset, cfg.batch_size, cfg.samples_per_epoch)?;
    let steps       = steps_for(cfg.val_samples, cfg.batch_size);

    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    for frames in generator.take(steps) {
        let batch: SteeringBatch<B::InnerBackend> = batcher.batch(frames, device);
        let predictions = model_valid.forward(batch.images);
        let loss = MseLoss::new().forward(predictions, batch.angles, Reduction::Mean);
        loss_sum += loss.into_scalar().elem::<f64>();
        batches  += 1;
    }

    let mean = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
    Ok((mean, batches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::augment::AugmentPipeline;
    use crate::domain::frame::DrivingFrame;
    use crate::ml::model::Architecture;
    use burn::backend::{Autodiff, NdArray};
    use image::{Rgb, RgbImage};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn frames(n: usize) -> Vec<DrivingFrame> {
        (0..n)
            .map(|i| {
                let shade = (i * 40) as u8;
                let img   = RgbImage::from_pixel(200, 66, Rgb([shade, shade, shade]));
                DrivingFrame::new(img, (i as f32 - 2.0) * 0.1)
            })
            .collect()
    }

    #[test]
    fn test_smoke_training_writes_snapshots() {
        let dir    = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("nvidia");
        let device = Default::default();

        let cfg = TrainConfig {
            batch_size:        2,
            epochs:            2,
            samples_per_epoch: 4,
            val_samples:       2,
            start_epoch:       15,
            destfile:          prefix.to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };

        let mut train_gen = TrainGenerator::new(
            SteeringDataset::new(frames(5)),
            cfg.batch_size,
            cfg.samples_per_epoch,
            AugmentPipeline::default(),
            Some(0),
        ).unwrap();
        let val_dataset = SteeringDataset::new(frames(2));

        let ckpt    = CheckpointManager::new(&prefix).unwrap();
        let metrics = MetricsLogger::new(dir.path().join("nvidia_metrics.csv")).unwrap();

        let model_cfg = SteeringModelConfig::new(Architecture::Nvidia);
        let model     = model_cfg.init::<TestBackend>(&device);

        let summary = train_loop(
            &cfg, model, &model_cfg, &mut train_gen, Some(&val_dataset), &ckpt, &metrics, &device,
        ).unwrap();

        assert_eq!(summary.last_epoch, 17);
        assert!(summary.best_val_loss.map(f64::is_finite).unwrap_or(false));
        assert!(dir.path().join("nvidia_16.json").exists());
        assert!(dir.path().join("nvidia_17.json").exists());
        assert_eq!(ckpt.latest().unwrap().map(|l| l.epoch), Some(17));

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_validation_draws_ceil_val_samples_over_batch() {
        let device = Default::default();
        let cfg = TrainConfig {
            batch_size:        2,
            val_samples:       5,
            samples_per_epoch: 100,
            ..TrainConfig::default()
        };
        let model_cfg = SteeringModelConfig::new(Architecture::Nvidia);
        let model     = model_cfg.init::<TestBackend>(&device);
        let dataset   = SteeringDataset::new(frames(4));

        let (loss, batches) = validate::<TestBackend>(&model, &dataset, &cfg, &device).unwrap();
        assert_eq!(batches, 3);
        assert!(loss.is_finite());

        let cfg = TrainConfig { val_samples: 800, batch_size: 128, ..cfg };
        let (_, batches) = validate::<TestBackend>(&model, &dataset, &cfg, &device).unwrap();
        assert_eq!(batches, 7);
    }

    #[test]
    fn test_skip_validate_leaves_val_loss_empty() {
        let dir    = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("comma");
        let device = Default::default();

        let cfg = TrainConfig {
            batch_size:        2,
            epochs:            1,
            samples_per_epoch: 2,
            skip_validate:     true,
            ..TrainConfig::default()
        };

        let mut train_gen = TrainGenerator::new(
            SteeringDataset::new(frames(3)), 2, 2, AugmentPipeline::identity(), Some(1),
        ).unwrap();
        let val_dataset = SteeringDataset::new(frames(2));
        let ckpt        = CheckpointManager::new(&prefix).unwrap();
        let metrics     = MetricsLogger::new(dir.path().join("comma_metrics.csv")).unwrap();

        let model_cfg = SteeringModelConfig::new(Architecture::Comma);
        let summary   = train_loop(
            &cfg,
            model_cfg.init::<TestBackend>(&device),
            &model_cfg,
            &mut train_gen,
            Some(&val_dataset),
            &ckpt,
            &metrics,
            &device,
        ).unwrap();

        assert_eq!(summary.last_epoch, 1);
        assert!(summary.best_epoch.is_none());
        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with(','));
    }
}
