// ============================================================
// Layer 4 — Batch Generators
// ============================================================
// Streams batches of frames into the training loop without ever
// materialising the augmented dataset.
//
// TrainGenerator (endless):
//
//   loop {
//       reshuffle the index order                 ← start of a pass
//       for i in 0..floor(min(len, per_epoch) / batch) {
//           take indices [i*batch, (i+1)*batch)
//           clone those frames, augment them, yield
//       }
//   }
//
//   An "epoch" is a number of samples, not a pass: the trainer
//   draws ceil(samples_per_epoch / batch) batches, which may end
//   mid-pass or wrap into the next pass. The generator lives
//   across epochs, so each epoch picks up where the last ended.
//
// ValidationGenerator (cycling, created fresh per epoch):
//   same slicing, but no shuffle and no augmentation, so every
//   epoch is scored on the same frames.
//
// Reference: Rust Book §13 (Iterators)

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::augment::AugmentPipeline;
use crate::data::dataset::SteeringDataset;
use crate::domain::error::{DataError, DataResult};
use crate::domain::frame::DrivingFrame;

/// Number of batches needed to draw `samples` frames.
pub fn steps_for(samples: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    samples.div_ceil(batch_size)
}

/// Batches per pass, and the size of each. When the usable part of
/// the dataset is smaller than one batch, a pass is a single short
/// batch instead of nothing at all.
fn pass_layout(len: usize, samples_per_epoch: usize, batch_size: usize) -> (usize, usize) {
    let usable = len.min(samples_per_epoch);
    match usable / batch_size {
        0 => (1, usable),
        n => (n, batch_size),
    }
}

fn validate(len: usize, samples_per_epoch: usize, batch_size: usize, what: &str) -> DataResult<()> {
    if len == 0 {
        return Err(DataError::Empty(format!("{what} set has no frames")));
    }
    if batch_size == 0 {
        return Err(DataError::InvalidConfig("batch size must be positive".to_string()));
    }
    if samples_per_epoch == 0 {
        return Err(DataError::InvalidConfig("samples per epoch must be positive".to_string()));
    }
    Ok(())
}

// ─── TrainGenerator ───────────────────────────────────────────────────────────
pub struct TrainGenerator {
    dataset:          SteeringDataset,
    pipeline:         AugmentPipeline,
    rng:              StdRng,
    order:            Vec<usize>,
    batches_per_pass: usize,
    batch_len:        usize,
    next_batch:       usize,
    passes:           usize,
}

impl TrainGenerator {
    pub fn new(
        dataset:           SteeringDataset,
        batch_size:        usize,
        samples_per_epoch: usize,
        pipeline:          AugmentPipeline,
        seed:              Option<u64>,
    ) -> DataResult<Self> {
        let len = dataset.frames().len();
        validate(len, samples_per_epoch, batch_size, "training")?;
        pipeline.validate()?;

        let (batches_per_pass, batch_len) = pass_layout(len, samples_per_epoch, batch_size);
        if batch_len < batch_size {
            tracing::warn!(
                "Only {} training frames available for batch size {}; using short batches",
                batch_len,
                batch_size,
            );
        }

        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None    => StdRng::from_entropy(),
        };

        Ok(Self {
            dataset,
            pipeline,
            rng,
            order: (0..len).collect(),
            batches_per_pass,
            batch_len,
            // Forces a shuffle before the very first batch
            next_batch: batches_per_pass,
            passes: 0,
        })
    }

    pub fn batches_per_pass(&self) -> usize { self.batches_per_pass }

    /// How many full reshuffles have happened so far
    pub fn passes(&self) -> usize { self.passes }

    fn start_pass(&mut self) {
        self.order.shuffle(&mut self.rng);
        self.next_batch = 0;
        self.passes += 1;
        tracing::trace!("Training generator pass {}", self.passes);
    }
}

impl Iterator for TrainGenerator {
    type Item = Vec<DrivingFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_batch >= self.batches_per_pass {
            self.start_pass();
        }
        let start = self.next_batch * self.batch_len;
        let end   = start + self.batch_len;
        self.next_batch += 1;

        let frames = self.dataset.frames();
        let mut batch: Vec<DrivingFrame> = self.order[start..end]
            .iter()
            .map(|&i| frames[i].clone())
            .collect();

        self.pipeline.apply_batch(&mut batch, &mut self.rng);
        Some(batch)
    }
}

// ─── ValidationGenerator ──────────────────────────────────────────────────────
pub struct ValidationGenerator<'a> {
    dataset:          &'a SteeringDataset,
    batches_per_pass: usize,
    batch_len:        usize,
    next_batch:       usize,
}

impl<'a> ValidationGenerator<'a> {
    pub fn new(
        dataset:           &'a SteeringDataset,
        batch_size:        usize,
        samples_per_epoch: usize,
    ) -> DataResult<Self> {
        let len = dataset.frames().len();
        validate(len, samples_per_epoch, batch_size, "validation")?;
        let (batches_per_pass, batch_len) = pass_layout(len, samples_per_epoch, batch_size);
        Ok(Self { dataset, batches_per_pass, batch_len, next_batch: 0 })
    }
}

impl Iterator for ValidationGenerator<'_> {
    type Item = Vec<DrivingFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_batch >= self.batches_per_pass {
            self.next_batch = 0;
        }
        let start = self.next_batch * self.batch_len;
        self.next_batch += 1;
        Some(self.dataset.frames()[start..start + self.batch_len].to_vec())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::collections::HashSet;

    /// Frames whose angle is their index, so batches can be traced
    fn indexed_dataset(n: usize) -> SteeringDataset {
        SteeringDataset::new(
            (0..n)
                .map(|i| DrivingFrame::new(RgbImage::new(2, 2), i as f32))
                .collect(),
        )
    }

    #[test]
    fn test_steps_for_rounds_up() {
        assert_eq!(steps_for(800, 128), 7);
        assert_eq!(steps_for(256, 128), 2);
        assert_eq!(steps_for(43394, 128), 340);
        assert_eq!(steps_for(10, 0), 0);
    }

    #[test]
    fn test_pass_covers_distinct_frames() {
        let mut gen = TrainGenerator::new(
            indexed_dataset(10), 3, 100, AugmentPipeline::identity(), Some(1),
        ).unwrap();
        assert_eq!(gen.batches_per_pass(), 3);

        let mut seen = HashSet::new();
        for _ in 0..3 {
            let batch = gen.next().unwrap();
            assert_eq!(batch.len(), 3);
            for f in batch {
                assert!(seen.insert(f.angle as usize), "frame repeated within a pass");
            }
        }
        assert_eq!(seen.len(), 9);
        assert_eq!(gen.passes(), 1);

        // The next batch starts a new, reshuffled pass
        gen.next().unwrap();
        assert_eq!(gen.passes(), 2);
    }

    #[test]
    fn test_samples_per_epoch_limits_a_pass() {
        let gen = TrainGenerator::new(
            indexed_dataset(100), 8, 20, AugmentPipeline::identity(), Some(0),
        ).unwrap();
        assert_eq!(gen.batches_per_pass(), 2);
    }

    #[test]
    fn test_small_dataset_yields_short_batch() {
        let mut gen = TrainGenerator::new(
            indexed_dataset(5), 128, 1000, AugmentPipeline::identity(), Some(0),
        ).unwrap();
        assert_eq!(gen.batches_per_pass(), 1);
        assert_eq!(gen.next().unwrap().len(), 5);
        assert_eq!(gen.next().unwrap().len(), 5);
    }

    #[test]
    fn test_training_batches_are_augmented() {
        let mut gen = TrainGenerator::new(
            indexed_dataset(9), 4, 100, AugmentPipeline::default(), Some(3),
        ).unwrap();
        for _ in 0..5 {
            let batch = gen.next().unwrap();
            // Frame 0 has angle 0 and cannot show a sign change
            let negative = batch.iter().filter(|f| f.angle < 0.0).count();
            let has_zero = batch.iter().any(|f| f.angle == 0.0);
            if has_zero {
                assert!(negative <= 2);
            } else {
                assert_eq!(negative, 2);
            }
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let make = || TrainGenerator::new(
            indexed_dataset(20), 4, 20, AugmentPipeline::default(), Some(9),
        ).unwrap();
        let a: Vec<Vec<f32>> = make().take(7).map(|b| b.iter().map(|f| f.angle).collect()).collect();
        let b: Vec<Vec<f32>> = make().take(7).map(|b| b.iter().map(|f| f.angle).collect()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_is_sequential_and_cycles() {
        let ds      = indexed_dataset(7);
        let mut gen = ValidationGenerator::new(&ds, 3, 100).unwrap();

        let angles = |b: Vec<DrivingFrame>| b.iter().map(|f| f.angle).collect::<Vec<_>>();
        assert_eq!(angles(gen.next().unwrap()), vec![0.0, 1.0, 2.0]);
        assert_eq!(angles(gen.next().unwrap()), vec![3.0, 4.0, 5.0]);
        // Frame 6 never fits a full batch; wrap to the start
        assert_eq!(angles(gen.next().unwrap()), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_validation_cycles_within_samples_per_epoch() {
        let ds      = indexed_dataset(10);
        let mut gen = ValidationGenerator::new(&ds, 2, 4).unwrap();

        let angles = |b: Vec<DrivingFrame>| b.iter().map(|f| f.angle).collect::<Vec<_>>();
        assert_eq!(angles(gen.next().unwrap()), vec![0.0, 1.0]);
        assert_eq!(angles(gen.next().unwrap()), vec![2.0, 3.0]);
        assert_eq!(angles(gen.next().unwrap()), vec![0.0, 1.0]);
    }

    #[test]
    fn test_bad_augmentation_is_rejected_at_construction() {
        let pipeline = AugmentPipeline {
            brightness: Some(crate::data::augment::RandomBrightness {
                prob: 1.0, min_factor: 1.2, max_factor: 0.8,
            }),
            ..AugmentPipeline::default()
        };
        assert!(matches!(
            TrainGenerator::new(indexed_dataset(8), 4, 8, pipeline, Some(0)),
            Err(DataError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        assert!(matches!(
            TrainGenerator::new(indexed_dataset(0), 4, 10, AugmentPipeline::default(), None),
            Err(DataError::Empty(_))
        ));
        assert!(matches!(
            TrainGenerator::new(indexed_dataset(4), 0, 10, AugmentPipeline::default(), None),
            Err(DataError::InvalidConfig(_))
        ));
        let ds = indexed_dataset(4);
        assert!(ValidationGenerator::new(&ds, 2, 0).is_err());
    }
}
