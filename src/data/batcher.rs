// ============================================================
// Layer 4 — Steering Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<DrivingFrame>
// into tensors the model can consume.
//
// Layout change:
//   DrivingFrame.image is HWC (row, column, channel) u8.
//   Burn's Conv2d expects NCHW floats.
//
//   So for each frame we write all red values, then all green,
//   then all blue into one flat Vec<f32>, and reshape the whole
//   batch to [N, 3, H, W].
//
// Pixel values are kept in 0..255 — scaling to the model's input
// range is part of the model itself, so a checkpoint is always
// fed raw pixels.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::frame::DrivingFrame;

/// A batch of frames ready for the forward pass.
#[derive(Debug, Clone)]
pub struct SteeringBatch<B: Backend> {
    /// Raw pixel values — shape: [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,

    /// Steering labels — shape: [batch_size, 1]
    pub angles: Tensor<B, 2>,
}

/// Stateless: the target device is passed per batch.
#[derive(Clone, Debug, Default)]
pub struct SteeringBatcher;

impl SteeringBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, DrivingFrame, SteeringBatch<B>> for SteeringBatcher {
    /// All frames must share one size; the preprocessor guarantees it.
    fn batch(&self, items: Vec<DrivingFrame>, device: &B::Device) -> SteeringBatch<B> {
        let batch_size      = items.len();
        let (width, height) = items
            .first()
            .map(DrivingFrame::dimensions)
            .unwrap_or((0, 0));
        let (w, h)          = (width as usize, height as usize);
        let plane           = w * h;

        // ── HWC u8 → CHW f32, frame after frame ───────────────────────────────
        let mut pixels = vec![0.0f32; batch_size * 3 * plane];
        for (n, frame) in items.iter().enumerate() {
            let base = n * 3 * plane;
            for (x, y, px) in frame.image.enumerate_pixels() {
                let offset = y as usize * w + x as usize;
                pixels[base + offset]             = px[0] as f32;
                pixels[base + plane + offset]     = px[1] as f32;
                pixels[base + 2 * plane + offset] = px[2] as f32;
            }
        }

        let angles: Vec<f32> = items.iter().map(|f| f.angle).collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, h, w]),
            device,
        );
        let angles = Tensor::<B, 2>::from_data(
            TensorData::new(angles, [batch_size, 1]),
            device,
        );

        SteeringBatch { images, angles }
    }
}
