// ============================================================
// Layer 4 — Augmentation
// ============================================================
// Random, label-aware transforms applied to every training batch.
//
//   flip_half         mirror exactly half of a batch and negate
//                     those angles; keeps left/right turns balanced
//   RandomTranslate   shift the frame sideways (and a little
//                     vertically) and correct the angle for the
//                     lateral offset
//   RandomBrightness  scale all channels to mimic shade, sun,
//                     and dusk
//
// Every transform keeps the frame dimensions, so augmented frames
// still stack into a single batch tensor.
//
// Reference: image crate — imageops::flip_horizontal_in_place,
//            imageops::replace

use image::RgbImage;
use rand::seq::index;
use rand::{Rng, RngCore};

use crate::domain::error::{DataError, DataResult};
use crate::domain::frame::DrivingFrame;
use crate::domain::traits::Augmentation;

// ─── Flip half ────────────────────────────────────────────────────────────────
/// Flip exactly `len / 2` frames of the batch, chosen uniformly at
/// random without replacement. Returns how many were flipped.
pub fn flip_half(batch: &mut [DrivingFrame], rng: &mut dyn RngCore) -> usize {
    let count = batch.len() / 2;
    for i in index::sample(rng, batch.len(), count).into_iter() {
        batch[i].flip_horizontal();
    }
    count
}

// ─── Brightness ───────────────────────────────────────────────────────────────
/// Multiply every channel by a random factor in [min_factor, max_factor).
#[derive(Debug, Clone)]
pub struct RandomBrightness {
    pub prob:       f32,
    pub min_factor: f32,
    pub max_factor: f32,
}

impl Default for RandomBrightness {
    fn default() -> Self {
        Self { prob: 1.0, min_factor: 0.25, max_factor: 1.25 }
    }
}

impl Augmentation for RandomBrightness {
    fn apply(&self, frame: &mut DrivingFrame, rng: &mut dyn RngCore) {
        if self.prob <= 0.0 || self.min_factor >= self.max_factor {
            return;
        }
        if rng.gen_range(0.0..1.0) >= self.prob {
            return;
        }
        let factor = rng.gen_range(self.min_factor..self.max_factor);
        scale_brightness(&mut frame.image, factor);
    }

    fn describe(&self) -> String {
        format!(
            "brightness p={:.2} range=[{:.2},{:.2})",
            self.prob, self.min_factor, self.max_factor
        )
    }
}

pub(crate) fn scale_brightness(img: &mut RgbImage, factor: f32) {
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let v = pixel[c] as f32 * factor;
            pixel[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}

// ─── Translation ──────────────────────────────────────────────────────────────
/// Shift the image by up to (max_dx, max_dy) pixels. A lateral shift
/// looks like the car sitting off-centre in its lane, so the angle
/// is corrected by `dx * angle_per_pixel`.
#[derive(Debug, Clone)]
pub struct RandomTranslate {
    pub prob:            f32,
    pub max_dx:          u32,
    pub max_dy:          u32,
    pub angle_per_pixel: f32,
}

impl Default for RandomTranslate {
    fn default() -> Self {
        Self { prob: 1.0, max_dx: 50, max_dy: 10, angle_per_pixel: 0.004 }
    }
}

impl Augmentation for RandomTranslate {
    fn apply(&self, frame: &mut DrivingFrame, rng: &mut dyn RngCore) {
        if self.prob <= 0.0 || (self.max_dx == 0 && self.max_dy == 0) {
            return;
        }
        if rng.gen_range(0.0..1.0) >= self.prob {
            return;
        }
        let dx = symmetric(rng, self.max_dx);
        let dy = symmetric(rng, self.max_dy);
        translate(frame, dx, dy, self.angle_per_pixel);
    }

    fn describe(&self) -> String {
        format!(
            "translate p={:.2} dx=±{} dy=±{} angle/px={:.4}",
            self.prob, self.max_dx, self.max_dy, self.angle_per_pixel
        )
    }
}

fn symmetric(rng: &mut dyn RngCore, max: u32) -> i64 {
    if max == 0 {
        return 0;
    }
    let max = max as i64;
    rng.gen_range(-max..=max)
}

/// Shift `frame` by (dx, dy) pixels onto a black canvas and adjust the angle.
pub(crate) fn translate(frame: &mut DrivingFrame, dx: i64, dy: i64, angle_per_pixel: f32) {
    let (w, h) = frame.image.dimensions();
    let mut canvas = RgbImage::new(w, h);
    image::imageops::replace(&mut canvas, &frame.image, dx, dy);
    frame.image = canvas;
    frame.angle += dx as f32 * angle_per_pixel;
}

// ─── Pipeline ─────────────────────────────────────────────────────────────────
/// The per-batch augmentation recipe used by the training generator.
///
/// Order: flip half of the batch, then per frame translate, then
/// brightness. Validation batches never go through this.
#[derive(Debug, Clone)]
pub struct AugmentPipeline {
    pub flip_half:  bool,
    pub translate:  Option<RandomTranslate>,
    pub brightness: Option<RandomBrightness>,
}

impl Default for AugmentPipeline {
    fn default() -> Self {
        Self { flip_half: true, ..Self::identity() }
    }
}

impl AugmentPipeline {
    /// A pipeline that leaves batches untouched.
    pub fn identity() -> Self {
        Self { flip_half: false, translate: None, brightness: None }
    }

    /// Reject probabilities outside [0, 1] and empty brightness ranges.
    pub fn validate(&self) -> DataResult<()> {
        let check_prob = |name: &str, p: f32| {
            if (0.0..=1.0).contains(&p) {
                Ok(())
            } else {
                Err(DataError::InvalidConfig(format!("{name} probability {p} is outside [0, 1]")))
            }
        };
        if let Some(t) = &self.translate {
            check_prob("translate", t.prob)?;
        }
        if let Some(b) = &self.brightness {
            check_prob("brightness", b.prob)?;
            if !(b.min_factor >= 0.0 && b.min_factor < b.max_factor) {
                return Err(DataError::InvalidConfig(format!(
                    "brightness range [{}, {}) is empty or negative",
                    b.min_factor, b.max_factor
                )));
            }
        }
        Ok(())
    }

    pub fn apply_batch(&self, batch: &mut [DrivingFrame], rng: &mut dyn RngCore) {
        if self.flip_half {
            flip_half(batch, rng);
        }
        let per_frame: Vec<&dyn Augmentation> = self.per_frame();
        if per_frame.is_empty() {
            return;
        }
        for frame in batch.iter_mut() {
            for aug in &per_frame {
                aug.apply(frame, rng);
            }
        }
    }

    fn per_frame(&self) -> Vec<&dyn Augmentation> {
        let mut out: Vec<&dyn Augmentation> = Vec::new();
        if let Some(t) = &self.translate {
            out.push(t);
        }
        if let Some(b) = &self.brightness {
            out.push(b);
        }
        out
    }

    pub fn describe(&self) -> String {
        let mut parts = vec![format!("flip_half={}", self.flip_half)];
        parts.extend(self.per_frame().iter().map(|a| a.describe()));
        parts.join(" | ")
    }
}
