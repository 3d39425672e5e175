use burn::data::dataset::Dataset;

use crate::domain::frame::DrivingFrame;

/// In-memory set of preprocessed frames.
/// The generators index into this instead of copying it around.
pub struct SteeringDataset {
    frames: Vec<DrivingFrame>,
}

/// Label distribution summary, logged at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleStats {
    pub min:           f32,
    pub max:           f32,
    pub mean:          f32,
    pub zero_fraction: f32,
}

impl SteeringDataset {
    pub fn new(frames: Vec<DrivingFrame>) -> Self { Self { frames } }

    pub fn frames(&self) -> &[DrivingFrame] { &self.frames }

    pub fn into_frames(self) -> Vec<DrivingFrame> { self.frames }

    /// (width, height) shared by every frame, or None when empty
    pub fn frame_dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(DrivingFrame::dimensions)
    }

    pub fn angle_stats(&self) -> Option<AngleStats> {
        if self.frames.is_empty() {
            return None;
        }
        let mut min   = f32::INFINITY;
        let mut max   = f32::NEG_INFINITY;
        let mut sum   = 0.0f64;
        let mut zeros = 0usize;
        for f in &self.frames {
            min = min.min(f.angle);
            max = max.max(f.angle);
            sum += f.angle as f64;
            if f.angle == 0.0 {
                zeros += 1;
            }
        }
        let n = self.frames.len();
        Some(AngleStats {
            min,
            max,
            mean: (sum / n as f64) as f32,
            zero_fraction: zeros as f32 / n as f32,
        })
    }
}

impl Dataset<DrivingFrame> for SteeringDataset {
    fn get(&self, index: usize) -> Option<DrivingFrame> {
        self.frames.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}
