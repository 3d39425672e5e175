// ============================================================
// Layer 4 — Frame Preprocessor
// ============================================================
// Deterministic per-frame preparation, run once after loading:
//
//   1. Crop away rows that carry no steering signal
//      (sky above the horizon, the car's own bonnet below)
//   2. Resize to the network's input resolution
//
// Because neither step is random, doing it once up front is
// equivalent to doing it inside every batch, and far cheaper.
//
// Reference: image crate — imageops::crop_imm / imageops::resize

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::domain::error::{DataError, DataResult};
use crate::domain::frame::DrivingFrame;

/// Crops and resizes frames to the model input size.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    /// Keep rows in [top, bottom). None = keep the full height.
    crop_rows:     Option<(u32, u32)>,
    target_width:  u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(crop_rows: Option<(u32, u32)>, target_width: u32, target_height: u32) -> Self {
        Self { crop_rows, target_width, target_height }
    }

    /// Prepare a single frame. The angle is never touched.
    pub fn process(&self, frame: DrivingFrame) -> DataResult<DrivingFrame> {
        let DrivingFrame { image, angle } = frame;
        let image = self.crop(image)?;
        let image = self.resize(image);
        Ok(DrivingFrame::new(image, angle))
    }

    /// Prepare every frame, failing on the first invalid one.
    pub fn process_all(&self, frames: Vec<DrivingFrame>) -> DataResult<Vec<DrivingFrame>> {
        let total = frames.len();
        let out = frames
            .into_iter()
            .map(|f| self.process(f))
            .collect::<DataResult<Vec<_>>>()?;
        tracing::debug!(
            "Preprocessed {} frames to {}x{}",
            total,
            self.target_height,
            self.target_width,
        );
        Ok(out)
    }

    fn crop(&self, image: RgbImage) -> DataResult<RgbImage> {
        let Some((top, bottom)) = self.crop_rows else {
            return Ok(image);
        };
        let (width, height) = image.dimensions();
        if top >= bottom || bottom > height {
            return Err(DataError::InvalidConfig(format!(
                "crop rows {top}..{bottom} do not fit an image {height} rows high"
            )));
        }
        Ok(imageops::crop_imm(&image, 0, top, width, bottom - top).to_image())
    }

    fn resize(&self, image: RgbImage) -> RgbImage {
        if image.dimensions() == (self.target_width, self.target_height) {
            return image;
        }
        imageops::resize(&image, self.target_width, self.target_height, FilterType::Triangle)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn striped_frame(width: u32, height: u32) -> DrivingFrame {
        // Each row's red channel equals its row index
        let img = RgbImage::from_fn(width, height, |_, y| Rgb([y as u8, 0, 0]));
        DrivingFrame::new(img, 0.2)
    }

    #[test]
    fn test_crop_keeps_requested_rows() {
        let p   = Preprocessor::new(Some((2, 5)), 4, 3);
        let out = p.process(striped_frame(4, 8)).unwrap();
        assert_eq!(out.dimensions(), (4, 3));
        assert_eq!(out.image.get_pixel(0, 0)[0], 2);
        assert_eq!(out.image.get_pixel(0, 2)[0], 4);
        assert_eq!(out.angle, 0.2);
    }

    #[test]
    fn test_resizes_to_target() {
        let p   = Preprocessor::new(None, 200, 66);
        let out = p.process(striped_frame(320, 160)).unwrap();
        assert_eq!(out.dimensions(), (200, 66));
    }

    #[test]
    fn test_matching_size_is_untouched() {
        let p     = Preprocessor::new(None, 4, 8);
        let frame = striped_frame(4, 8);
        assert_eq!(p.process(frame.clone()).unwrap(), frame);
    }

    #[test]
    fn test_invalid_crop_is_rejected() {
        let p = Preprocessor::new(Some((5, 20)), 4, 4);
        assert!(matches!(
            p.process(striped_frame(4, 8)),
            Err(DataError::InvalidConfig(_))
        ));

        let p = Preprocessor::new(Some((3, 3)), 4, 4);
        assert!(p.process(striped_frame(4, 8)).is_err());
    }
}
