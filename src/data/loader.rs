// ============================================================
// Layer 4 — .npy Frame Loader
// ============================================================
// Loads a driving dataset stored as two NumPy arrays:
//
//   features.npy  shape [N, H, W, 3]  dtype uint8 | float32 | float64
//   labels.npy    shape [N] or [N, 1] dtype float32 | float64
//
// Feature arrays exported from Python pipelines are often float
// even though the values are plain 0..255 pixel intensities, so
// floats are rounded and clamped back into u8.
//
// Reference: ndarray-npy crate documentation
//            Rust Book §9 (Error Handling)

use std::path::{Path, PathBuf};

use image::RgbImage;
use ndarray::{ArrayD, Axis};
use ndarray_npy::{read_npy, ReadNpyError};

use crate::domain::error::{DataError, DataResult};
use crate::domain::frame::DrivingFrame;
use crate::domain::traits::FrameSource;

/// Loads frames and steering angles from a features/labels .npy pair.
pub struct NpyLoader {
    features: PathBuf,
    labels:   PathBuf,
}

impl NpyLoader {
    pub fn new(features: impl Into<PathBuf>, labels: impl Into<PathBuf>) -> Self {
        Self {
            features: features.into(),
            labels:   labels.into(),
        }
    }
}

impl FrameSource for NpyLoader {
    fn load_all(&self) -> DataResult<Vec<DrivingFrame>> {
        let images = read_feature_images(&self.features)?;
        let angles = read_labels(&self.labels)?;

        if images.len() != angles.len() {
            return Err(DataError::CountMismatch {
                features: images.len(),
                labels:   angles.len(),
            });
        }
        if images.is_empty() {
            return Err(DataError::Empty(format!(
                "'{}' contains no frames",
                self.features.display()
            )));
        }

        let (w, h) = images[0].dimensions();
        tracing::info!(
            "images {} labels {} → {} frames of {}x{}x3",
            self.features.display(),
            self.labels.display(),
            images.len(),
            h,
            w,
        );

        Ok(images
            .into_iter()
            .zip(angles)
            .map(|(image, angle)| DrivingFrame::new(image, angle))
            .collect())
    }
}

/// Read the feature array and split it into one RgbImage per frame.
fn read_feature_images(path: &Path) -> DataResult<Vec<RgbImage>> {
    let pixels = read_pixels(path)?;

    let shape = pixels.shape().to_vec();
    if shape.len() != 4 || shape[3] != 3 {
        return Err(DataError::Shape {
            path: path.to_path_buf(),
            shape,
            msg: "expected [frames, height, width, 3]".to_string(),
        });
    }
    let (height, width) = (shape[1] as u32, shape[2] as u32);

    let mut images = Vec::with_capacity(shape[0]);
    for frame in pixels.axis_iter(Axis(0)) {
        // iter() walks in logical (row-major HWC) order regardless of
        // the memory layout the file was written with
        let raw: Vec<u8> = frame.iter().copied().collect();
        let image = RgbImage::from_raw(width, height, raw).ok_or_else(|| DataError::Shape {
            path:  path.to_path_buf(),
            shape: frame.shape().to_vec(),
            msg:   "frame buffer does not match its dimensions".to_string(),
        })?;
        images.push(image);
    }
    Ok(images)
}

/// Read pixels as u8, falling back to float arrays.
fn read_pixels(path: &Path) -> DataResult<ArrayD<u8>> {
    match read_npy::<_, ArrayD<u8>>(path) {
        Ok(arr) => return Ok(arr),
        Err(ReadNpyError::WrongDescriptor(_)) => {}
        Err(e) => return Err(npy_error(path, e)),
    }
    tracing::debug!("'{}' is not uint8, trying float pixels", path.display());

    let floats = match read_npy::<_, ArrayD<f32>>(path) {
        Ok(arr) => arr.mapv(f64::from),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            read_npy::<_, ArrayD<f64>>(path).map_err(|e| npy_error(path, e))?
        }
        Err(e) => return Err(npy_error(path, e)),
    };
    Ok(floats.mapv(|v| v.round().clamp(0.0, 255.0) as u8))
}

/// Read the label array as a flat Vec<f32>.
fn read_labels(path: &Path) -> DataResult<Vec<f32>> {
    let labels: ArrayD<f64> = match read_npy::<_, ArrayD<f64>>(path) {
        Ok(arr) => arr,
        Err(ReadNpyError::WrongDescriptor(_)) => read_npy::<_, ArrayD<f32>>(path)
            .map_err(|e| npy_error(path, e))?
            .mapv(f64::from),
        Err(e) => return Err(npy_error(path, e)),
    };

    let shape = labels.shape().to_vec();
    let flat_ok = match shape.as_slice() {
        [_] => true,
        [_, 1] => true,
        _ => false,
    };
    if !flat_ok {
        return Err(DataError::Shape {
            path: path.to_path_buf(),
            shape,
            msg: "expected [frames] or [frames, 1]".to_string(),
        });
    }

    Ok(labels.iter().map(|&v| v as f32).collect())
}

fn npy_error(path: &Path, e: ReadNpyError) -> DataError {
    DataError::Npy {
        path: path.to_path_buf(),
        msg:  e.to_string(),
    }
}
