// ============================================================
// Layer 3 — Data Errors
// ============================================================
// Typed failures for everything between the .npy files on disk
// and a ready-to-train dataset. The application layer turns
// these into anyhow errors with extra context.

use std::path::PathBuf;
use thiserror::Error;

pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read .npy file {path}: {msg}")]
    Npy { path: PathBuf, msg: String },

    #[error("unexpected shape {shape:?} in {path}: {msg}")]
    Shape {
        path:  PathBuf,
        shape: Vec<usize>,
        msg:   String,
    },

    #[error("{features} feature frames but {labels} labels")]
    CountMismatch { features: usize, labels: usize },

    #[error("dataset is empty: {0}")]
    Empty(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
