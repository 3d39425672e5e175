// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the loss curve to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the snapshot number the row belongs to
//   - train_loss: mean MSE over the epoch's augmented batches
//   - val_loss:   mean MSE on the validation batches
//                 (empty when validation is skipped)
//
// Output file: <destfile>_metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss
//   16,0.031240,0.028110
//   17,0.029877,
//
// Note that train_loss is measured on augmented frames with
// dropout active, so it usually sits above val_loss.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Snapshot number (matches the `<destfile>_<epoch>` files)
    pub epoch: usize,

    /// Mean squared error averaged over training batches
    pub train_loss: f64,

    /// Mean squared error on validation, None when skipped
    pub val_loss: Option<f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: Option<f64>) -> Self {
        Self { epoch, train_loss, val_loss }
    }

    /// Returns true if this epoch beat the previous best val_loss.
    /// Epochs without validation never count as an improvement.
    pub fn is_improvement(&self, best_val_loss: Option<f64>) -> bool {
        match (self.val_loss, best_val_loss) {
            (Some(v), Some(best)) => v < best,
            (Some(v), None)       => v.is_finite(),
            (None, _)             => false,
        }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger at `path`.
    /// Writes the CSV header if the file doesn't exist yet, so a
    /// resumed run keeps appending to the same curve.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = path.into();

        if let Some(dir) = csv_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,val_loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let val = m.val_loss.map(|v| format!("{v:.6}")).unwrap_or_default();
        writeln!(f, "{},{:.6},{}", m.epoch, m.train_loss, val)?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:?}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.05, Some(0.03));
        assert!(m.is_improvement(Some(0.04)));
        assert!(!m.is_improvement(Some(0.02)));
        // First validated epoch is always the best so far
        assert!(m.is_improvement(None));

        let skipped = EpochMetrics::new(3, 0.05, None);
        assert!(!skipped.is_improvement(None));
    }

    #[test]
    fn test_log_appends_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("run_metrics.csv");
        let logger = MetricsLogger::new(&path).unwrap();

        logger.log(&EpochMetrics::new(1, 0.5, Some(0.25))).unwrap();
        logger.log(&EpochMetrics::new(2, 0.125, None)).unwrap();

        // Re-opening must not duplicate the header
        let logger = MetricsLogger::new(&path).unwrap();
        logger.log(&EpochMetrics::new(3, 0.1, Some(0.1))).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![
            "epoch,train_loss,val_loss",
            "1,0.500000,0.250000",
            "2,0.125000,",
            "3,0.100000,0.100000",
        ]);
    }
}
