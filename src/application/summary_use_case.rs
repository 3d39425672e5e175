// ============================================================
// Layer 2 — Summary Use Case
// ============================================================
// Builds a model for the chosen architecture on the CPU backend and
// reports its layer stack and parameter count, without touching any
// data. Handy for checking a snapshot's JSON before resuming from it.

use anyhow::Result;
use burn::backend::NdArray;
use burn::module::Module;
use std::path::PathBuf;

use crate::infra::checkpoint::load_snapshot_config;
use crate::ml::model::{Architecture, SteeringModel, SteeringModelConfig};

pub struct SummaryUseCase {
    architecture: Architecture,
    snapshot:     Option<PathBuf>,
}

/// What `execute` found, ready for printing.
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub architecture: Architecture,
    pub layers:       Vec<String>,
    pub num_params:   usize,
}

impl SummaryUseCase {
    pub fn new(architecture: Architecture, snapshot: Option<PathBuf>) -> Self {
        Self { architecture, snapshot }
    }

    pub fn execute(&self) -> Result<ModelSummary> {
        let model_cfg = match &self.snapshot {
            Some(stem) => {
                let restored = load_snapshot_config(stem)?;
                if restored.architecture != self.architecture {
                    tracing::warn!(
                        "Snapshot '{}' is a {} model; ignoring --arch {}",
                        stem.display(),
                        restored.architecture,
                        self.architecture,
                    );
                }
                restored
            }
            None       => SteeringModelConfig::new(self.architecture),
        };

        let device = Default::default();
        let model: SteeringModel<NdArray<f32>> = model_cfg.init(&device);

        Ok(ModelSummary {
            architecture: model_cfg.architecture,
            layers:       model_cfg.describe(),
            num_params:   model.num_params(),
        })
    }
}
