// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model and optimiser code lives here.
//
//   model.rs   — The steering regressors, declared as burn
//                modules: the NVIDIA end-to-end network and the
//                comma.ai network, both mapping a 66x200 RGB frame
//                to a single angle.
//
//   trainer.rs — The training loop. Pulls augmented batches from
//                the generator, runs forward / MSE / backward /
//                Adam, validates, and snapshots every epoch.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Bojarski et al. (2016) End to End Learning for
//            Self-Driving Cars

/// Steering model architectures
pub mod model;

/// Epoch loop with validation and snapshots
pub mod trainer;
