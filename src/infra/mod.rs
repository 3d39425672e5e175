// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Flat-file persistence shared by the training workflow:
//
//   checkpoint.rs — Per-epoch snapshots (weights + architecture),
//                   the latest-snapshot pointer, the run config,
//                   and restoring a snapshot to resume training.
//
//   metrics.rs    — Epoch-level loss curve appended to a CSV.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model snapshot saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
