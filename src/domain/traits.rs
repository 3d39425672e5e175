// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so a
// different on-disk format (e.g. a folder of PNGs plus a CSV)
// can be added without touching the training workflow.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use rand::RngCore;

use crate::domain::error::DataResult;
use crate::domain::frame::DrivingFrame;

// ─── FrameSource ──────────────────────────────────────────────────────────────
/// Any component that can produce the full set of labelled frames.
///
/// Implementations:
///   - NpyLoader → paired features/labels .npy arrays
pub trait FrameSource {
    fn load_all(&self) -> DataResult<Vec<DrivingFrame>>;
}

// ─── Augmentation ─────────────────────────────────────────────────────────────
/// A random, label-aware transform applied to a single frame.
///
/// Implementations must keep the image dimensions unchanged so
/// that every frame in a batch still stacks into one tensor.
pub trait Augmentation {
    /// Possibly transform `frame`. The decision to apply (and any
    /// random parameters) is drawn from `rng`.
    fn apply(&self, frame: &mut DrivingFrame, rng: &mut dyn RngCore);

    /// Short human-readable description for the startup log
    fn describe(&self) -> String;
}
