// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types and traits that describe what the trainer
// works with: labelled camera frames, the sources that produce
// them, and the augmentations that mutate them.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A single (image, steering angle) pair
pub mod frame;

// Typed errors for loading and preparing frames
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
