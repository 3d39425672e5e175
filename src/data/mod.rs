// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the .npy files on disk to tensor batches.
//
//   features.npy + labels.npy
//       │
//       ▼
//   NpyLoader          → reads arrays, builds DrivingFrames
//       │
//       ▼
//   Preprocessor       → crop rows, resize to model input
//       │
//       ▼
//   split_train_val    → seeded shuffle, 90/10 split
//       │
//       ▼
//   SteeringDataset    → implements Burn's Dataset trait
//       │
//       ├──► TrainGenerator      (reshuffle, flip half, augment)
//       └──► ValidationGenerator (sequential, untouched)
//                 │
//                 ▼
//   SteeringBatcher    → stacks frames into NCHW tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Loads features/labels .npy pairs
pub mod loader;

/// Crops and resizes frames to the model input
pub mod preprocessor;

/// Random flip / brightness / translation transforms
pub mod augment;

/// Implements Burn's Dataset trait for driving frames
pub mod dataset;

/// Endless training and validation batch generators
pub mod generator;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
