// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `summary`, and all
// their flags. Defaults reproduce the reference NVIDIA training run.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Architecture;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a steering model on features/labels .npy arrays
    Train(TrainArgs),

    /// Print the layer stack and parameter count of a model
    Summary(SummaryArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Batch size
    #[arg(long = "batch", default_value_t = 128)]
    pub batch_size: usize,

    /// Number of epochs to run
    #[arg(long = "epoch", default_value_t = 5)]
    pub epochs: usize,

    /// How many images make up one epoch
    #[arg(long = "epochsize", default_value_t = 43394)]
    pub samples_per_epoch: usize,

    /// Skip validation after each epoch
    #[arg(long = "skipvalidate")]
    pub skip_validate: bool,

    /// Features .npy file, shape [N, H, W, 3]
    #[arg(long, default_value = "data/np_data/udacity_final_images.npy")]
    pub features: String,

    /// Labels .npy file, shape [N]
    #[arg(long, default_value = "data/np_data/udacity_angles.npy")]
    pub labels: String,

    /// Snapshot prefix; epoch N is saved as <destfile>_N.{mpk,json}
    #[arg(long, default_value = "models/nvidia")]
    pub destfile: String,

    /// Network to train: nvidia or comma
    #[arg(long = "arch", default_value_t = Architecture::Nvidia)]
    pub architecture: Architecture,

    /// Adam learning rate (1e-4 works well when fine-tuning a snapshot)
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Validation images scored per epoch
    #[arg(long, default_value_t = 800)]
    pub val_samples: usize,

    /// Fraction of the dataset held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Seed for the split, shuffling and augmentation
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Use a fresh random seed instead of --seed
    #[arg(long, conflicts_with = "seed")]
    pub random_seed: bool,

    /// Snapshot stem to resume from, e.g. models/nvidia_15
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Index of the first epoch (snapshots are numbered from start-epoch + 1)
    #[arg(long, default_value_t = 0)]
    pub start_epoch: usize,

    /// First image row to keep before resizing
    #[arg(long, requires = "crop_bottom")]
    pub crop_top: Option<u32>,

    /// Row after the last image row to keep
    #[arg(long, requires = "crop_top")]
    pub crop_bottom: Option<u32>,

    /// Disable the half-batch horizontal flip
    #[arg(long)]
    pub no_flip: bool,

    /// Enable random brightness jitter
    #[arg(long)]
    pub brightness: bool,

    /// Enable random translation with angle correction
    #[arg(long)]
    pub translate: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            features:          a.features,
            labels:            a.labels,
            destfile:          a.destfile,
            architecture:      a.architecture,
            batch_size:        a.batch_size,
            epochs:            a.epochs,
            samples_per_epoch: a.samples_per_epoch,
            val_samples:       a.val_samples,
            val_fraction:      a.val_fraction,
            lr:                a.lr,
            seed:              (!a.random_seed).then_some(a.seed),
            skip_validate:     a.skip_validate,
            resume:            a.resume,
            start_epoch:       a.start_epoch,
            crop_rows:         a.crop_top.zip(a.crop_bottom),
            flip_half:         !a.no_flip,
            brightness:        a.brightness,
            translate:         a.translate,
        }
    }
}

/// All arguments for the `summary` command
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Network to describe: nvidia or comma
    #[arg(long = "arch", default_value_t = Architecture::Nvidia)]
    pub architecture: Architecture,

    /// Describe the architecture stored with this snapshot instead
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}
