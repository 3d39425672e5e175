// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, built on clap.
// All work is delegated to Layer 2 (application).
//
//   1. `train`   — train a model and snapshot it every epoch
//   2. `summary` — print a model's layer stack
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, SummaryArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "steering-trainer",
    version,
    about = "Train a CNN that predicts steering angles from dashboard camera frames."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Summary(args) => run_summary(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let summary = TrainUseCase::new(args.into()).execute()?;

    match (&summary.last_snapshot, summary.best_epoch) {
        (Some(stem), Some(best)) => println!(
            "Training complete after epoch {}. Last snapshot: {} (best validation loss {:.5} at epoch {})",
            summary.last_epoch,
            stem.display(),
            summary.best_val_loss.unwrap_or(f64::NAN),
            best,
        ),
        (Some(stem), None) => println!(
            "Training complete after epoch {}. Last snapshot: {}",
            summary.last_epoch,
            stem.display(),
        ),
        (None, _) => println!("No epochs were run."),
    }
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    use crate::application::summary_use_case::SummaryUseCase;

    let summary = SummaryUseCase::new(args.architecture, args.snapshot).execute()?;

    println!("{} model", summary.architecture);
    for line in &summary.layers {
        println!("  {line}");
    }
    println!("Total params: {}", summary.num_params);
    Ok(())
}
