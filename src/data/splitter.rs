// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Randomly shuffles frames and splits them into two sets:
//   - Training set:   streamed through the augmenting generator
//   - Validation set: scored each epoch, never augmented
//
// Why shuffle before splitting?
//   Recorded driving data is ordered in time. Neighbouring frames
//   are almost identical, and whole stretches of track (straights,
//   long left-handers) sit next to each other. Without shuffling,
//   the validation set would be one contiguous piece of road.
//
// A seed makes the split reproducible across runs, which matters
// when a run is resumed from a snapshot: the validation frames
// must not leak into training.
//
// Split ratio: 90% training, 10% validation (configurable)
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Randomly shuffle `samples` and split into (train, validation).
///
/// # Arguments
/// * `samples`        - All available samples (consumed by this function)
/// * `train_fraction` - Proportion for training, e.g. 0.9 = 90%
/// * `seed`           - Fixed seed for a reproducible split, or None
///
/// # Returns
/// A tuple (train_samples, val_samples)
pub fn split_train_val<T>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    seed:           Option<u64>,
) -> (Vec<T>, Vec<T>) {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None    => StdRng::from_entropy(),
    };

    // Fisher-Yates shuffle — every permutation is equally likely
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = split_at.min(total);

    // split_off(n) removes elements [n..] from the Vec and returns them
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total.max(1),
        (val.len()     * 100) / total.max(1),
    );

    (samples, val)
}
