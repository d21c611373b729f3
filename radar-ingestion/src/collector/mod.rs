//! Long-running collection plumbing: retry policy, cancellation, checkpoint
//! storage and the resumable per-artist pass.

use indicatif::{ProgressBar, ProgressStyle};

pub mod backoff;
pub mod cancel;
pub mod checkpoint;
pub mod pass;

pub use backoff::{run_with_backoff, BackoffPolicy, UnitFailure};
pub use cancel::CancelFlag;
pub use checkpoint::{mark_interrupted, CheckpointStore, JsonCheckpointStore};
pub use pass::{run_pass, ArtistStep, PassContext, PassReport, Step};

/// Bar for a per-artist loop; hidden when progress output is turned off.
pub fn progress_bar(len: usize, label: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let template = format!(
        "{} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} artists ({{eta}}) {{msg}}",
        label
    );
    bar.set_style(
        ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar
}
