//! One resumable pass over the listening-stats artists for a single source.
//!
//! Artists are processed strictly in table order. Collected rows go to a
//! `<source>_partial.csv` side table every checkpoint interval, together
//! with a cursor in the checkpoint, so a crash or Ctrl-C loses at most one
//! interval of work. When the pass finishes, the side table is folded into
//! the source's main table and the cursor is cleared.
//!
//! A transient network error or timeout is retried for the same artist
//! under the pass's retry policy. The artist is skipped only once that
//! budget is spent.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use radar_types::{ArtistKeyed, ArtistRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use super::backoff::{BackoffPolicy, RetryDecision, RetryTracker, UnitOutcome};
use super::cancel::CancelFlag;
use super::checkpoint::CheckpointStore;
use super::progress_bar;
use crate::error::CollectResult;
use crate::repository::{read_optional_table, remove_table, upsert_table};

/// Result of processing one artist.
#[derive(Debug)]
pub enum Step<R> {
    Collected(R),
    NoMatch,
    /// Stop before this artist; the pass resumes here next time.
    StopPass,
}

/// Per-artist work of a collector.
#[async_trait]
pub trait ArtistStep: Send {
    type Row: Serialize + DeserializeOwned + ArtistKeyed + Send;

    async fn collect(&mut self, artist: &ArtistRecord) -> CollectResult<Step<Self::Row>>;
}

pub struct PassContext<'a> {
    /// Cursor key in the checkpoint and prefix of the side table.
    pub source: &'a str,
    pub table: &'a Path,
    pub partial_table: &'a Path,
    pub checkpoint: &'a dyn CheckpointStore,
    pub cancel: &'a CancelFlag,
    pub checkpoint_interval: usize,
    /// Retries of a single artist after a transient failure.
    pub retry: &'a BackoffPolicy,
    /// Pause between artists.
    pub pace: Duration,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub source: String,
    pub processed: usize,
    pub collected: usize,
    pub no_match: usize,
    pub skipped: usize,
    pub interrupted: bool,
    pub stopped_early: bool,
    /// Rows in the main table after the pass; zero if the pass was interrupted.
    pub table_rows: usize,
}

fn flush<R>(ctx: &PassContext<'_>, pending: &mut Vec<R>) -> CollectResult<()>
where
    R: Serialize + DeserializeOwned + ArtistKeyed,
{
    if pending.is_empty() {
        return Ok(());
    }
    let rows = std::mem::take(pending);
    let summary = upsert_table(ctx.partial_table, rows)?;
    info!(
        "💾 {} partial results saved ({} rows)",
        ctx.source, summary.total
    );
    Ok(())
}

fn save_cursor(ctx: &PassContext<'_>, position: usize, interrupted: bool) -> CollectResult<()> {
    ctx.checkpoint.update(&mut |state| {
        state.cursors.insert(ctx.source.to_string(), position);
        if interrupted {
            state.interrupted = true;
            state.last_run = Some(chrono::Utc::now());
        }
    })?;
    Ok(())
}

/// Fold the side table into the main table and drop it.
fn finish_tables<R>(ctx: &PassContext<'_>) -> CollectResult<usize>
where
    R: Serialize + DeserializeOwned + ArtistKeyed,
{
    let partial: Vec<R> = read_optional_table(ctx.partial_table)?.unwrap_or_default();
    let summary = upsert_table(ctx.table, partial)?;
    remove_table(ctx.partial_table)?;
    info!(
        "📊 {}: {} existing + {} new rows → {} unique artists",
        ctx.source, summary.existing, summary.added, summary.total
    );
    Ok(summary.total)
}

/// Collect one artist, retrying transient failures. `None` means the pass
/// was cancelled while waiting to retry.
async fn collect_with_retry<S: ArtistStep>(
    ctx: &PassContext<'_>,
    step: &mut S,
    artist: &ArtistRecord,
) -> Option<CollectResult<Step<S::Row>>> {
    let mut tracker = RetryTracker::default();
    loop {
        let result = step.collect(artist).await;
        if !matches!(&result, Err(e) if e.is_transient()) {
            return Some(result);
        }

        match ctx.retry.next(&mut tracker, UnitOutcome::of(&result)) {
            RetryDecision::RetryAfter(delay) => {
                if let Err(e) = &result {
                    warn!(
                        "🔁 {} failed for {} ({}), retrying in {}s",
                        ctx.source,
                        artist.artist_name,
                        e,
                        delay.as_secs()
                    );
                }
                if !ctx.cancel.sleep(delay).await {
                    return None;
                }
            }
            RetryDecision::Done | RetryDecision::GiveUp => return Some(result),
        }
    }
}

fn interrupt<R>(
    ctx: &PassContext<'_>,
    pending: &mut Vec<R>,
    idx: usize,
    total: usize,
) -> CollectResult<()>
where
    R: Serialize + DeserializeOwned + ArtistKeyed,
{
    warn!("🛑 {} pass interrupted at artist {}/{}", ctx.source, idx + 1, total);
    flush(ctx, pending)?;
    save_cursor(ctx, idx, true)
}

pub async fn run_pass<S: ArtistStep>(
    ctx: &PassContext<'_>,
    artists: &[ArtistRecord],
    step: &mut S,
) -> CollectResult<PassReport> {
    let total = artists.len();
    let mut report = PassReport {
        source: ctx.source.to_string(),
        ..Default::default()
    };

    let mut start = ctx.checkpoint.load()?.cursor(ctx.source);
    if start > total {
        warn!(
            "⚠️  {} cursor {} is past the end of {} artists, starting over",
            ctx.source, start, total
        );
        start = 0;
    }
    if start > 0 {
        info!("⏩ Resuming {} pass at artist {}/{}", ctx.source, start + 1, total);
    }

    let interval = ctx.checkpoint_interval.max(1);
    let progress = progress_bar(total, ctx.source, ctx.show_progress);
    progress.set_position(start as u64);

    let mut pending: Vec<S::Row> = Vec::new();
    let mut completed = true;

    for idx in start..total {
        if ctx.cancel.is_cancelled() {
            interrupt(ctx, &mut pending, idx, total)?;
            progress.abandon();
            report.interrupted = true;
            return Ok(report);
        }

        let artist = &artists[idx];
        progress.set_message(artist.artist_name.clone());

        let Some(result) = collect_with_retry(ctx, step, artist).await else {
            interrupt(ctx, &mut pending, idx, total)?;
            progress.abandon();
            report.interrupted = true;
            return Ok(report);
        };

        match result {
            Ok(Step::Collected(row)) => {
                report.collected += 1;
                pending.push(row);
            }
            Ok(Step::NoMatch) => report.no_match += 1,
            Ok(Step::StopPass) => {
                info!("⏹️  {} pass stopped before artist {}/{}", ctx.source, idx + 1, total);
                flush(ctx, &mut pending)?;
                save_cursor(ctx, idx, false)?;
                report.stopped_early = true;
                completed = false;
                break;
            }
            Err(e) if e.is_skippable() => {
                warn!("⚠️  Skipping {}: {}", artist.artist_name, e);
                report.skipped += 1;
            }
            Err(e) => {
                flush(ctx, &mut pending)?;
                save_cursor(ctx, idx, false)?;
                progress.abandon();
                return Err(e);
            }
        }

        report.processed += 1;
        progress.inc(1);

        if (idx + 1) % interval == 0 {
            flush(ctx, &mut pending)?;
            save_cursor(ctx, idx + 1, false)?;
        }

        // A cancelled sleep falls through to the check at the top.
        if idx + 1 < total {
            ctx.cancel.sleep(ctx.pace).await;
        }
    }

    progress.finish_and_clear();
    flush(ctx, &mut pending)?;
    report.table_rows = finish_tables::<S::Row>(ctx)?;

    if completed {
        ctx.checkpoint.update(&mut |state| {
            state.cursors.remove(ctx.source);
        })?;
    }

    info!(
        "✅ {} pass: {} processed, {} collected, {} no match, {} skipped",
        ctx.source, report.processed, report.collected, report.no_match, report.skipped
    );
    Ok(report)
}
