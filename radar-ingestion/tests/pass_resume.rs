mod common;

use std::time::Duration;

use async_trait::async_trait;
use radar_ingestion::collector::{
    run_pass, ArtistStep, BackoffPolicy, CancelFlag, CheckpointStore, JsonCheckpointStore,
    PassContext, Step,
};
use radar_ingestion::error::{CollectError, CollectResult};
use radar_ingestion::repository::read_table;
use radar_types::{ArtistRecord, YoutubeChannelRow};
use tempfile::tempdir;

use common::artist;

/// Collects a row for every artist, with scripted interruptions.
struct ScriptedStep {
    seen: Vec<String>,
    cancel_after: Option<(usize, CancelFlag)>,
    /// Returned once, for the named artist.
    fail_on: Option<(String, CollectError)>,
}

impl ScriptedStep {
    fn new() -> Self {
        Self {
            seen: Vec::new(),
            cancel_after: None,
            fail_on: None,
        }
    }
}

#[async_trait]
impl ArtistStep for ScriptedStep {
    type Row = YoutubeChannelRow;

    async fn collect(&mut self, artist: &ArtistRecord) -> CollectResult<Step<YoutubeChannelRow>> {
        if let Some((name, _)) = &self.fail_on {
            if *name == artist.artist_name {
                if let Some((_, err)) = self.fail_on.take() {
                    return Err(err);
                }
            }
        }
        self.seen.push(artist.artist_name.clone());
        if let Some((n, flag)) = &self.cancel_after {
            if self.seen.len() == *n {
                flag.cancel();
            }
        }
        if artist.artist_name.starts_with("Nobody") {
            return Ok(Step::NoMatch);
        }
        Ok(Step::Collected(channel_row(artist)))
    }
}

fn artists(names: &[&str]) -> Vec<ArtistRecord> {
    names.iter().map(|n| artist(n, 10_000)).collect()
}

fn channel_row(artist: &ArtistRecord) -> YoutubeChannelRow {
    YoutubeChannelRow {
        artist_id: artist.artist_id.clone(),
        artist_name: artist.artist_name.clone(),
        channel_id: format!("UC-{}", artist.artist_name),
        subscribers: Some(1_000),
        total_views: None,
        video_count: None,
        avg_views_per_video: None,
    }
}

/// Three attempts per artist, no waiting in between.
fn quick_retry() -> BackoffPolicy {
    BackoffPolicy::new(3, Duration::ZERO, Duration::ZERO)
}

#[tokio::test]
async fn test_interrupted_pass_resumes_at_cursor() {
    let dir = tempdir().unwrap();
    let table = dir.path().join("youtube.csv");
    let partial = dir.path().join("youtube_partial.csv");
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let list = artists(&["Alpha", "Bravo", "Charlie", "Delta"]);

    let cancel = CancelFlag::new();
    let retry = quick_retry();
    let ctx = PassContext {
        source: "youtube",
        table: &table,
        partial_table: &partial,
        checkpoint: &store,
        cancel: &cancel,
        retry: &retry,
        checkpoint_interval: 1,
        pace: Duration::ZERO,
        show_progress: false,
    };
    let mut step = ScriptedStep::new();
    step.cancel_after = Some((2, cancel.clone()));

    let report = run_pass(&ctx, &list, &mut step).await.unwrap();
    assert!(report.interrupted);
    assert_eq!(report.processed, 2);
    assert_eq!(step.seen, vec!["Alpha", "Bravo"]);

    // Collected rows wait in the side table; the main table is untouched.
    let state = store.load().unwrap();
    assert_eq!(state.cursor("youtube"), 2);
    assert!(state.interrupted);
    assert!(!table.exists());
    let pending: Vec<YoutubeChannelRow> = read_table(&partial).unwrap();
    assert_eq!(pending.len(), 2);

    let fresh = CancelFlag::new();
    let ctx = PassContext {
        cancel: &fresh,
        ..ctx
    };
    let mut step = ScriptedStep::new();
    let report = run_pass(&ctx, &list, &mut step).await.unwrap();

    assert!(!report.interrupted);
    assert_eq!(step.seen, vec!["Charlie", "Delta"]);
    assert_eq!(report.table_rows, 4);
    assert!(!partial.exists());
    assert_eq!(store.load().unwrap().cursor("youtube"), 0);
    assert!(!store.load().unwrap().cursors.contains_key("youtube"));
}

#[tokio::test]
async fn test_stage_error_keeps_progress_and_cursor() {
    let dir = tempdir().unwrap();
    let table = dir.path().join("youtube.csv");
    let partial = dir.path().join("youtube_partial.csv");
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let list = artists(&["Alpha", "Bravo", "Charlie", "Delta", "Echo"]);
    let cancel = CancelFlag::new();
    let retry = quick_retry();

    let ctx = PassContext {
        source: "youtube",
        table: &table,
        partial_table: &partial,
        checkpoint: &store,
        cancel: &cancel,
        retry: &retry,
        checkpoint_interval: 2,
        pace: Duration::ZERO,
        show_progress: false,
    };
    let mut step = ScriptedStep::new();
    step.fail_on = Some((
        "Delta".to_string(),
        CollectError::RateLimited("quota".to_string()),
    ));

    let err = run_pass(&ctx, &list, &mut step).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(store.load().unwrap().cursor("youtube"), 3);
    let pending: Vec<YoutubeChannelRow> = read_table(&partial).unwrap();
    assert_eq!(pending.len(), 3);

    let mut step = ScriptedStep::new();
    let report = run_pass(&ctx, &list, &mut step).await.unwrap();
    assert_eq!(step.seen, vec!["Delta", "Echo"]);
    assert_eq!(report.table_rows, 5);
}

#[tokio::test]
async fn test_skippable_errors_and_no_match_are_counted() {
    let dir = tempdir().unwrap();
    let table = dir.path().join("youtube.csv");
    let partial = dir.path().join("youtube_partial.csv");
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let list = artists(&["Alpha", "Nobody Here", "Charlie"]);
    let cancel = CancelFlag::new();
    let retry = quick_retry();

    let ctx = PassContext {
        source: "youtube",
        table: &table,
        partial_table: &partial,
        checkpoint: &store,
        cancel: &cancel,
        retry: &retry,
        checkpoint_interval: 50,
        pace: Duration::ZERO,
        show_progress: false,
    };
    let mut step = ScriptedStep::new();
    step.fail_on = Some((
        "Charlie".to_string(),
        CollectError::Malformed("bad body".to_string()),
    ));

    let report = run_pass(&ctx, &list, &mut step).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.collected, 1);
    assert_eq!(report.no_match, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.table_rows, 1);

    let rows: Vec<YoutubeChannelRow> = read_table(&table).unwrap();
    assert_eq!(rows[0].artist_name, "Alpha");
}

#[tokio::test]
async fn test_cursor_past_end_starts_over() {
    let dir = tempdir().unwrap();
    let table = dir.path().join("youtube.csv");
    let partial = dir.path().join("youtube_partial.csv");
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    store
        .update(&mut |state| {
            state.cursors.insert("youtube".to_string(), 40);
        })
        .unwrap();
    let list = artists(&["Alpha", "Bravo"]);
    let cancel = CancelFlag::new();
    let retry = quick_retry();

    let ctx = PassContext {
        source: "youtube",
        table: &table,
        partial_table: &partial,
        checkpoint: &store,
        cancel: &cancel,
        retry: &retry,
        checkpoint_interval: 50,
        pace: Duration::ZERO,
        show_progress: false,
    };
    let mut step = ScriptedStep::new();
    run_pass(&ctx, &list, &mut step).await.unwrap();
    assert_eq!(step.seen, vec!["Alpha", "Bravo"]);
}

// ============================================================================
// Transient failures
// ============================================================================

#[tokio::test]
async fn test_transient_error_is_retried_for_same_artist() {
    let dir = tempdir().unwrap();
    let table = dir.path().join("youtube.csv");
    let partial = dir.path().join("youtube_partial.csv");
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let list = artists(&["Alpha", "Bravo", "Charlie"]);
    let cancel = CancelFlag::new();
    let retry = quick_retry();

    let ctx = PassContext {
        source: "youtube",
        table: &table,
        partial_table: &partial,
        checkpoint: &store,
        cancel: &cancel,
        retry: &retry,
        checkpoint_interval: 50,
        pace: Duration::ZERO,
        show_progress: false,
    };
    let mut step = ScriptedStep::new();
    step.fail_on = Some((
        "Bravo".to_string(),
        CollectError::TransientNetwork("connection reset".to_string()),
    ));

    let report = run_pass(&ctx, &list, &mut step).await.unwrap();
    assert_eq!(step.seen, vec!["Alpha", "Bravo", "Charlie"]);
    assert_eq!(report.collected, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.table_rows, 3);
}

/// Times out on every attempt for one artist.
struct TimingOutStep {
    stuck_on: String,
    attempts: usize,
}

#[async_trait]
impl ArtistStep for TimingOutStep {
    type Row = YoutubeChannelRow;

    async fn collect(&mut self, artist: &ArtistRecord) -> CollectResult<Step<YoutubeChannelRow>> {
        if artist.artist_name == self.stuck_on {
            self.attempts += 1;
            return Err(CollectError::Timeout("search took too long".to_string()));
        }
        Ok(Step::Collected(channel_row(artist)))
    }
}

#[tokio::test]
async fn test_artist_skipped_once_retries_are_spent() {
    let dir = tempdir().unwrap();
    let table = dir.path().join("youtube.csv");
    let partial = dir.path().join("youtube_partial.csv");
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let list = artists(&["Alpha", "Bravo", "Charlie"]);
    let cancel = CancelFlag::new();
    let retry = quick_retry();

    let ctx = PassContext {
        source: "youtube",
        table: &table,
        partial_table: &partial,
        checkpoint: &store,
        cancel: &cancel,
        retry: &retry,
        checkpoint_interval: 50,
        pace: Duration::ZERO,
        show_progress: false,
    };
    let mut step = TimingOutStep {
        stuck_on: "Bravo".to_string(),
        attempts: 0,
    };

    let report = run_pass(&ctx, &list, &mut step).await.unwrap();
    assert_eq!(step.attempts, 3);
    assert_eq!(report.processed, 3);
    assert_eq!(report.collected, 2);
    assert_eq!(report.skipped, 1);
}

/// Fails transiently for one artist and asks for shutdown at the same time.
struct ShutdownDuringFailureStep {
    fails_on: String,
    cancel: CancelFlag,
    seen: Vec<String>,
}

#[async_trait]
impl ArtistStep for ShutdownDuringFailureStep {
    type Row = YoutubeChannelRow;

    async fn collect(&mut self, artist: &ArtistRecord) -> CollectResult<Step<YoutubeChannelRow>> {
        self.seen.push(artist.artist_name.clone());
        if artist.artist_name == self.fails_on {
            self.cancel.cancel();
            return Err(CollectError::TransientNetwork("connection reset".to_string()));
        }
        Ok(Step::Collected(channel_row(artist)))
    }
}

#[tokio::test]
async fn test_cancel_during_retry_wait_keeps_artist() {
    let dir = tempdir().unwrap();
    let table = dir.path().join("youtube.csv");
    let partial = dir.path().join("youtube_partial.csv");
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let list = artists(&["Alpha", "Bravo", "Charlie"]);
    let cancel = CancelFlag::new();
    let retry = BackoffPolicy::new(3, Duration::from_secs(3600), Duration::ZERO);

    let ctx = PassContext {
        source: "youtube",
        table: &table,
        partial_table: &partial,
        checkpoint: &store,
        cancel: &cancel,
        retry: &retry,
        checkpoint_interval: 50,
        pace: Duration::ZERO,
        show_progress: false,
    };
    let mut step = ShutdownDuringFailureStep {
        fails_on: "Bravo".to_string(),
        cancel: cancel.clone(),
        seen: Vec::new(),
    };

    let report = run_pass(&ctx, &list, &mut step).await.unwrap();
    assert!(report.interrupted);
    assert_eq!(step.seen, vec!["Alpha", "Bravo"]);
    // Bravo is tried again on the next run rather than counted as skipped.
    assert_eq!(report.skipped, 0);
    assert_eq!(report.processed, 1);
    assert_eq!(store.load().unwrap().cursor("youtube"), 1);
    let pending: Vec<YoutubeChannelRow> = read_table(&partial).unwrap();
    assert_eq!(pending.len(), 1);
}

// ============================================================================
// Periodic flush
// ============================================================================

/// Never returns for the artist at `hang_at`.
struct HangingStep {
    hang_at: usize,
    calls: usize,
}

#[async_trait]
impl ArtistStep for HangingStep {
    type Row = YoutubeChannelRow;

    async fn collect(&mut self, artist: &ArtistRecord) -> CollectResult<Step<YoutubeChannelRow>> {
        let idx = self.calls;
        self.calls += 1;
        if idx == self.hang_at {
            std::future::pending::<()>().await;
        }
        Ok(Step::Collected(channel_row(artist)))
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropped_pass_loses_less_than_one_interval() {
    let dir = tempdir().unwrap();
    let table = dir.path().join("youtube.csv");
    let partial = dir.path().join("youtube_partial.csv");
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let names: Vec<String> = (0..10).map(|i| format!("Artist {}", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let list = artists(&names);
    let cancel = CancelFlag::new();
    let retry = quick_retry();

    let ctx = PassContext {
        source: "youtube",
        table: &table,
        partial_table: &partial,
        checkpoint: &store,
        cancel: &cancel,
        retry: &retry,
        checkpoint_interval: 4,
        pace: Duration::ZERO,
        show_progress: false,
    };
    let mut step = HangingStep {
        hang_at: 6,
        calls: 0,
    };

    // The process dies while artist 6 is in flight; no cleanup code runs.
    let outcome =
        tokio::time::timeout(Duration::from_secs(5), run_pass(&ctx, &list, &mut step)).await;
    assert!(outcome.is_err());

    // Artists 0..4 were flushed at the interval; 4 and 5 are lost.
    let saved: Vec<YoutubeChannelRow> = read_table(&partial).unwrap();
    assert_eq!(saved.len(), 4);
    assert_eq!(saved[3].artist_name, "Artist 3");
    let state = store.load().unwrap();
    assert_eq!(state.cursor("youtube"), 4);
    assert!(!state.interrupted);
    assert!(!table.exists());
}
