// Automated collection loop
// discover → instagram → youtube → merge → score, repeated until stopped.
// Each stage is retried under its own backoff policy and a failed stage
// never stops the ones after it.

use std::fmt;

use chrono::Utc;
use radar_types::SourceStats;
use tracing::{error, info, warn};

use super::{discover, instagram, merge, score, youtube};
use crate::collector::{
    mark_interrupted, run_with_backoff, BackoffPolicy, CancelFlag, CheckpointStore, UnitFailure,
};
use crate::config::{AutomationConfig, Config};
use crate::error::CollectResult;
use crate::repository::count_rows;
use crate::services::{ChannelSource, ListeningStatsSource, ProfileSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discover,
    Instagram,
    Youtube,
    Merge,
    Score,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Discover,
        Stage::Instagram,
        Stage::Youtube,
        Stage::Merge,
        Stage::Score,
    ];

    pub fn policy<'a>(&self, automation: &'a AutomationConfig) -> &'a BackoffPolicy {
        match self {
            Stage::Discover => &automation.discover,
            Stage::Instagram => &automation.instagram,
            Stage::Youtube => &automation.youtube,
            Stage::Merge => &automation.merge,
            Stage::Score => &automation.score,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Discover => "listening-stats discovery",
            Stage::Instagram => "Instagram collection",
            Stage::Youtube => "YouTube collection",
            Stage::Merge => "merge",
            Stage::Score => "scoring",
        })
    }
}

/// Clients available to the loop. A stage whose client is missing is skipped.
#[derive(Clone, Copy, Default)]
pub struct Sources<'a> {
    pub stats: Option<&'a dyn ListeningStatsSource>,
    pub profiles: Option<&'a dyn ProfileSource>,
    pub channels: Option<&'a dyn ChannelSource>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutomationSummary {
    pub iterations: u32,
    pub failed_stages: Vec<(u32, Stage)>,
    pub interrupted: bool,
    pub stats: SourceStats,
    /// Instagram stages preceded by a cool-down after an earlier rate limit.
    pub instagram_cooldowns: u32,
}

pub fn current_stats(config: &Config) -> SourceStats {
    SourceStats {
        lastfm_artists: count_rows(&config.lastfm_table()),
        instagram_data: count_rows(&config.instagram_table()),
        youtube_data: count_rows(&config.youtube_table()),
        merged_data: count_rows(&config.merged_table()),
    }
}

async fn run_stage(
    stage: Stage,
    config: &Config,
    sources: Sources<'_>,
    checkpoint: &dyn CheckpointStore,
    cancel: &CancelFlag,
) -> CollectResult<()> {
    match stage {
        Stage::Discover => match sources.stats {
            Some(stats) => discover::discover(config, stats, cancel).await.map(|_| ()),
            None => {
                warn!("⚠️  LASTFM_API_KEY not set, skipping discovery");
                Ok(())
            }
        },
        Stage::Instagram => match sources.profiles {
            Some(profiles) => {
                instagram::collect_instagram(config, profiles, sources.channels, checkpoint, cancel)
                    .await
                    .map(|_| ())
            }
            None => {
                warn!("⚠️  APIFY_API_TOKEN not set, skipping Instagram collection");
                Ok(())
            }
        },
        Stage::Youtube => match sources.channels {
            Some(channels) => youtube::collect_youtube(config, channels, checkpoint, cancel)
                .await
                .map(|_| ()),
            None => {
                warn!("⚠️  YOUTUBE_API_KEY not set, skipping YouTube collection");
                Ok(())
            }
        },
        Stage::Merge => merge::merge(config).map(|_| ()),
        Stage::Score => score::score(config).map(|_| ()),
    }
}

fn log_stats(label: &str, stats: &SourceStats) {
    info!("{}", label);
    info!("   Total Last.fm artists: {}", stats.lastfm_artists);
    info!("   Artists with Instagram data: {}", stats.instagram_data);
    info!("   Artists with YouTube data: {}", stats.youtube_data);
    info!("   Total merged artists: {}", stats.merged_data);
}

fn log_stage_gain(stage: Stage, before: &SourceStats, after: &SourceStats) {
    let gained = |b: usize, a: usize| a.saturating_sub(b);
    match stage {
        Stage::Discover => info!(
            "   Added {} new Last.fm artists",
            gained(before.lastfm_artists, after.lastfm_artists)
        ),
        Stage::Instagram => info!(
            "   Added Instagram data for {} artists",
            gained(before.instagram_data, after.instagram_data)
        ),
        Stage::Youtube => info!(
            "   Added YouTube data for {} artists",
            gained(before.youtube_data, after.youtube_data)
        ),
        Stage::Merge => info!("   Merged dataset holds {} artists", after.merged_data),
        Stage::Score => {}
    }
}

pub async fn run_automated(
    config: &Config,
    sources: Sources<'_>,
    checkpoint: &dyn CheckpointStore,
    cancel: &CancelFlag,
) -> CollectResult<AutomationSummary> {
    let automation = &config.automation;
    let mut iteration = checkpoint.load()?.iteration;
    let mut summary = AutomationSummary::default();
    // Set when the last Instagram stage gave up on a rate limit.
    let mut instagram_rate_limited = false;

    info!("{}", "=".repeat(80));
    info!("🤖 Starting Automated Data Collection");
    match automation.max_iterations {
        Some(max) => info!("Will run for {} iteration(s)", max),
        None => info!("Running indefinitely until stopped (Ctrl+C)"),
    }

    loop {
        if automation
            .max_iterations
            .is_some_and(|max| summary.iterations >= max)
        {
            info!("Reached maximum iterations. Stopping.");
            break;
        }
        if cancel.is_cancelled() {
            mark_interrupted(checkpoint)?;
            summary.interrupted = true;
            break;
        }

        iteration += 1;
        summary.iterations += 1;
        info!("{}", "=".repeat(80));
        info!("🔁 Starting iteration {}", iteration);
        let mut before = current_stats(config);
        log_stats("Current stats:", &before);

        for (i, stage) in Stage::ALL.into_iter().enumerate() {
            if i > 0 && !cancel.sleep(automation.stage_pause).await {
                break;
            }
            info!("--- Step {}: {} ---", i + 1, stage);

            if stage == Stage::Instagram && instagram_rate_limited {
                let wait = automation.instagram.rate_limit_delay;
                warn!(
                    "⏳ Instagram was rate limited last time, cooling down {}s before collecting",
                    wait.as_secs()
                );
                summary.instagram_cooldowns += 1;
                if !cancel.sleep(wait).await {
                    break;
                }
            }

            let result = run_with_backoff(
                &stage.to_string(),
                stage.policy(automation),
                automation.stage_timeout,
                cancel,
                || run_stage(stage, config, sources, checkpoint, cancel),
            )
            .await;

            if stage == Stage::Instagram {
                instagram_rate_limited =
                    matches!(&result, Err(UnitFailure::Exhausted(e)) if e.is_rate_limited());
            }

            match result {
                Ok(()) => {
                    let after = current_stats(config);
                    log_stage_gain(stage, &before, &after);
                    before = after;
                }
                Err(UnitFailure::Cancelled) => break,
                Err(UnitFailure::Exhausted(e)) => {
                    error!("❌ {} had issues, but continuing: {}", stage, e);
                    summary.failed_stages.push((iteration, stage));
                }
            }
            if cancel.is_cancelled() {
                break;
            }
        }

        let stats = current_stats(config);
        let interrupted = cancel.is_cancelled();
        checkpoint.update(&mut |state| {
            state.iteration = iteration;
            state.last_run = Some(Utc::now());
            state.stats = stats.clone();
            state.interrupted = interrupted;
        })?;
        summary.stats = stats.clone();

        if interrupted {
            warn!("🛑 Collection interrupted by user, checkpoint saved. You can resume later.");
            summary.interrupted = true;
            break;
        }

        log_stats(&format!("--- Iteration {} Complete ---", iteration), &stats);

        let more = automation
            .max_iterations
            .map_or(true, |max| summary.iterations < max);
        if more {
            info!(
                "⏳ Waiting {}s before next iteration. Press Ctrl+C to stop",
                automation.iteration_wait.as_secs()
            );
            if !cancel.sleep(automation.iteration_wait).await {
                warn!("🛑 Interrupted while waiting");
                mark_interrupted(checkpoint)?;
                summary.interrupted = true;
                break;
            }
        }
    }

    info!("🏁 Automated Data Collection Complete");
    Ok(summary)
}
