// Video-platform collection
// Channel search → ranking → statistics, with a running API quota estimate

use async_trait::async_trait;
use radar_types::{ArtistRecord, YoutubeChannelRow};
use tracing::{debug, info, warn};

use super::{read_artists, round_to};
use crate::collector::{run_pass, ArtistStep, CancelFlag, CheckpointStore, PassContext, PassReport, Step};
use crate::config::Config;
use crate::error::CollectResult;
use crate::matching::{rank_channels, ChannelCandidate};
use crate::services::{ChannelDetails, ChannelSource};

pub const SOURCE: &str = "youtube";

// Approximate API units per call
const SEARCH_COST: u32 = 100;
const CHANNEL_COST: u32 = 1;
const RECENT_VIDEOS_COST: u32 = 2;

fn channel_average(details: &ChannelDetails) -> f64 {
    match (details.total_views, details.video_count) {
        (Some(views), Some(videos)) if videos > 0 => round_to(views as f64 / videos as f64, 0),
        _ => 0.0,
    }
}

pub struct YoutubeStep<'a> {
    pub channels: &'a dyn ChannelSource,
    pub config: &'a Config,
    pub quota_used: u32,
}

impl YoutubeStep<'_> {
    /// Mean views over the most recent uploads, `None` if there are none.
    async fn recent_average(&mut self, channel_id: &str) -> CollectResult<Option<f64>> {
        self.quota_used += RECENT_VIDEOS_COST;
        let ids = self
            .channels
            .recent_video_ids(channel_id, self.config.youtube.recent_videos)
            .await?;
        let videos = self.channels.videos(&ids).await?;
        if videos.is_empty() {
            return Ok(None);
        }
        let total: u64 = videos.iter().map(|v| v.views.unwrap_or(0)).sum();
        Ok(Some(round_to(total as f64 / videos.len() as f64, 0)))
    }
}

#[async_trait]
impl<'a> ArtistStep for YoutubeStep<'a> {
    type Row = YoutubeChannelRow;

    async fn collect(&mut self, artist: &ArtistRecord) -> CollectResult<Step<YoutubeChannelRow>> {
        if self.quota_used > self.config.youtube.quota_ceiling {
            warn!(
                "⚠️  Approaching API quota limit ({} units used), stopping until the next run",
                self.quota_used
            );
            return Ok(Step::StopPass);
        }

        let query = format!("{} music official", artist.artist_name);
        self.quota_used += SEARCH_COST;
        let ids = self
            .channels
            .search_channels(&query, self.config.youtube.search_results)
            .await?;
        if ids.is_empty() {
            debug!("   No channels for {}", artist.artist_name);
            return Ok(Step::NoMatch);
        }

        self.quota_used += CHANNEL_COST;
        let details = self.channels.channel_details(&ids).await?;
        let candidates: Vec<ChannelCandidate> = details
            .iter()
            .map(|c| ChannelCandidate {
                id: c.id.clone(),
                title: c.title.clone(),
                description: c.description.clone(),
                subscribers: c.subscribers.unwrap_or(0),
            })
            .collect();

        let Some(best) = rank_channels(&artist.artist_name, &candidates, &self.config.ranker) else {
            debug!("   No channel scored high enough for {}", artist.artist_name);
            return Ok(Step::NoMatch);
        };
        let Some(channel) = details.into_iter().find(|c| c.id == best.id) else {
            return Ok(Step::NoMatch);
        };

        let ranker = &self.config.ranker;
        let subscribers = channel.subscribers.unwrap_or(0);
        if !(ranker.plausible_min..=ranker.plausible_max).contains(&subscribers) {
            debug!(
                "   {} filtered out ({} subscribers)",
                channel.title, subscribers
            );
            return Ok(Step::NoMatch);
        }

        let avg_views = match self.recent_average(&channel.id).await {
            Ok(Some(avg)) => avg,
            Ok(None) => channel_average(&channel),
            Err(e) if e.is_skippable() => {
                debug!("   Recent uploads of {} unavailable: {}", channel.id, e);
                channel_average(&channel)
            }
            Err(e) => return Err(e),
        };

        info!(
            "   ▶️  {} → {} ({} subscribers)",
            artist.artist_name, channel.title, subscribers
        );
        Ok(Step::Collected(YoutubeChannelRow {
            artist_id: artist.artist_id.clone(),
            artist_name: artist.artist_name.clone(),
            channel_id: channel.id,
            subscribers: Some(subscribers),
            total_views: channel.total_views,
            video_count: channel.video_count,
            avg_views_per_video: Some(avg_views),
        }))
    }
}

pub async fn collect_youtube(
    config: &Config,
    channels: &dyn ChannelSource,
    checkpoint: &dyn CheckpointStore,
    cancel: &CancelFlag,
) -> CollectResult<PassReport> {
    let artists = read_artists(&config.lastfm_table())?;
    info!("▶️  YouTube collection over {} artists", artists.len());

    let table = config.youtube_table();
    let partial = config.partial_table(SOURCE);
    let ctx = PassContext {
        source: SOURCE,
        table: &table,
        partial_table: &partial,
        checkpoint,
        cancel,
        checkpoint_interval: config.checkpoint_interval,
        retry: &config.artist_retry,
        pace: config.youtube.artist_delay,
        show_progress: config.show_progress,
    };
    let mut step = YoutubeStep {
        channels,
        config,
        quota_used: 0,
    };
    let report = run_pass(&ctx, &artists, &mut step).await?;
    info!("📈 API quota used: ~{} units", step.quota_used);
    Ok(report)
}
