// Photo-platform collection
// Handle discovery via video-channel descriptions, verification, then
// engagement metrics over the most recent posts.

use std::collections::HashSet;

use async_trait::async_trait;
use radar_types::{ArtistRecord, InstagramProfileRow};
use tracing::{debug, info, warn};

use super::{read_artists, round_to};
use crate::collector::{run_pass, ArtistStep, CancelFlag, CheckpointStore, PassContext, PassReport, Step};
use crate::config::Config;
use crate::error::CollectResult;
use crate::matching::{extract_handles, rank_channels, verify_handle, ChannelCandidate, Verification};
use crate::services::{ChannelSource, PostSnapshot, ProfileSnapshot, ProfileSource};

pub const SOURCE: &str = "instagram";

/// Handles to try when no description mentions one: the squashed name, the
/// same without "the", and the usual suffixes.
pub fn name_variations(artist_name: &str) -> Vec<String> {
    let base: String = artist_name
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();

    let mut variations = vec![
        base.clone(),
        base.replace("the", ""),
        format!("{}music", base),
        format!("{}official", base),
    ];
    let mut seen = HashSet::new();
    variations.retain(|v| v.len() > 1 && seen.insert(v.clone()));
    variations
}

/// Engagement figures over a post sample. `None` without posts.
pub fn profile_row(
    artist: &ArtistRecord,
    profile: &ProfileSnapshot,
    posts: &[PostSnapshot],
) -> Option<InstagramProfileRow> {
    if posts.is_empty() {
        return None;
    }

    let n = posts.len() as f64;
    let avg_likes = posts.iter().map(|p| p.likes.unwrap_or(0)).sum::<u64>() as f64 / n;
    let avg_comments = posts.iter().map(|p| p.comments.unwrap_or(0)).sum::<u64>() as f64 / n;
    let followers = profile.followers.unwrap_or(0);
    let engagement_rate = if followers > 0 {
        (avg_likes + avg_comments) / followers as f64 * 100.0
    } else {
        0.0
    };

    Some(InstagramProfileRow {
        artist_id: artist.artist_id.clone(),
        artist_name: artist.artist_name.clone(),
        handle: profile.handle.to_lowercase(),
        followers: profile.followers,
        following: profile.following,
        posts: profile.posts,
        avg_likes: Some(round_to(avg_likes, 2)),
        avg_comments: Some(round_to(avg_comments, 2)),
        engagement_rate: Some(round_to(engagement_rate, 2)),
        reels_count: Some(posts.iter().filter(|p| p.is_video).count() as u64),
        verified: profile.verified,
    })
}

pub struct InstagramStep<'a> {
    pub profiles: &'a dyn ProfileSource,
    /// Without a video platform only name variations are tried.
    pub channels: Option<&'a dyn ChannelSource>,
    pub config: &'a Config,
    pub cancel: &'a CancelFlag,
}

impl InstagramStep<'_> {
    /// Verify candidates in order, skipping ones already tried for this
    /// artist. A rate limit ends the search so the stage can cool down.
    async fn first_verified(
        &self,
        handles: impl IntoIterator<Item = String>,
        artist_name: &str,
        tried: &mut HashSet<String>,
    ) -> CollectResult<Option<ProfileSnapshot>> {
        for handle in handles {
            if !tried.insert(handle.clone()) {
                continue;
            }
            match verify_handle(self.profiles, &handle, artist_name, &self.config.verifier).await {
                Verification::Verified(profile) => {
                    return Ok(Some(ProfileSnapshot { handle, ..profile }));
                }
                Verification::Transient(e) if e.is_rate_limited() => return Err(e),
                Verification::Transient(e) | Verification::Fatal(e) => {
                    debug!("   @{} not checked: {}", handle, e);
                }
                Verification::Rejected | Verification::NotFound => {}
            }
        }
        Ok(None)
    }

    /// The artist's best video channel, ranked the same way as video collection.
    async fn best_channel(
        &self,
        channels: &dyn ChannelSource,
        artist_name: &str,
    ) -> CollectResult<Option<ChannelCandidate>> {
        let ids = channels
            .search_channels(&format!("{} music", artist_name), self.config.youtube.search_results)
            .await?;
        if ids.is_empty() {
            return Ok(None);
        }
        let candidates: Vec<ChannelCandidate> = channels
            .channel_details(&ids)
            .await?
            .into_iter()
            .map(|c| ChannelCandidate {
                id: c.id,
                title: c.title,
                description: c.description,
                subscribers: c.subscribers.unwrap_or(0),
            })
            .collect();

        let best = rank_channels(artist_name, &candidates, &self.config.ranker);
        Ok(best.and_then(|b| candidates.into_iter().find(|c| c.id == b.id)))
    }

    /// Handles mentioned by the artist's channel: its description first,
    /// then recent upload descriptions. Video-platform failures only end
    /// this route; profile rate limits propagate.
    async fn from_channel(
        &self,
        channels: &dyn ChannelSource,
        artist_name: &str,
        tried: &mut HashSet<String>,
    ) -> CollectResult<Option<ProfileSnapshot>> {
        let channel = match self.best_channel(channels, artist_name).await {
            Ok(Some(channel)) => channel,
            Ok(None) => return Ok(None),
            Err(e) => {
                debug!("   Channel search for {} failed: {}", artist_name, e);
                return Ok(None);
            }
        };
        debug!("   Channel: {} ({} subscribers)", channel.title, channel.subscribers);

        let handles = extract_handles(&channel.description);
        if let Some(profile) = self.first_verified(handles, artist_name, tried).await? {
            return Ok(Some(profile));
        }

        let max_videos = self.config.instagram.max_videos as u32;
        let videos = match channels.recent_video_ids(&channel.id, max_videos).await {
            Ok(ids) => channels.videos(&ids).await,
            Err(e) => Err(e),
        };
        let videos = match videos {
            Ok(videos) => videos,
            Err(e) => {
                debug!("   Recent uploads of {} unavailable: {}", channel.id, e);
                return Ok(None);
            }
        };

        for video in videos {
            let handles = extract_handles(&video.description);
            if let Some(profile) = self.first_verified(handles, artist_name, tried).await? {
                return Ok(Some(profile));
            }
            self.cancel.sleep(self.config.instagram.video_delay).await;
        }
        Ok(None)
    }

    pub async fn find_profile(&self, artist_name: &str) -> CollectResult<Option<ProfileSnapshot>> {
        let mut tried = HashSet::new();

        if let Some(channels) = self.channels {
            if let Some(profile) = self.from_channel(channels, artist_name, &mut tried).await? {
                return Ok(Some(profile));
            }
        }

        self.first_verified(name_variations(artist_name), artist_name, &mut tried)
            .await
    }
}

#[async_trait]
impl<'a> ArtistStep for InstagramStep<'a> {
    type Row = InstagramProfileRow;

    async fn collect(&mut self, artist: &ArtistRecord) -> CollectResult<Step<InstagramProfileRow>> {
        debug!("🔍 Searching Instagram handle for {}", artist.artist_name);

        let Some(profile) = self.find_profile(&artist.artist_name).await? else {
            debug!("   No verified handle for {}", artist.artist_name);
            return Ok(Step::NoMatch);
        };

        let posts = self
            .profiles
            .recent_posts(&profile.handle, self.config.instagram.max_posts)
            .await?;

        match profile_row(artist, &profile, &posts) {
            Some(row) => {
                info!(
                    "   📸 @{} for {} ({} followers, {:.1}% engagement)",
                    row.handle,
                    artist.artist_name,
                    row.followers.unwrap_or(0),
                    row.engagement_rate.unwrap_or(0.0)
                );
                Ok(Step::Collected(row))
            }
            None => {
                warn!("   @{} has no readable posts", profile.handle);
                Ok(Step::NoMatch)
            }
        }
    }
}

pub async fn collect_instagram(
    config: &Config,
    profiles: &dyn ProfileSource,
    channels: Option<&dyn ChannelSource>,
    checkpoint: &dyn CheckpointStore,
    cancel: &CancelFlag,
) -> CollectResult<PassReport> {
    let artists = read_artists(&config.lastfm_table())?;
    info!("📸 Instagram collection over {} artists", artists.len());
    if channels.is_none() {
        warn!("⚠️  No video platform client, only name-based handles will be tried");
    }

    let table = config.instagram_table();
    let partial = config.partial_table(SOURCE);
    let ctx = PassContext {
        source: SOURCE,
        table: &table,
        partial_table: &partial,
        checkpoint,
        cancel,
        checkpoint_interval: config.checkpoint_interval,
        retry: &config.artist_retry,
        pace: config.instagram.artist_delay,
        show_progress: config.show_progress,
    };
    let mut step = InstagramStep {
        profiles,
        channels,
        config,
        cancel,
    };
    run_pass(&ctx, &artists, &mut step).await
}
