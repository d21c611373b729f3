// External data sources
// Collectors only see these traits; the HTTP clients behind them are built
// once in main and passed down by reference.

use async_trait::async_trait;

use crate::error::CollectResult;

pub mod apify;
pub mod lastfm;
pub(crate) mod string_count;
pub mod youtube;

// ============================================================================
// Video platform
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelDetails {
    pub id: String,
    pub title: String,
    pub description: String,
    pub subscribers: Option<u64>,
    pub total_views: Option<u64>,
    pub video_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoDetails {
    pub id: String,
    pub description: String,
    pub views: Option<u64>,
}

#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Channel ids matching a free-text query, in the platform's order.
    async fn search_channels(&self, query: &str, max_results: u32) -> CollectResult<Vec<String>>;

    async fn channel_details(&self, ids: &[String]) -> CollectResult<Vec<ChannelDetails>>;

    /// Most recent uploads of a channel, newest first.
    async fn recent_video_ids(&self, channel_id: &str, max_results: u32)
        -> CollectResult<Vec<String>>;

    async fn videos(&self, ids: &[String]) -> CollectResult<Vec<VideoDetails>>;
}

// ============================================================================
// Photo platform
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSnapshot {
    pub handle: String,
    pub full_name: Option<String>,
    pub biography: Option<String>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub posts: Option<u64>,
    pub verified: Option<bool>,
    pub private: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostSnapshot {
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub is_video: bool,
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// `NotFound` when no account has this handle.
    async fn profile(&self, handle: &str) -> CollectResult<ProfileSnapshot>;

    async fn recent_posts(&self, handle: &str, limit: usize) -> CollectResult<Vec<PostSnapshot>>;
}

// ============================================================================
// Listening statistics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtistInfo {
    pub name: String,
    pub listeners: u64,
    pub playcount: u64,
    pub url: Option<String>,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait ListeningStatsSource: Send + Sync {
    async fn top_artists_by_tag(&self, tag: &str, limit: u32) -> CollectResult<Vec<String>>;

    async fn top_artists_by_country(&self, country: &str, limit: u32)
        -> CollectResult<Vec<String>>;

    async fn artist_info(&self, name: &str) -> CollectResult<ArtistInfo>;
}
