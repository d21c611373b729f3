use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Rows that belong to exactly one artist and can be deduplicated on that key.
pub trait ArtistKeyed {
    fn artist_id(&self) -> &str;
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    VideoChannel,
    PhotoProfile,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::VideoChannel => "youtube",
            Platform::PhotoProfile => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Per-source tables
// ============================================================================

/// One row of the listening-stats table. Produced by discovery, never edited
/// afterwards; re-discovering a name overwrites the row with the same id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub artist_name: String,
    #[serde(rename = "lastfm_listeners")]
    pub listeners: Option<u64>,
    #[serde(rename = "lastfm_playcount")]
    pub playcount: Option<u64>,
    #[serde(rename = "lastfm_playcount_per_listener")]
    pub plays_per_listener: Option<f64>,
    #[serde(rename = "lastfm_url")]
    pub url: Option<String>,
    pub genres: Option<String>,
    pub primary_genre: String,
    pub source: String,
    pub collection_date: Option<NaiveDate>,
    pub collection_timestamp: Option<DateTime<Utc>>,
}

impl ArtistKeyed for ArtistRecord {
    fn artist_id(&self) -> &str {
        &self.artist_id
    }
}

/// Verified photo-platform profile with engagement metrics over the recent post sample.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InstagramProfileRow {
    pub artist_id: String,
    pub artist_name: String,
    #[serde(rename = "instagram_handle")]
    pub handle: String,
    #[serde(rename = "instagram_followers")]
    pub followers: Option<u64>,
    #[serde(rename = "instagram_following")]
    pub following: Option<u64>,
    #[serde(rename = "instagram_posts")]
    pub posts: Option<u64>,
    #[serde(rename = "instagram_avg_likes")]
    pub avg_likes: Option<f64>,
    #[serde(rename = "instagram_avg_comments")]
    pub avg_comments: Option<f64>,
    /// Percentage, `(avg likes + avg comments) / followers * 100`.
    #[serde(rename = "instagram_engagement_rate")]
    pub engagement_rate: Option<f64>,
    #[serde(rename = "instagram_reels_count")]
    pub reels_count: Option<u64>,
    #[serde(rename = "instagram_verified")]
    pub verified: Option<bool>,
}

impl ArtistKeyed for InstagramProfileRow {
    fn artist_id(&self) -> &str {
        &self.artist_id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct YoutubeChannelRow {
    pub artist_id: String,
    pub artist_name: String,
    #[serde(rename = "youtube_channel_id")]
    pub channel_id: String,
    #[serde(rename = "youtube_subscribers")]
    pub subscribers: Option<u64>,
    #[serde(rename = "youtube_total_views")]
    pub total_views: Option<u64>,
    #[serde(rename = "youtube_video_count")]
    pub video_count: Option<u64>,
    #[serde(rename = "youtube_avg_views_per_video")]
    pub avg_views_per_video: Option<f64>,
}

impl ArtistKeyed for YoutubeChannelRow {
    fn artist_id(&self) -> &str {
        &self.artist_id
    }
}

/// A channel or profile being considered for an artist. Only lives while
/// ranking and verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialCandidate {
    pub platform: Platform,
    pub id: String,
    pub followers: u64,
    pub score: i32,
    pub evidence: String,
}

// ============================================================================
// Merged and scored tables
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MergedArtistRecord {
    pub artist_id: String,
    pub artist_name: String,
    pub lastfm_listeners: Option<u64>,
    pub lastfm_playcount: Option<u64>,
    pub lastfm_playcount_per_listener: Option<f64>,
    pub lastfm_url: Option<String>,
    pub genres: Option<String>,
    pub primary_genre: String,
    pub source: String,

    pub instagram_handle: Option<String>,
    pub instagram_followers: Option<u64>,
    pub instagram_following: Option<u64>,
    pub instagram_posts: Option<u64>,
    pub instagram_avg_likes: Option<f64>,
    pub instagram_avg_comments: Option<f64>,
    pub instagram_engagement_rate: Option<f64>,
    pub instagram_reels_count: Option<u64>,
    pub instagram_verified: Option<bool>,

    pub youtube_channel_id: Option<String>,
    pub youtube_subscribers: Option<u64>,
    pub youtube_total_views: Option<u64>,
    pub youtube_video_count: Option<u64>,
    pub youtube_avg_views_per_video: Option<f64>,

    pub collection_date: NaiveDate,
    pub last_updated: DateTime<Utc>,
    pub data_quality_score: f64,
}

impl ArtistKeyed for MergedArtistRecord {
    fn artist_id(&self) -> &str {
        &self.artist_id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrowthPotential {
    High,
    Medium,
    Low,
}

impl GrowthPotential {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthPotential::High => "High",
            GrowthPotential::Medium => "Medium",
            GrowthPotential::Low => "Low",
        }
    }
}

/// Final ranking row: every merged column plus the derived scores.
/// Recomputed from the merged table on every run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScoredArtistRecord {
    pub artist_id: String,
    pub artist_name: String,
    pub lastfm_listeners: Option<u64>,
    pub lastfm_playcount: Option<u64>,
    pub lastfm_playcount_per_listener: Option<f64>,
    pub lastfm_url: Option<String>,
    pub genres: Option<String>,
    pub primary_genre: String,
    pub source: String,

    pub instagram_handle: Option<String>,
    pub instagram_followers: Option<u64>,
    pub instagram_following: Option<u64>,
    pub instagram_posts: Option<u64>,
    pub instagram_avg_likes: Option<f64>,
    pub instagram_avg_comments: Option<f64>,
    pub instagram_engagement_rate: Option<f64>,
    pub instagram_reels_count: Option<u64>,
    pub instagram_verified: Option<bool>,

    pub youtube_channel_id: Option<String>,
    pub youtube_subscribers: Option<u64>,
    pub youtube_total_views: Option<u64>,
    pub youtube_video_count: Option<u64>,
    pub youtube_avg_views_per_video: Option<f64>,

    pub collection_date: NaiveDate,
    pub last_updated: DateTime<Utc>,
    pub data_quality_score: f64,

    pub underrated_ratio: Option<f64>,
    pub engagement_score: Option<f64>,
    pub platform_count: u8,
    pub growth_potential: GrowthPotential,
    pub priority_score: Option<f64>,
    pub follower_gap: Option<i64>,
}

// ============================================================================
// Checkpointing
// ============================================================================

/// Row counts of each persisted table at checkpoint time.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub lastfm_artists: usize,
    pub instagram_data: usize,
    pub youtube_data: usize,
    pub merged_data: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CheckpointState {
    #[serde(default)]
    pub iteration: u32,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: SourceStats,
    #[serde(default)]
    pub interrupted: bool,
    /// Artists already processed in the current pass, keyed by source name.
    #[serde(default)]
    pub cursors: BTreeMap<String, usize>,
}

impl CheckpointState {
    pub fn cursor(&self, source: &str) -> usize {
        self.cursors.get(source).copied().unwrap_or(0)
    }
}
