//! Priority scorer.
//!
//! Every metric is a pure function of one merged row. Missing platform data
//! compares as zero for the categorical outputs and propagates as `None` for
//! the arithmetic ones.

use std::cmp::Ordering;

use radar_types::{GrowthPotential, MergedArtistRecord, ScoredArtistRecord};

const LISTENER_PRESENCE: u64 = 5_000;
const FOLLOWER_PRESENCE: u64 = 10_000;
const SUBSCRIBER_PRESENCE: u64 = 1_000;

const MAX_ENGAGEMENT_SCORE: f64 = 10.0;

/// Photo-platform followers per listening-stats listener.
pub fn underrated_ratio(followers: Option<u64>, listeners: Option<u64>) -> Option<f64> {
    match (followers, listeners) {
        (Some(f), Some(l)) if l > 0 => Some(f as f64 / l as f64),
        _ => None,
    }
}

/// Engagement percentage mapped onto 0..=10.
pub fn engagement_score(engagement_rate: Option<f64>) -> Option<f64> {
    engagement_rate.map(|rate| (rate * 2.0).min(MAX_ENGAGEMENT_SCORE))
}

pub fn platform_count(
    listeners: Option<u64>,
    followers: Option<u64>,
    subscribers: Option<u64>,
) -> u8 {
    [
        listeners.is_some_and(|l| l > LISTENER_PRESENCE),
        followers.is_some_and(|f| f > FOLLOWER_PRESENCE),
        subscribers.is_some_and(|s| s > SUBSCRIBER_PRESENCE),
    ]
    .iter()
    .filter(|present| **present)
    .count() as u8
}

pub fn growth_potential(followers: Option<u64>, listeners: Option<u64>) -> GrowthPotential {
    let followers = followers.unwrap_or(0);
    let listeners = listeners.unwrap_or(0);

    if followers > listeners.saturating_mul(2) {
        GrowthPotential::High
    } else if followers > listeners {
        GrowthPotential::Medium
    } else {
        GrowthPotential::Low
    }
}

/// Composite ranking metric:
///
/// ```text
/// (0.3·followers + 0.4·(engagement%/100)·followers + 0.2·subscribers
///   + 0.1·1000·plays_per_listener) / max(listeners, 1)
/// ```
///
/// The denominator is clamped to 1, so artists with no listeners still get
/// a (large) score. `None` when any input is missing.
pub fn priority_score(
    followers: Option<u64>,
    engagement_rate: Option<f64>,
    subscribers: Option<u64>,
    plays_per_listener: Option<f64>,
    listeners: Option<u64>,
) -> Option<f64> {
    let followers = followers? as f64;
    let engagement = engagement_rate? / 100.0;
    let subscribers = subscribers? as f64;
    let plays_per_listener = plays_per_listener?;
    let denominator = listeners?.max(1) as f64;

    let numerator = 0.3 * followers
        + 0.4 * engagement * followers
        + 0.2 * subscribers
        + 0.1 * 1000.0 * plays_per_listener;

    Some(numerator / denominator).filter(|score| score.is_finite())
}

pub fn score_record(record: &MergedArtistRecord) -> ScoredArtistRecord {
    let listeners = record.lastfm_listeners;
    let followers = record.instagram_followers;
    let subscribers = record.youtube_subscribers;

    ScoredArtistRecord {
        artist_id: record.artist_id.clone(),
        artist_name: record.artist_name.clone(),
        lastfm_listeners: listeners,
        lastfm_playcount: record.lastfm_playcount,
        lastfm_playcount_per_listener: record.lastfm_playcount_per_listener,
        lastfm_url: record.lastfm_url.clone(),
        genres: record.genres.clone(),
        primary_genre: record.primary_genre.clone(),
        source: record.source.clone(),

        instagram_handle: record.instagram_handle.clone(),
        instagram_followers: followers,
        instagram_following: record.instagram_following,
        instagram_posts: record.instagram_posts,
        instagram_avg_likes: record.instagram_avg_likes,
        instagram_avg_comments: record.instagram_avg_comments,
        instagram_engagement_rate: record.instagram_engagement_rate,
        instagram_reels_count: record.instagram_reels_count,
        instagram_verified: record.instagram_verified,

        youtube_channel_id: record.youtube_channel_id.clone(),
        youtube_subscribers: subscribers,
        youtube_total_views: record.youtube_total_views,
        youtube_video_count: record.youtube_video_count,
        youtube_avg_views_per_video: record.youtube_avg_views_per_video,

        collection_date: record.collection_date,
        last_updated: record.last_updated,
        data_quality_score: record.data_quality_score,

        underrated_ratio: underrated_ratio(followers, listeners),
        engagement_score: engagement_score(record.instagram_engagement_rate),
        platform_count: platform_count(listeners, followers, subscribers),
        growth_potential: growth_potential(followers, listeners),
        priority_score: priority_score(
            followers,
            record.instagram_engagement_rate,
            subscribers,
            record.lastfm_playcount_per_listener,
            listeners,
        ),
        follower_gap: match (followers, listeners) {
            (Some(f), Some(l)) => Some(f as i64 - l as i64),
            _ => None,
        },
    }
}

/// Descending order with missing values last.
pub fn desc_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Highest priority first; rows without a score sink to the bottom.
pub fn by_priority_desc(a: &ScoredArtistRecord, b: &ScoredArtistRecord) -> Ordering {
    desc_nulls_last(a.priority_score, b.priority_score)
}

// ============================================================================
// Emerging-artist filter
// ============================================================================

/// Optional row selection applied before ranking.
#[derive(Debug, Clone)]
pub struct ScoreFilter {
    pub genres: Vec<String>,
    pub min_listeners: u64,
    pub max_listeners: u64,
    pub min_followers: u64,
    pub max_followers: u64,
    /// Engagement percentage must exceed this when present.
    pub min_engagement_rate: f64,
    pub min_quality: f64,
}

impl Default for ScoreFilter {
    fn default() -> Self {
        Self {
            genres: [
                "jazz", "folk", "alternative", "soul", "indie", "indie folk", "blues", "rnb",
                "nu jazz", "funk", "piano", "80s", "unknown",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_listeners: 5_000,
            max_listeners: 200_000,
            min_followers: 1_000,
            max_followers: 100_000,
            min_engagement_rate: 1.0,
            min_quality: 0.3,
        }
    }
}

impl ScoreFilter {
    pub fn accepts(&self, record: &MergedArtistRecord) -> bool {
        let genre_ok = self
            .genres
            .iter()
            .any(|g| g.eq_ignore_ascii_case(&record.primary_genre));
        let listeners_ok = record
            .lastfm_listeners
            .is_some_and(|l| l > 0 && (self.min_listeners..=self.max_listeners).contains(&l));
        let followers_ok = record
            .instagram_followers
            .map_or(true, |f| (self.min_followers..=self.max_followers).contains(&f));
        let engagement_ok = record
            .instagram_engagement_rate
            .map_or(true, |e| e > self.min_engagement_rate);

        genre_ok
            && listeners_ok
            && followers_ok
            && engagement_ok
            && record.data_quality_score >= self.min_quality
    }
}

/// Score every merged row (optionally filtered) and sort by priority.
pub fn score_table(
    merged: &[MergedArtistRecord],
    filter: Option<&ScoreFilter>,
) -> Vec<ScoredArtistRecord> {
    let mut scored: Vec<ScoredArtistRecord> = merged
        .iter()
        .filter(|r| filter.map_or(true, |f| f.accepts(r)))
        .map(score_record)
        .collect();
    scored.sort_by(by_priority_desc);
    scored
}
