//! Merge & dedup engine.
//!
//! Joins the listening-stats table with the optional per-platform tables on
//! `artist_id` and stamps each row with a completeness score.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use radar_types::{
    ArtistKeyed, ArtistRecord, InstagramProfileRow, MergedArtistRecord, YoutubeChannelRow,
};

/// Weights in tenths so the score sums exactly: listening stats 0.3,
/// photo profile 0.4, video channel 0.3.
const LISTENING_WEIGHT: u32 = 3;
const PHOTO_WEIGHT: u32 = 4;
const VIDEO_WEIGHT: u32 = 3;

/// Keep one row per artist: the last one written. The surviving row takes
/// the position of that artist's first appearance.
pub fn dedup_last_write_wins<T: ArtistKeyed>(rows: Vec<T>) -> Vec<T> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::with_capacity(rows.len());

    for row in rows {
        match index.get(row.artist_id()) {
            Some(&pos) => out[pos] = row,
            None => {
                index.insert(row.artist_id().to_string(), out.len());
                out.push(row);
            }
        }
    }

    out
}

pub fn data_quality_score(
    listeners: Option<u64>,
    followers: Option<u64>,
    subscribers: Option<u64>,
) -> f64 {
    let tenths = listeners.map_or(0, |_| LISTENING_WEIGHT)
        + followers.map_or(0, |_| PHOTO_WEIGHT)
        + subscribers.map_or(0, |_| VIDEO_WEIGHT);
    tenths as f64 / 10.0
}

fn index_by_artist<T: ArtistKeyed>(rows: Vec<T>) -> HashMap<String, T> {
    dedup_last_write_wins(rows)
        .into_iter()
        .map(|row| (row.artist_id().to_string(), row))
        .collect()
}

/// Left-join the optional tables onto `listening`. A table that is `None`
/// contributes all-null columns, same as an artist missing from a table.
pub fn merge_sources(
    listening: Vec<ArtistRecord>,
    instagram: Option<Vec<InstagramProfileRow>>,
    youtube: Option<Vec<YoutubeChannelRow>>,
    now: DateTime<Utc>,
) -> Vec<MergedArtistRecord> {
    let mut instagram = index_by_artist(instagram.unwrap_or_default());
    let mut youtube = index_by_artist(youtube.unwrap_or_default());

    dedup_last_write_wins(listening)
        .into_iter()
        .map(|artist| {
            let ig = instagram.remove(&artist.artist_id);
            let yt = youtube.remove(&artist.artist_id);
            merge_row(artist, ig, yt, now)
        })
        .collect()
}

fn merge_row(
    artist: ArtistRecord,
    ig: Option<InstagramProfileRow>,
    yt: Option<YoutubeChannelRow>,
    now: DateTime<Utc>,
) -> MergedArtistRecord {
    let followers = ig.as_ref().and_then(|p| p.followers);
    let subscribers = yt.as_ref().and_then(|c| c.subscribers);

    MergedArtistRecord {
        data_quality_score: data_quality_score(artist.listeners, followers, subscribers),
        artist_id: artist.artist_id,
        artist_name: artist.artist_name,
        lastfm_listeners: artist.listeners,
        lastfm_playcount: artist.playcount,
        lastfm_playcount_per_listener: artist.plays_per_listener,
        lastfm_url: artist.url,
        genres: artist.genres,
        primary_genre: artist.primary_genre,
        source: artist.source,

        instagram_handle: ig.as_ref().map(|p| p.handle.clone()),
        instagram_followers: followers,
        instagram_following: ig.as_ref().and_then(|p| p.following),
        instagram_posts: ig.as_ref().and_then(|p| p.posts),
        instagram_avg_likes: ig.as_ref().and_then(|p| p.avg_likes),
        instagram_avg_comments: ig.as_ref().and_then(|p| p.avg_comments),
        instagram_engagement_rate: ig.as_ref().and_then(|p| p.engagement_rate),
        instagram_reels_count: ig.as_ref().and_then(|p| p.reels_count),
        instagram_verified: ig.as_ref().and_then(|p| p.verified),

        youtube_channel_id: yt.as_ref().map(|c| c.channel_id.clone()),
        youtube_subscribers: subscribers,
        youtube_total_views: yt.as_ref().and_then(|c| c.total_views),
        youtube_video_count: yt.as_ref().and_then(|c| c.video_count),
        youtube_avg_views_per_video: yt.as_ref().and_then(|c| c.avg_views_per_video),

        collection_date: now.date_naive(),
        last_updated: now,
    }
}
