use chrono::Utc;
use radar_types::{InstagramProfileRow, YoutubeChannelRow};
use tracing::info;

use super::read_artists;
use crate::config::Config;
use crate::error::CollectResult;
use crate::merge::merge_sources;
use crate::repository::{read_optional_table, write_table};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    pub artists: usize,
    pub with_instagram: usize,
    pub with_youtube: usize,
    pub complete: usize,
    pub mean_quality: f64,
}

/// Rebuild the merged table from the per-source tables.
pub fn merge(config: &Config) -> CollectResult<MergeSummary> {
    let listening = read_artists(&config.lastfm_table())?;
    let instagram: Option<Vec<InstagramProfileRow>> =
        read_optional_table(&config.instagram_table())?;
    let youtube: Option<Vec<YoutubeChannelRow>> = read_optional_table(&config.youtube_table())?;

    info!("🔀 Merging data sources");
    info!("   Listening stats: {} artists", listening.len());
    match &instagram {
        Some(rows) => info!("   Instagram: {} profiles", rows.len()),
        None => info!("   Instagram: no data yet"),
    }
    match &youtube {
        Some(rows) => info!("   YouTube: {} channels", rows.len()),
        None => info!("   YouTube: no data yet"),
    }

    let merged = merge_sources(listening, instagram, youtube, Utc::now());
    write_table(&config.merged_table(), &merged)?;

    let summary = MergeSummary {
        artists: merged.len(),
        with_instagram: merged.iter().filter(|r| r.instagram_followers.is_some()).count(),
        with_youtube: merged.iter().filter(|r| r.youtube_subscribers.is_some()).count(),
        complete: merged.iter().filter(|r| r.data_quality_score >= 1.0).count(),
        mean_quality: if merged.is_empty() {
            0.0
        } else {
            merged.iter().map(|r| r.data_quality_score).sum::<f64>() / merged.len() as f64
        },
    };

    info!(
        "✅ Merged {} artists ({} with Instagram, {} with YouTube, {} complete, mean quality {:.2})",
        summary.artists,
        summary.with_instagram,
        summary.with_youtube,
        summary.complete,
        summary.mean_quality
    );
    Ok(summary)
}
