// Insights report
// Top artists, per-genre summary and high-growth shortlist from the scored table

use std::collections::BTreeMap;
use std::path::PathBuf;

use radar_types::{GrowthPotential, ScoredArtistRecord};
use serde::Serialize;
use tracing::info;

use super::read_required_table;
use crate::config::Config;
use crate::error::CollectResult;
use crate::repository::write_table;
use crate::scoring::{by_priority_desc, desc_nulls_last};

const TOP_ARTISTS: usize = 20;
const HIGH_GROWTH_ARTISTS: usize = 30;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenreSummary {
    pub primary_genre: String,
    pub artist_count: usize,
    pub avg_priority_score: Option<f64>,
    pub avg_underrated_ratio: Option<f64>,
    pub avg_engagement: Option<f64>,
    pub high_growth_count: usize,
    pub avg_instagram_followers: Option<f64>,
    pub avg_lastfm_listeners: Option<f64>,
}

/// Mean of the values that are present.
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn genre_summary(scored: &[ScoredArtistRecord]) -> Vec<GenreSummary> {
    let mut by_genre: BTreeMap<&str, Vec<&ScoredArtistRecord>> = BTreeMap::new();
    for record in scored {
        by_genre
            .entry(record.primary_genre.as_str())
            .or_default()
            .push(record);
    }

    let mut summary: Vec<GenreSummary> = by_genre
        .into_iter()
        .map(|(genre, rows)| GenreSummary {
            primary_genre: genre.to_string(),
            artist_count: rows.len(),
            avg_priority_score: mean(rows.iter().map(|r| r.priority_score)),
            avg_underrated_ratio: mean(rows.iter().map(|r| r.underrated_ratio)),
            avg_engagement: mean(rows.iter().map(|r| r.engagement_score)),
            high_growth_count: rows
                .iter()
                .filter(|r| r.growth_potential == GrowthPotential::High)
                .count(),
            avg_instagram_followers: mean(
                rows.iter().map(|r| r.instagram_followers.map(|f| f as f64)),
            ),
            avg_lastfm_listeners: mean(rows.iter().map(|r| r.lastfm_listeners.map(|l| l as f64))),
        })
        .collect();

    summary.sort_by(|a, b| desc_nulls_last(a.avg_priority_score, b.avg_priority_score));
    summary
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightsReport {
    pub top_artists: Vec<ScoredArtistRecord>,
    pub genres: Vec<GenreSummary>,
    pub high_growth: Vec<ScoredArtistRecord>,
}

pub fn build_report(mut scored: Vec<ScoredArtistRecord>) -> InsightsReport {
    scored.sort_by(by_priority_desc);
    let genres = genre_summary(&scored);
    let high_growth = scored
        .iter()
        .filter(|r| r.growth_potential == GrowthPotential::High)
        .take(HIGH_GROWTH_ARTISTS)
        .cloned()
        .collect();
    scored.truncate(TOP_ARTISTS);

    InsightsReport {
        top_artists: scored,
        genres,
        high_growth,
    }
}

fn log_key_insights(report: &InsightsReport) {
    info!("💡 KEY INSIGHTS");

    let ratios: Vec<(f64, &str)> = report
        .top_artists
        .iter()
        .filter_map(|r| r.underrated_ratio.map(|ratio| (ratio, r.artist_name.as_str())))
        .collect();
    if let Some(avg) = mean(ratios.iter().map(|(r, _)| Some(*r))) {
        info!("1. Average underrated ratio (top {}): {:.2}", TOP_ARTISTS, avg);
    }
    if let Some((max, name)) = ratios.iter().max_by(|a, b| a.0.total_cmp(&b.0)) {
        info!("2. Highest underrated ratio: {:.2} ({})", max, name);
    }

    if let Some(top) = report.top_artists.first() {
        info!("3. Top priority artist: {} ({})", top.artist_name, top.primary_genre);
        info!(
            "   Instagram: {} followers, Last.fm: {} listeners, growth potential {}",
            top.instagram_followers.map_or("n/a".to_string(), |f| f.to_string()),
            top.lastfm_listeners.map_or("n/a".to_string(), |l| l.to_string()),
            top.growth_potential.as_str()
        );
    }

    if let Some(genre) = report.genres.first() {
        info!(
            "4. Highest potential genre: {} ({} artists, avg priority {:.2}, {} high growth)",
            genre.primary_genre,
            genre.artist_count,
            genre.avg_priority_score.unwrap_or(0.0),
            genre.high_growth_count
        );
    }
}

/// Write the three report tables next to the scored table. Returns their paths.
pub fn generate_insights(config: &Config) -> CollectResult<Vec<PathBuf>> {
    let scored: Vec<ScoredArtistRecord> = read_required_table(&config.scored_table(), "SCORE")?;
    info!("📑 Generating insights from {} scored artists", scored.len());

    let report = build_report(scored);
    let dir = config.insights_dir();
    let top_path = dir.join("top_underrated_artists.csv");
    let genre_path = dir.join("genre_analysis.csv");
    let growth_path = dir.join("high_growth_artists.csv");

    write_table(&top_path, &report.top_artists)?;
    write_table(&genre_path, &report.genres)?;
    write_table(&growth_path, &report.high_growth)?;

    log_key_insights(&report);
    info!("✅ Insights saved to {}", dir.display());
    Ok(vec![top_path, genre_path, growth_path])
}
