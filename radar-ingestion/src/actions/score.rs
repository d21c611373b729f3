use radar_types::{GrowthPotential, MergedArtistRecord};
use tracing::info;

use super::read_required_table;
use crate::config::Config;
use crate::error::CollectResult;
use crate::repository::write_table;
use crate::scoring::{score_table, ScoreFilter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    pub merged: usize,
    pub scored: usize,
    pub high_growth: usize,
}

/// Recompute the scored table from the merged table, replacing it whole.
pub fn score(config: &Config) -> CollectResult<ScoreSummary> {
    let merged: Vec<MergedArtistRecord> = read_required_table(&config.merged_table(), "MERGE")?;

    let filter = config.apply_score_filter.then(ScoreFilter::default);
    if filter.is_some() {
        info!("🎯 Emerging-artist filter enabled");
    }

    let scored = score_table(&merged, filter.as_ref());
    write_table(&config.scored_table(), &scored)?;

    let summary = ScoreSummary {
        merged: merged.len(),
        scored: scored.len(),
        high_growth: scored
            .iter()
            .filter(|r| r.growth_potential == GrowthPotential::High)
            .count(),
    };

    info!(
        "🏆 Scored {} of {} artists ({} with high growth potential)",
        summary.scored, summary.merged, summary.high_growth
    );
    for (rank, artist) in scored.iter().take(5).enumerate() {
        info!(
            "   {}. {} ({}) priority {}",
            rank + 1,
            artist.artist_name,
            artist.primary_genre,
            artist
                .priority_score
                .map_or_else(|| "n/a".to_string(), |p| format!("{:.4}", p))
        );
    }
    Ok(summary)
}
