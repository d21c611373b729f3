// Listening-stats discovery
// Genre and country charts → per-artist details → emerging-artist filter

use std::collections::HashSet;

use chrono::Utc;
use radar_types::ArtistRecord;
use tracing::{info, warn};

use super::round_to;
use crate::collector::{progress_bar, CancelFlag};
use crate::config::{Config, DiscoveryConfig};
use crate::error::{CollectError, CollectResult};
use crate::matching::artist_key;
use crate::repository::upsert_table;
use crate::services::{ArtistInfo, ListeningStatsSource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Unique names gathered from the charts.
    pub candidates: usize,
    pub detailed: usize,
    pub kept: usize,
    pub table_rows: usize,
    pub interrupted: bool,
}

/// A chart entry waiting for its detail lookup.
#[derive(Debug, Clone)]
struct ChartHit {
    name: String,
    source: String,
}

fn push_unique(hits: &mut Vec<ChartHit>, seen: &mut HashSet<String>, names: Vec<String>, source: &str) {
    for name in names {
        if name.trim().is_empty() || !seen.insert(name.clone()) {
            continue;
        }
        hits.push(ChartHit {
            name,
            source: source.to_string(),
        });
    }
}

/// Chart lookups are best-effort, except a rate limit which ends the stage.
fn chart_or_empty(result: CollectResult<Vec<String>>, what: &str) -> CollectResult<Vec<String>> {
    match result {
        Ok(names) => Ok(names),
        Err(e) if e.is_rate_limited() => Err(e),
        Err(e) => {
            warn!("⚠️  Error fetching {}: {}", what, e);
            Ok(Vec::new())
        }
    }
}

fn country_source(country: &str) -> String {
    if country.eq_ignore_ascii_case("united kingdom") {
        "uk_top".to_string()
    } else {
        format!("country:{}", country.to_lowercase())
    }
}

pub fn is_emerging(info: &ArtistInfo, config: &DiscoveryConfig) -> bool {
    let name = info.name.to_lowercase();
    (config.min_listeners..=config.max_listeners).contains(&info.listeners)
        && !config
            .established_artists
            .iter()
            .any(|a| a.to_lowercase() == name)
}

pub fn artist_record(info: ArtistInfo, source: String) -> ArtistRecord {
    let now = Utc::now();
    let plays_per_listener = if info.listeners > 0 {
        round_to(info.playcount as f64 / info.listeners as f64, 2)
    } else {
        0.0
    };
    let primary_genre = info
        .tags
        .first()
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    let genres = (!info.tags.is_empty()).then(|| info.tags.join(", "));

    ArtistRecord {
        artist_id: artist_key(&info.name),
        artist_name: info.name,
        listeners: Some(info.listeners),
        playcount: Some(info.playcount),
        plays_per_listener: Some(plays_per_listener),
        url: info.url,
        genres,
        primary_genre,
        source,
        collection_date: Some(now.date_naive()),
        collection_timestamp: Some(now),
    }
}

pub async fn discover(
    config: &Config,
    stats: &dyn ListeningStatsSource,
    cancel: &CancelFlag,
) -> CollectResult<DiscoverySummary> {
    let discovery = &config.discovery;
    let mut summary = DiscoverySummary::default();

    info!("🎧 Starting listening-stats discovery");
    info!("   Genres: {}", discovery.genres.join(", "));
    info!("   Country: {}", discovery.country);

    let mut hits = Vec::new();
    let mut seen = HashSet::new();

    for genre in &discovery.genres {
        if cancel.is_cancelled() {
            summary.interrupted = true;
            return Ok(summary);
        }
        let names = chart_or_empty(
            stats.top_artists_by_tag(genre, discovery.tag_limit).await,
            &format!("genre {}", genre),
        )?;
        info!("   🔍 {}: {} artists", genre, names.len());
        push_unique(&mut hits, &mut seen, names, &format!("genre:{}", genre));
        cancel.sleep(discovery.tag_delay).await;
    }

    let names = chart_or_empty(
        stats
            .top_artists_by_country(&discovery.country, discovery.country_limit)
            .await,
        &format!("{} top artists", discovery.country),
    )?;
    info!("   🌍 {}: {} artists", discovery.country, names.len());
    push_unique(&mut hits, &mut seen, names, &country_source(&discovery.country));

    summary.candidates = hits.len();
    info!("📋 {} unique artists, fetching details", hits.len());

    let progress = progress_bar(hits.len(), "🎧", config.show_progress);
    let mut kept: Vec<ArtistRecord> = Vec::new();
    let mut failure: Option<CollectError> = None;

    for hit in hits {
        if cancel.is_cancelled() {
            summary.interrupted = true;
            break;
        }
        progress.set_message(hit.name.clone());

        match stats.artist_info(&hit.name).await {
            Ok(info) => {
                summary.detailed += 1;
                if is_emerging(&info, discovery) {
                    kept.push(artist_record(info, hit.source));
                }
            }
            Err(e) if e.is_skippable() => warn!("⚠️  No details for {}: {}", hit.name, e),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }

        progress.inc(1);
        cancel.sleep(discovery.detail_delay).await;
    }
    progress.finish_and_clear();

    // Whatever was gathered survives a failure or an interrupt.
    summary.kept = kept.len();
    if !kept.is_empty() {
        let upsert = upsert_table(&config.lastfm_table(), kept)?;
        summary.table_rows = upsert.total;
        info!(
            "💾 Listening stats: {} existing + {} new → {} unique artists",
            upsert.existing, upsert.added, upsert.total
        );
    }

    if let Some(e) = failure {
        return Err(e);
    }

    info!(
        "✅ Discovery: {} candidates, {} detailed, {} in the emerging range",
        summary.candidates, summary.detailed, summary.kept
    );
    Ok(summary)
}
