mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use radar_ingestion::actions::discover::discover;
use radar_ingestion::actions::instagram::collect_instagram;
use radar_ingestion::actions::youtube::collect_youtube;
use radar_ingestion::collector::{CancelFlag, CheckpointStore, JsonCheckpointStore};
use radar_ingestion::config::Config;
use radar_ingestion::error::{CollectError, CollectResult};
use radar_ingestion::matching::artist_key;
use radar_ingestion::repository::read_table;
use radar_ingestion::services::{ChannelDetails, ChannelSource, VideoDetails};
use radar_types::{ArtistRecord, InstagramProfileRow, YoutubeChannelRow};
use tempfile::tempdir;

use common::{seed_artists, FakeChannels, FakeProfiles, FakeStats};

fn jane_doe_channels() -> FakeChannels {
    FakeChannels::default()
        .with_channel(
            "Jane Doe",
            "UCjane",
            "Jane Doe Official",
            "Jane Doe music. Follow @janedoe_music for tour dates",
            8_000,
        )
        .with_channel("Jane Doe", "UCbig", "Hits Compilation", "the best songs", 900_000)
        .with_upload("UCjane", "v1", 1_000)
        .with_upload("UCjane", "v2", 3_000)
}

// ============================================================================
// Video platform
// ============================================================================

#[tokio::test]
async fn test_youtube_pass_picks_ranked_channel() {
    let dir = tempdir().unwrap();
    let config = Config::for_data_dir(dir.path());
    seed_artists(&config.lastfm_table(), &["Jane Doe", "Nobody Known"]);
    let store = JsonCheckpointStore::new(config.checkpoint_file());

    let channels = jane_doe_channels();
    let report = collect_youtube(&config, &channels, &store, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(report.collected, 1);
    assert_eq!(report.no_match, 1);
    assert_eq!(report.table_rows, 1);

    let rows: Vec<YoutubeChannelRow> = read_table(&config.youtube_table()).unwrap();
    let row = &rows[0];
    assert_eq!(row.artist_id, artist_key("Jane Doe"));
    assert_eq!(row.channel_id, "UCjane");
    assert_eq!(row.subscribers, Some(8_000));
    assert_eq!(row.avg_views_per_video, Some(2_000.0));
    assert!(!config.partial_table("youtube").exists());
}

#[tokio::test]
async fn test_youtube_channel_outside_plausible_band_is_dropped() {
    let dir = tempdir().unwrap();
    let config = Config::for_data_dir(dir.path());
    seed_artists(&config.lastfm_table(), &["Jane Doe"]);
    let store = JsonCheckpointStore::new(config.checkpoint_file());

    let channels = FakeChannels::default().with_channel(
        "Jane Doe",
        "UCjane",
        "Jane Doe Official",
        "jane doe",
        2_000_000,
    );
    let report = collect_youtube(&config, &channels, &store, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(report.collected, 0);
    assert_eq!(report.no_match, 1);
}

#[tokio::test]
async fn test_youtube_quota_stops_pass_and_next_run_resumes() {
    let dir = tempdir().unwrap();
    let mut config = Config::for_data_dir(dir.path());
    config.youtube.quota_ceiling = 150;
    seed_artists(&config.lastfm_table(), &["Alpha One", "Bravo Two", "Charlie Three"]);
    let store = JsonCheckpointStore::new(config.checkpoint_file());

    // Every search comes back empty and costs 100 units.
    let channels = FakeChannels::default();
    let report = collect_youtube(&config, &channels, &store, &CancelFlag::new())
        .await
        .unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.processed, 2);
    assert_eq!(channels.search_count(), 2);
    assert_eq!(store.load().unwrap().cursor("youtube"), 2);

    let report = collect_youtube(&config, &channels, &store, &CancelFlag::new())
        .await
        .unwrap();
    assert!(!report.stopped_early);
    assert_eq!(report.processed, 1);
    assert_eq!(channels.search_count(), 3);
    assert!(!store.load().unwrap().cursors.contains_key("youtube"));
}

/// Drops the connection on the first search, then behaves.
struct FlakyChannels {
    inner: FakeChannels,
    searches: AtomicUsize,
}

#[async_trait]
impl ChannelSource for FlakyChannels {
    async fn search_channels(&self, query: &str, max_results: u32) -> CollectResult<Vec<String>> {
        if self.searches.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(CollectError::TransientNetwork("connection reset".to_string()));
        }
        self.inner.search_channels(query, max_results).await
    }

    async fn channel_details(&self, ids: &[String]) -> CollectResult<Vec<ChannelDetails>> {
        self.inner.channel_details(ids).await
    }

    async fn recent_video_ids(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> CollectResult<Vec<String>> {
        self.inner.recent_video_ids(channel_id, max_results).await
    }

    async fn videos(&self, ids: &[String]) -> CollectResult<Vec<VideoDetails>> {
        self.inner.videos(ids).await
    }
}

#[tokio::test]
async fn test_youtube_connection_reset_is_retried() {
    let dir = tempdir().unwrap();
    let config = Config::for_data_dir(dir.path());
    seed_artists(&config.lastfm_table(), &["Jane Doe"]);
    let store = JsonCheckpointStore::new(config.checkpoint_file());

    let channels = FlakyChannels {
        inner: jane_doe_channels(),
        searches: AtomicUsize::new(0),
    };
    let report = collect_youtube(&config, &channels, &store, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(channels.searches.load(Ordering::SeqCst), 2);
    assert_eq!(report.collected, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.table_rows, 1);
    let rows: Vec<YoutubeChannelRow> = read_table(&config.youtube_table()).unwrap();
    assert_eq!(rows[0].channel_id, "UCjane");
}

#[tokio::test]
async fn test_youtube_needs_listening_table() {
    let dir = tempdir().unwrap();
    let config = Config::for_data_dir(dir.path());
    let store = JsonCheckpointStore::new(config.checkpoint_file());

    let err = collect_youtube(&config, &FakeChannels::default(), &store, &CancelFlag::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CollectError::NotFound(_)));
}

// ============================================================================
// Photo platform
// ============================================================================

#[tokio::test]
async fn test_instagram_handle_found_through_channel_description() {
    let dir = tempdir().unwrap();
    let config = Config::for_data_dir(dir.path());
    seed_artists(&config.lastfm_table(), &["Jane Doe", "Tom Tiny"]);
    let store = JsonCheckpointStore::new(config.checkpoint_file());

    let channels = jane_doe_channels();
    let profiles = FakeProfiles::default()
        .with_profile("janedoe_music", "Jane Doe", 20_000)
        // Exists, but too small to be the artist.
        .with_profile("tomtiny", "Tom Tiny", 100);

    let channels: &dyn ChannelSource = &channels;
    let report = collect_instagram(&config, &profiles, Some(channels), &store, &CancelFlag::new())
        .await
        .unwrap();
    assert_eq!(report.collected, 1);
    assert_eq!(report.no_match, 1);

    let rows: Vec<InstagramProfileRow> = read_table(&config.instagram_table()).unwrap();
    let row = &rows[0];
    assert_eq!(row.handle, "janedoe_music");
    assert_eq!(row.followers, Some(20_000));
    assert_eq!(row.avg_likes, Some(1_000.0));
    assert_eq!(row.avg_comments, Some(50.0));
    // (1000 + 50) / 20000 * 100
    assert_eq!(row.engagement_rate, Some(5.25));
    assert_eq!(row.reels_count, Some(1));
}

#[tokio::test]
async fn test_instagram_falls_back_to_name_variations() {
    let dir = tempdir().unwrap();
    let config = Config::for_data_dir(dir.path());
    seed_artists(&config.lastfm_table(), &["The Quiet Ones"]);
    let store = JsonCheckpointStore::new(config.checkpoint_file());

    let profiles =
        FakeProfiles::default().with_profile("thequietonesmusic", "The Quiet Ones", 9_000);
    let report = collect_instagram(&config, &profiles, None, &store, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(report.collected, 1);
    // thequietones, quietones, then the suffixed full name.
    assert_eq!(profiles.lookup_count(), 3);
    let rows: Vec<InstagramProfileRow> = read_table(&config.instagram_table()).unwrap();
    assert_eq!(rows[0].handle, "thequietonesmusic");
}

#[tokio::test]
async fn test_instagram_rate_limit_ends_pass_with_cursor_kept() {
    let dir = tempdir().unwrap();
    let config = Config::for_data_dir(dir.path());
    seed_artists(&config.lastfm_table(), &["Jane Doe", "Tom Tiny"]);
    let store = JsonCheckpointStore::new(config.checkpoint_file());

    let profiles = FakeProfiles {
        rate_limited: true,
        ..Default::default()
    };
    let err = collect_instagram(&config, &profiles, None, &store, &CancelFlag::new())
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    // Only the first candidate handle was tried before giving up.
    assert_eq!(profiles.lookup_count(), 1);
    assert_eq!(store.load().unwrap().cursor("instagram"), 0);
    assert!(store.load().unwrap().cursors.contains_key("instagram"));
}

// ============================================================================
// Listening stats
// ============================================================================

#[tokio::test]
async fn test_discovery_keeps_emerging_artists() {
    let dir = tempdir().unwrap();
    let mut config = Config::for_data_dir(dir.path());
    config.discovery.genres = vec!["jazz".to_string()];

    let mut stats = FakeStats::default()
        .with_info("Jane Doe", 50_000, &["jazz", "soul"])
        .with_info("Big Star", 900_000, &["pop"])
        .with_info("Quiet One", 10_000, &[])
        .with_info("Adele", 100_000, &["soul"]);
    stats.tags.insert(
        "jazz".to_string(),
        vec!["Jane Doe".to_string(), "Big Star".to_string()],
    );
    stats.country = vec![
        "Jane Doe".to_string(),
        "Quiet One".to_string(),
        "Adele".to_string(),
        "Ghost".to_string(),
    ];

    let summary = discover(&config, &stats, &CancelFlag::new()).await.unwrap();
    assert_eq!(summary.candidates, 5);
    assert_eq!(summary.detailed, 4);
    assert_eq!(summary.kept, 2);
    assert_eq!(summary.table_rows, 2);

    let rows: Vec<ArtistRecord> = read_table(&config.lastfm_table()).unwrap();
    let jane = rows.iter().find(|r| r.artist_name == "Jane Doe").unwrap();
    assert_eq!(jane.source, "genre:jazz");
    assert_eq!(jane.genres.as_deref(), Some("jazz, soul"));
    assert_eq!(jane.plays_per_listener, Some(4.0));

    let quiet = rows.iter().find(|r| r.artist_name == "Quiet One").unwrap();
    assert_eq!(quiet.source, "uk_top");
    assert_eq!(quiet.primary_genre, "unknown");
    assert_eq!(quiet.genres, None);
}

#[tokio::test]
async fn test_rediscovery_replaces_rows() {
    let dir = tempdir().unwrap();
    let mut config = Config::for_data_dir(dir.path());
    config.discovery.genres = vec![];

    let mut stats = FakeStats::default().with_info("Jane Doe", 50_000, &["jazz"]);
    stats.country = vec!["Jane Doe".to_string()];
    discover(&config, &stats, &CancelFlag::new()).await.unwrap();

    let mut stats = FakeStats::default().with_info("Jane Doe", 60_000, &["jazz"]);
    stats.country = vec!["Jane Doe".to_string()];
    let summary = discover(&config, &stats, &CancelFlag::new()).await.unwrap();
    assert_eq!(summary.table_rows, 1);

    let rows: Vec<ArtistRecord> = read_table(&config.lastfm_table()).unwrap();
    assert_eq!(rows[0].listeners, Some(60_000));
}
