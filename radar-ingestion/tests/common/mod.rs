// Shared fakes for the integration tests
// In-memory stand-ins for the three external sources plus table seeding.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use radar_ingestion::error::{CollectError, CollectResult};
use radar_ingestion::matching::artist_key;
use radar_ingestion::repository::write_table;
use radar_ingestion::services::{
    ArtistInfo, ChannelDetails, ChannelSource, ListeningStatsSource, PostSnapshot,
    ProfileSnapshot, ProfileSource, VideoDetails,
};
use radar_types::ArtistRecord;

pub fn artist(name: &str, listeners: u64) -> ArtistRecord {
    ArtistRecord {
        artist_id: artist_key(name),
        artist_name: name.to_string(),
        listeners: Some(listeners),
        playcount: Some(listeners * 4),
        plays_per_listener: Some(4.0),
        url: None,
        genres: Some("jazz".to_string()),
        primary_genre: "jazz".to_string(),
        source: "genre:jazz".to_string(),
        collection_date: None,
        collection_timestamp: None,
    }
}

pub fn seed_artists(path: &Path, names: &[&str]) -> Vec<ArtistRecord> {
    let rows: Vec<ArtistRecord> = names.iter().map(|n| artist(n, 50_000)).collect();
    write_table(path, &rows).unwrap();
    rows
}

// ============================================================================
// Listening stats
// ============================================================================

#[derive(Default)]
pub struct FakeStats {
    pub tags: HashMap<String, Vec<String>>,
    pub country: Vec<String>,
    pub infos: HashMap<String, ArtistInfo>,
}

impl FakeStats {
    pub fn with_info(mut self, name: &str, listeners: u64, tags: &[&str]) -> Self {
        self.infos.insert(
            name.to_string(),
            ArtistInfo {
                name: name.to_string(),
                listeners,
                playcount: listeners * 4,
                url: Some(format!("https://www.last.fm/music/{}", name)),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        );
        self
    }
}

#[async_trait]
impl ListeningStatsSource for FakeStats {
    async fn top_artists_by_tag(&self, tag: &str, _limit: u32) -> CollectResult<Vec<String>> {
        Ok(self.tags.get(tag).cloned().unwrap_or_default())
    }

    async fn top_artists_by_country(
        &self,
        _country: &str,
        _limit: u32,
    ) -> CollectResult<Vec<String>> {
        Ok(self.country.clone())
    }

    async fn artist_info(&self, name: &str) -> CollectResult<ArtistInfo> {
        self.infos
            .get(name)
            .cloned()
            .ok_or_else(|| CollectError::NotFound(name.to_string()))
    }
}

// ============================================================================
// Video platform
// ============================================================================

/// Searches match when the query starts with a registered artist name.
#[derive(Default)]
pub struct FakeChannels {
    pub search: HashMap<String, Vec<String>>,
    pub details: HashMap<String, ChannelDetails>,
    pub uploads: HashMap<String, Vec<String>>,
    pub videos: HashMap<String, VideoDetails>,
    pub searches: AtomicUsize,
}

impl FakeChannels {
    pub fn with_channel(
        mut self,
        artist_name: &str,
        id: &str,
        title: &str,
        description: &str,
        subscribers: u64,
    ) -> Self {
        self.search
            .entry(artist_name.to_string())
            .or_default()
            .push(id.to_string());
        self.details.insert(
            id.to_string(),
            ChannelDetails {
                id: id.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                subscribers: Some(subscribers),
                total_views: Some(subscribers * 50),
                video_count: Some(25),
            },
        );
        self
    }

    pub fn with_upload(mut self, channel_id: &str, video_id: &str, views: u64) -> Self {
        self.uploads
            .entry(channel_id.to_string())
            .or_default()
            .push(video_id.to_string());
        self.videos.insert(
            video_id.to_string(),
            VideoDetails {
                id: video_id.to_string(),
                description: String::new(),
                views: Some(views),
            },
        );
        self
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSource for FakeChannels {
    async fn search_channels(&self, query: &str, _max_results: u32) -> CollectResult<Vec<String>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .search
            .iter()
            .find(|(name, _)| query.starts_with(name.as_str()))
            .map(|(_, ids)| ids.clone())
            .unwrap_or_default())
    }

    async fn channel_details(&self, ids: &[String]) -> CollectResult<Vec<ChannelDetails>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.details.get(id).cloned())
            .collect())
    }

    async fn recent_video_ids(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> CollectResult<Vec<String>> {
        let mut ids = self.uploads.get(channel_id).cloned().unwrap_or_default();
        ids.truncate(max_results as usize);
        Ok(ids)
    }

    async fn videos(&self, ids: &[String]) -> CollectResult<Vec<VideoDetails>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.videos.get(id).cloned())
            .collect())
    }
}

// ============================================================================
// Photo platform
// ============================================================================

#[derive(Default)]
pub struct FakeProfiles {
    pub profiles: HashMap<String, ProfileSnapshot>,
    pub posts: HashMap<String, Vec<PostSnapshot>>,
    pub rate_limited: bool,
    pub lookups: AtomicUsize,
}

impl FakeProfiles {
    pub fn with_profile(mut self, handle: &str, full_name: &str, followers: u64) -> Self {
        self.profiles.insert(
            handle.to_string(),
            ProfileSnapshot {
                handle: handle.to_string(),
                full_name: Some(full_name.to_string()),
                biography: Some("Singer and songwriter".to_string()),
                followers: Some(followers),
                following: Some(300),
                posts: Some(120),
                verified: Some(false),
                private: Some(false),
            },
        );
        self.posts.insert(
            handle.to_string(),
            vec![
                PostSnapshot {
                    likes: Some(900),
                    comments: Some(40),
                    is_video: true,
                },
                PostSnapshot {
                    likes: Some(1_100),
                    comments: Some(60),
                    is_video: false,
                },
            ],
        );
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn profile(&self, handle: &str) -> CollectResult<ProfileSnapshot> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.rate_limited {
            return Err(CollectError::RateLimited("429 Too Many Requests".to_string()));
        }
        self.profiles
            .get(handle)
            .cloned()
            .ok_or_else(|| CollectError::NotFound(format!("@{}", handle)))
    }

    async fn recent_posts(&self, handle: &str, limit: usize) -> CollectResult<Vec<PostSnapshot>> {
        let mut posts = self.posts.get(handle).cloned().unwrap_or_default();
        posts.truncate(limit);
        Ok(posts)
    }
}
