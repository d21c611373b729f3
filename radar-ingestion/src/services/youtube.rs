// YouTube Data API v3 client
// Channel search, channel statistics and recent-upload lookups

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{string_count, ChannelDetails, ChannelSource, VideoDetails};
use crate::error::{classify_status, preview, CollectError, CollectResult};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3/";

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
}

#[derive(Debug, Deserialize)]
struct SearchId {
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize, Default)]
struct ChannelStatistics {
    #[serde(rename = "subscriberCount", default, deserialize_with = "string_count::deserialize")]
    subscriber_count: Option<u64>,
    #[serde(rename = "viewCount", default, deserialize_with = "string_count::deserialize")]
    view_count: Option<u64>,
    #[serde(rename = "videoCount", default, deserialize_with = "string_count::deserialize")]
    video_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: ChannelStatistics,
}

#[derive(Debug, Deserialize)]
struct ContentDetailsItem {
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistItemDetails,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize, Default)]
struct VideoStatistics {
    #[serde(rename = "viewCount", default, deserialize_with = "string_count::deserialize")]
    view_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: VideoStatistics,
}

impl From<ChannelItem> for ChannelDetails {
    fn from(item: ChannelItem) -> Self {
        ChannelDetails {
            id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            subscribers: item.statistics.subscriber_count,
            total_views: item.statistics.view_count,
            video_count: item.statistics.video_count,
        }
    }
}

impl From<VideoItem> for VideoDetails {
    fn from(item: VideoItem) -> Self {
        VideoDetails {
            id: item.id,
            description: item.snippet.description,
            views: item.statistics.view_count,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct YoutubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl YoutubeClient {
    pub fn new(api_key: impl Into<String>) -> CollectResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let base_url = Url::parse(API_BASE)
            .map_err(|e| CollectError::Fatal(format!("bad YouTube base url: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> CollectResult<T> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| CollectError::Fatal(format!("bad endpoint {}: {}", endpoint, e)))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter())
            .append_pair("key", &self.api_key);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            CollectError::Malformed(format!(
                "YouTube {} response: {}. Preview: {}",
                endpoint,
                e,
                preview(&body, 300)
            ))
        })
    }

    async fn uploads_playlist(&self, channel_id: &str) -> CollectResult<Option<String>> {
        let response: ListResponse<ContentDetailsItem> = self
            .get_json("channels", &[("part", "contentDetails"), ("id", channel_id)])
            .await?;
        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details.related_playlists)
            .and_then(|p| p.uploads))
    }
}

#[async_trait]
impl ChannelSource for YoutubeClient {
    async fn search_channels(&self, query: &str, max_results: u32) -> CollectResult<Vec<String>> {
        let max = max_results.to_string();
        let response: ListResponse<SearchItem> = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("q", query),
                    ("type", "channel"),
                    ("maxResults", &max),
                ],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(|item| item.id.channel_id)
            .collect())
    }

    async fn channel_details(&self, ids: &[String]) -> CollectResult<Vec<ChannelDetails>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let response: ListResponse<ChannelItem> = self
            .get_json("channels", &[("part", "snippet,statistics"), ("id", &joined)])
            .await?;
        Ok(response.items.into_iter().map(ChannelDetails::from).collect())
    }

    async fn recent_video_ids(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> CollectResult<Vec<String>> {
        let Some(playlist) = self.uploads_playlist(channel_id).await? else {
            return Ok(Vec::new());
        };
        let max = max_results.to_string();
        let response: ListResponse<PlaylistItem> = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", &playlist),
                    ("maxResults", &max),
                ],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .map(|item| item.content_details.video_id)
            .collect())
    }

    async fn videos(&self, ids: &[String]) -> CollectResult<Vec<VideoDetails>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let response: ListResponse<VideoItem> = self
            .get_json("videos", &[("part", "snippet,statistics"), ("id", &joined)])
            .await?;
        Ok(response.items.into_iter().map(VideoDetails::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_counts_parse_from_strings() {
        let response: ListResponse<ChannelItem> = serde_json::from_str(
            r#"{"items": [{
                "id": "UC123",
                "snippet": {"title": "Jane Doe", "description": "IG: janedoe"},
                "statistics": {"subscriberCount": "12000", "viewCount": "450000",
                               "videoCount": "31", "hiddenSubscriberCount": false}
            }]}"#,
        )
        .unwrap();
        let details: Vec<ChannelDetails> =
            response.items.into_iter().map(ChannelDetails::from).collect();
        assert_eq!(details[0].subscribers, Some(12_000));
        assert_eq!(details[0].total_views, Some(450_000));
        assert_eq!(details[0].video_count, Some(31));
        assert_eq!(details[0].description, "IG: janedoe");
    }

    #[test]
    fn test_hidden_counts_are_none() {
        let item: ChannelItem =
            serde_json::from_str(r#"{"id": "UC1", "statistics": {"viewCount": 10}}"#).unwrap();
        assert_eq!(item.statistics.subscriber_count, None);
        assert_eq!(item.statistics.view_count, Some(10));
        assert_eq!(item.snippet.title, "");
    }

    #[test]
    fn test_search_skips_non_channel_results() {
        let response: ListResponse<SearchItem> = serde_json::from_str(
            r#"{"items": [{"id": {"kind": "youtube#channel", "channelId": "UCa"}},
                          {"id": {"kind": "youtube#video", "videoId": "v1"}}]}"#,
        )
        .unwrap();
        let ids: Vec<String> = response
            .items
            .into_iter()
            .filter_map(|i| i.id.channel_id)
            .collect();
        assert_eq!(ids, vec!["UCa".to_string()]);
    }

    #[test]
    fn test_empty_list_response() {
        let response: ListResponse<VideoItem> =
            serde_json::from_str(r#"{"kind": "youtube#videoListResponse"}"#).unwrap();
        assert!(response.items.is_empty());
    }
}
