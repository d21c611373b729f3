// Last.fm API client
// Tag and country charts for discovery, artist.getinfo for listener stats

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{string_count, ArtistInfo, ListeningStatsSource};
use crate::error::{classify_status, preview, CollectError, CollectResult};

const API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const MAX_TAGS: usize = 5;

// Documented Last.fm error codes
const ERR_INVALID_PARAMS: i64 = 6;
const ERR_OPERATION_FAILED: i64 = 8;
const ERR_SERVICE_OFFLINE: i64 = 11;
const ERR_TEMPORARY: i64 = 16;
const ERR_RATE_LIMIT: i64 = 29;

#[derive(Debug, Deserialize)]
struct ApiError {
    error: i64,
    #[serde(default)]
    message: String,
}

fn api_error(err: ApiError) -> CollectError {
    let message = format!("Last.fm error {}: {}", err.error, err.message);
    match err.error {
        ERR_RATE_LIMIT => CollectError::RateLimited(message),
        ERR_INVALID_PARAMS => CollectError::NotFound(message),
        ERR_OPERATION_FAILED | ERR_SERVICE_OFFLINE | ERR_TEMPORARY => {
            CollectError::TransientNetwork(message)
        }
        _ => CollectError::Fatal(message),
    }
}

#[derive(Debug, Deserialize)]
struct TopArtistsResponse {
    topartists: TopArtists,
}

#[derive(Debug, Deserialize)]
struct TopArtists {
    #[serde(default)]
    artist: Vec<ChartArtist>,
}

#[derive(Debug, Deserialize)]
struct ChartArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArtistInfoResponse {
    artist: ArtistBody,
}

#[derive(Debug, Deserialize)]
struct ArtistBody {
    name: String,
    url: Option<String>,
    #[serde(default)]
    stats: Option<ArtistStats>,
    /// `{"tag": [..]}`, `{"tag": {..}}` for a single tag, or `""` for none.
    #[serde(default)]
    tags: Value,
}

#[derive(Debug, Deserialize, Default)]
struct ArtistStats {
    #[serde(default, deserialize_with = "string_count::deserialize")]
    listeners: Option<u64>,
    #[serde(default, deserialize_with = "string_count::deserialize")]
    playcount: Option<u64>,
}

fn tag_names(tags: &Value) -> Vec<String> {
    let names = |tag: &Value| tag.get("name").and_then(Value::as_str).map(str::to_string);
    match tags.get("tag") {
        Some(Value::Array(list)) => list.iter().filter_map(names).take(MAX_TAGS).collect(),
        Some(single @ Value::Object(_)) => names(single).into_iter().collect(),
        _ => Vec::new(),
    }
}

impl From<ArtistBody> for ArtistInfo {
    fn from(body: ArtistBody) -> Self {
        let stats = body.stats.unwrap_or_default();
        ArtistInfo {
            tags: tag_names(&body.tags),
            name: body.name,
            listeners: stats.listeners.unwrap_or(0),
            playcount: stats.playcount.unwrap_or(0),
            url: body.url.filter(|u| !u.is_empty()),
        }
    }
}

/// Last.fm reports most failures as HTTP 200 with an `error` body.
fn parse_body<T: for<'de> Deserialize<'de>>(method: &str, body: &str) -> CollectResult<T> {
    if let Ok(err) = serde_json::from_str::<ApiError>(body) {
        return Err(api_error(err));
    }
    serde_json::from_str(body).map_err(|e| {
        CollectError::Malformed(format!(
            "Last.fm {} response: {}. Preview: {}",
            method,
            e,
            preview(body, 300)
        ))
    })
}

pub struct LastfmClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl LastfmClient {
    pub fn new(api_key: impl Into<String>) -> CollectResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let base_url = Url::parse(API_BASE)
            .map_err(|e| CollectError::Fatal(format!("bad Last.fm base url: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
        })
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> CollectResult<T> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("method", method)
            .extend_pairs(params.iter())
            .append_pair("api_key", &self.api_key)
            .append_pair("format", "json");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Error bodies carry the more precise code.
            return match serde_json::from_str::<ApiError>(&body) {
                Ok(err) => Err(api_error(err)),
                Err(_) => Err(classify_status(status, &body)),
            };
        }
        parse_body(method, &body)
    }
}

#[async_trait]
impl ListeningStatsSource for LastfmClient {
    async fn top_artists_by_tag(&self, tag: &str, limit: u32) -> CollectResult<Vec<String>> {
        let limit = limit.to_string();
        let response: TopArtistsResponse = self
            .call("tag.gettopartists", &[("tag", tag), ("limit", &limit)])
            .await?;
        Ok(response.topartists.artist.into_iter().map(|a| a.name).collect())
    }

    async fn top_artists_by_country(&self, country: &str, limit: u32) -> CollectResult<Vec<String>> {
        let limit = limit.to_string();
        let response: TopArtistsResponse = self
            .call("geo.gettopartists", &[("country", country), ("limit", &limit)])
            .await?;
        Ok(response.topartists.artist.into_iter().map(|a| a.name).collect())
    }

    async fn artist_info(&self, name: &str) -> CollectResult<ArtistInfo> {
        let response: ArtistInfoResponse =
            self.call("artist.getinfo", &[("artist", name)]).await?;
        Ok(response.artist.into())
    }
}
