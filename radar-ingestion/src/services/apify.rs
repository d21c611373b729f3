// Apify API Service Module
// Photo-platform profiles and posts via Apify's Instagram actors

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{PostSnapshot, ProfileSnapshot, ProfileSource};
use crate::error::{classify_status, preview, CollectError, CollectResult};

const API_BASE: &str = "https://api.apify.com/v2";
const PROFILE_ACTOR: &str = "apify~instagram-profile-scraper";
const POST_ACTOR: &str = "apify~instagram-post-scraper";

pub struct ApifyClient {
    client: Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: impl Into<String>) -> CollectResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            token: token.into(),
            base_url: API_BASE.to_string(),
        })
    }

    /// Run an actor through the run-sync endpoint, which waits for the run
    /// and returns its dataset items directly.
    async fn run_actor_sync<T: DeserializeOwned>(
        &self,
        actor_id: &str,
        input: serde_json::Value,
        timeout_secs: u64,
    ) -> CollectResult<Vec<T>> {
        let url = format!(
            "{}/acts/{}/run-sync-get-dataset-items?token={}",
            self.base_url,
            actor_id,
            urlencoding::encode(&self.token)
        );

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(timeout_secs))
            .json(&input)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, &response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            CollectError::Malformed(format!(
                "Failed to parse {} response: {}. Preview: {}",
                actor_id,
                e,
                preview(&response_text, 500)
            ))
        })
    }
}

// ============================================================================
// Instagram Profile Scraper (apify~instagram-profile-scraper)
// ============================================================================

#[derive(Debug, Deserialize, Clone)]
struct InstagramProfile {
    username: Option<String>,
    #[serde(rename = "fullName")]
    full_name: Option<String>,
    biography: Option<String>,
    #[serde(rename = "followersCount")]
    followers_count: Option<u64>,
    #[serde(rename = "followsCount")]
    follows_count: Option<u64>,
    #[serde(rename = "postsCount")]
    posts_count: Option<u64>,
    verified: Option<bool>,
    private: Option<bool>,
    /// Set instead of the profile fields when the actor couldn't load it.
    error: Option<String>,
}

fn profile_from_items(handle: &str, items: Vec<InstagramProfile>) -> CollectResult<ProfileSnapshot> {
    let Some(profile) = items.into_iter().next() else {
        return Err(CollectError::NotFound(format!("No profile found for @{}", handle)));
    };

    if let Some(err) = profile.error {
        return Err(CollectError::NotFound(format!("@{}: {}", handle, err)));
    }

    Ok(ProfileSnapshot {
        handle: profile.username.unwrap_or_else(|| handle.to_string()),
        full_name: profile.full_name,
        biography: profile.biography,
        followers: profile.followers_count,
        following: profile.follows_count,
        posts: profile.posts_count,
        verified: profile.verified,
        private: profile.private,
    })
}

// ============================================================================
// Instagram Post Scraper (apify~instagram-post-scraper)
// ============================================================================

#[derive(Debug, Deserialize, Clone)]
struct InstagramPost {
    #[serde(rename = "likesCount")]
    likes_count: Option<i64>,
    #[serde(rename = "commentsCount")]
    comments_count: Option<i64>,
    #[serde(rename = "type")]
    post_type: Option<String>,
}

impl From<InstagramPost> for PostSnapshot {
    fn from(post: InstagramPost) -> Self {
        // Hidden like counts come back as -1.
        PostSnapshot {
            likes: post.likes_count.and_then(|n| u64::try_from(n).ok()),
            comments: post.comments_count.and_then(|n| u64::try_from(n).ok()),
            is_video: post
                .post_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("video")),
        }
    }
}

#[async_trait]
impl ProfileSource for ApifyClient {
    async fn profile(&self, handle: &str) -> CollectResult<ProfileSnapshot> {
        debug!("📱 Getting Instagram profile info for @{}", handle);

        let input = json!({
            "usernames": [handle]
        });

        let items = self
            .run_actor_sync::<InstagramProfile>(PROFILE_ACTOR, input, 120)
            .await?;
        profile_from_items(handle, items)
    }

    async fn recent_posts(&self, handle: &str, limit: usize) -> CollectResult<Vec<PostSnapshot>> {
        debug!("🖼️  Fetching {} recent posts for @{}", limit, handle);

        let input = json!({
            "username": [handle],
            "resultsLimit": limit
        });

        let posts = self
            .run_actor_sync::<InstagramPost>(POST_ACTOR, input, 300)
            .await?;
        Ok(posts.into_iter().take(limit).map(PostSnapshot::from).collect())
    }
}
