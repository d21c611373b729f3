// Runtime configuration
// Every tunable is read from the environment (after .env) with a default.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::collector::backoff::BackoffPolicy;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Seconds from the environment. Negative, infinite or out-of-range values
/// fall back to `default`.
fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

// ============================================================================
// Matching thresholds
// ============================================================================

#[derive(Debug, Clone)]
pub struct RankerConfig {
    /// Channels below this subscriber count are never candidates.
    pub min_subscribers: u64,
    /// Inclusive band that earns the plausibility bonus.
    pub plausible_min: u64,
    pub plausible_max: u64,
    /// Best candidate must reach this score to be returned.
    pub accept_score: i32,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            min_subscribers: 500,
            plausible_min: 500,
            plausible_max: 500_000,
            accept_score: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub min_followers: u64,
    pub music_keywords: Vec<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            min_followers: 5_000,
            music_keywords: ["music", "artist", "band", "musician", "singer", "songwriter"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ============================================================================
// Per-stage settings
// ============================================================================

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub genres: Vec<String>,
    pub country: String,
    pub tag_limit: u32,
    pub country_limit: u32,
    pub min_listeners: u64,
    pub max_listeners: u64,
    pub established_artists: Vec<String>,
    pub tag_delay: Duration,
    pub detail_delay: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            genres: DEFAULT_GENRES.iter().map(|s| s.to_string()).collect(),
            country: "united kingdom".to_string(),
            tag_limit: 100,
            country_limit: 200,
            min_listeners: 5_000,
            max_listeners: 200_000,
            established_artists: ESTABLISHED_ARTISTS.iter().map(|s| s.to_string()).collect(),
            tag_delay: Duration::from_secs(1),
            detail_delay: Duration::from_millis(500),
        }
    }
}

const DEFAULT_GENRES: &[&str] = &[
    "jazz",
    "folk",
    "alternative",
    "soul",
    "indie",
    "indie folk",
    "british soul",
    "uk jazz",
    "indie rock",
    "singer-songwriter",
    "british indie",
    "acoustic",
    "neo soul",
    "jazz fusion",
];

const ESTABLISHED_ARTISTS: &[&str] = &[
    "coldplay",
    "radiohead",
    "adele",
    "ed sheeran",
    "arctic monkeys",
    "the 1975",
    "david bowie",
    "pink floyd",
    "the beatles",
    "rolling stones",
];

#[derive(Debug, Clone)]
pub struct InstagramConfig {
    pub artist_delay: Duration,
    pub video_delay: Duration,
    pub max_posts: usize,
    pub max_videos: usize,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            artist_delay: Duration::from_secs(10),
            video_delay: Duration::from_millis(500),
            max_posts: 12,
            max_videos: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub artist_delay: Duration,
    pub search_results: u32,
    pub recent_videos: u32,
    pub quota_ceiling: u32,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            artist_delay: Duration::from_secs(1),
            search_results: 10,
            recent_videos: 10,
            quota_ceiling: 9_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutomationConfig {
    pub max_iterations: Option<u32>,
    pub iteration_wait: Duration,
    pub stage_pause: Duration,
    pub stage_timeout: Duration,
    pub discover: BackoffPolicy,
    pub instagram: BackoffPolicy,
    pub youtube: BackoffPolicy,
    pub merge: BackoffPolicy,
    pub score: BackoffPolicy,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        let general = Duration::from_secs(30);
        Self {
            max_iterations: None,
            iteration_wait: Duration::from_secs(1800),
            stage_pause: Duration::from_secs(10),
            stage_timeout: Duration::from_secs(7200),
            discover: BackoffPolicy::new(2, general, general),
            instagram: BackoffPolicy::new(5, Duration::from_secs(60), Duration::from_secs(1320)),
            youtube: BackoffPolicy::new(3, general, Duration::from_secs(300)),
            merge: BackoffPolicy::new(2, general, general),
            score: BackoffPolicy::new(2, general, general),
        }
    }
}

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub lastfm_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
    pub apify_api_token: Option<String>,
    pub checkpoint_interval: usize,
    /// Retries of one artist inside a pass after a network blip or timeout.
    pub artist_retry: BackoffPolicy,
    pub apply_score_filter: bool,
    pub show_progress: bool,
    pub ranker: RankerConfig,
    pub verifier: VerifierConfig,
    pub discovery: DiscoveryConfig,
    pub instagram: InstagramConfig,
    pub youtube: YoutubeConfig,
    pub automation: AutomationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            lastfm_api_key: None,
            youtube_api_key: None,
            apify_api_token: None,
            checkpoint_interval: 50,
            artist_retry: BackoffPolicy::new(3, Duration::from_secs(5), Duration::from_secs(5)),
            apply_score_filter: false,
            show_progress: true,
            ranker: RankerConfig::default(),
            verifier: VerifierConfig::default(),
            discovery: DiscoveryConfig::default(),
            instagram: InstagramConfig::default(),
            youtube: YoutubeConfig::default(),
            automation: AutomationConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Config::default();

        let max_iterations = if env_or("RUN_ONCE", false) {
            Some(1)
        } else {
            env::var("MAX_ITERATIONS").ok().and_then(|s| s.parse().ok())
        };

        let a = &d.automation;
        let automation = AutomationConfig {
            max_iterations,
            iteration_wait: env_secs("ITERATION_WAIT_SECS", a.iteration_wait),
            stage_pause: env_secs("STAGE_PAUSE_SECS", a.stage_pause),
            stage_timeout: env_secs("STAGE_TIMEOUT_SECS", a.stage_timeout),
            discover: a.discover.clone(),
            instagram: BackoffPolicy::new(
                env_or("INSTAGRAM_MAX_RETRIES", a.instagram.max_attempts),
                env_secs("INSTAGRAM_RETRY_DELAY_SECS", a.instagram.retry_delay),
                env_secs("INSTAGRAM_RATE_LIMIT_WAIT_SECS", a.instagram.rate_limit_delay),
            ),
            youtube: BackoffPolicy::new(
                env_or("YOUTUBE_MAX_RETRIES", a.youtube.max_attempts),
                env_secs("GENERAL_RETRY_DELAY_SECS", a.youtube.retry_delay),
                env_secs("YOUTUBE_QUOTA_WAIT_SECS", a.youtube.rate_limit_delay),
            ),
            merge: a.merge.clone(),
            score: a.score.clone(),
        };

        Self {
            data_dir: env::var("RADAR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.data_dir),
            lastfm_api_key: env::var("LASTFM_API_KEY").ok(),
            youtube_api_key: env::var("YOUTUBE_API_KEY").ok(),
            apify_api_token: env::var("APIFY_API_TOKEN").ok(),
            checkpoint_interval: env_or("CHECKPOINT_INTERVAL", d.checkpoint_interval).max(1),
            artist_retry: BackoffPolicy::new(
                env_or("ARTIST_MAX_RETRIES", d.artist_retry.max_attempts),
                env_secs("ARTIST_RETRY_DELAY_SECS", d.artist_retry.retry_delay),
                d.artist_retry.rate_limit_delay,
            ),
            apply_score_filter: env_or("SCORE_APPLY_FILTER", d.apply_score_filter),
            show_progress: env_or("SHOW_PROGRESS", d.show_progress),
            ranker: RankerConfig {
                min_subscribers: env_or("RANKER_MIN_SUBSCRIBERS", d.ranker.min_subscribers),
                plausible_min: env_or("RANKER_PLAUSIBLE_MIN", d.ranker.plausible_min),
                plausible_max: env_or("RANKER_PLAUSIBLE_MAX", d.ranker.plausible_max),
                accept_score: env_or("RANKER_ACCEPT_SCORE", d.ranker.accept_score),
            },
            verifier: VerifierConfig {
                min_followers: env_or("VERIFIER_MIN_FOLLOWERS", d.verifier.min_followers),
                music_keywords: d.verifier.music_keywords,
            },
            discovery: DiscoveryConfig {
                genres: env_list("LASTFM_GENRES", DEFAULT_GENRES),
                country: env::var("LASTFM_COUNTRY").unwrap_or(d.discovery.country),
                ..d.discovery
            },
            instagram: InstagramConfig {
                artist_delay: env_secs("INSTAGRAM_ARTIST_DELAY_SECS", d.instagram.artist_delay),
                ..d.instagram
            },
            youtube: YoutubeConfig {
                quota_ceiling: env_or("YOUTUBE_QUOTA_CEILING", d.youtube.quota_ceiling),
                ..d.youtube
            },
            automation,
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn lastfm_table(&self) -> PathBuf {
        self.raw_dir().join("lastfm_artists_raw.csv")
    }

    pub fn instagram_table(&self) -> PathBuf {
        self.raw_dir().join("instagram_data_raw.csv")
    }

    pub fn youtube_table(&self) -> PathBuf {
        self.raw_dir().join("youtube_data_raw.csv")
    }

    pub fn merged_table(&self) -> PathBuf {
        self.raw_dir().join("artist_raw_data_merged.csv")
    }

    pub fn scored_table(&self) -> PathBuf {
        self.data_dir.join("artist_scores.csv")
    }

    /// Side table holding a pass's rows until the pass completes.
    pub fn partial_table(&self, source: &str) -> PathBuf {
        self.raw_dir().join(format!("{}_partial.csv", source))
    }

    pub fn checkpoint_file(&self) -> PathBuf {
        self.logs_dir().join("checkpoint.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("automated_collection.log")
    }

    pub fn insights_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Config for tests and dry runs: no pacing, everything under `dir`.
    pub fn for_data_dir(dir: impl Into<PathBuf>) -> Self {
        let mut config = Config {
            data_dir: dir.into(),
            show_progress: false,
            ..Config::default()
        };
        config.discovery.tag_delay = Duration::ZERO;
        config.discovery.detail_delay = Duration::ZERO;
        config.instagram.artist_delay = Duration::ZERO;
        config.instagram.video_delay = Duration::ZERO;
        config.youtube.artist_delay = Duration::ZERO;
        config.artist_retry.retry_delay = Duration::ZERO;
        config.automation.stage_pause = Duration::ZERO;
        config.automation.iteration_wait = Duration::ZERO;
        config
    }
}
