use std::cmp::Reverse;

use radar_types::{Platform, SocialCandidate};

use crate::config::RankerConfig;

const STOP_WORDS: [&str; 4] = ["the", "a", "an", "and"];

const OFFICIAL_BONUS: i32 = 10;
const TITLE_WORD_POINTS: i32 = 5;
const DESCRIPTION_WORD_POINTS: i32 = 2;
const PLAUSIBLE_BAND_BONUS: i32 = 1;

/// One channel search result with its statistics attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCandidate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub subscribers: u64,
}

/// Lower-cased words of `name` that carry identity: longer than two chars
/// and not a stop word.
pub fn significant_words(name: &str, stop_words: &[&str]) -> Vec<String> {
    name.to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !stop_words.contains(w))
        .map(str::to_string)
        .collect()
}

pub fn score_channel(words: &[String], channel: &ChannelCandidate, config: &RankerConfig) -> i32 {
    let title = channel.title.to_lowercase();
    let description = channel.description.to_lowercase();

    let mut score = 0;
    if title.contains("official") {
        score += OFFICIAL_BONUS;
    }
    for word in words {
        if title.contains(word.as_str()) {
            score += TITLE_WORD_POINTS;
        }
        if description.contains(word.as_str()) {
            score += DESCRIPTION_WORD_POINTS;
        }
    }
    if (config.plausible_min..=config.plausible_max).contains(&channel.subscribers) {
        score += PLAUSIBLE_BAND_BONUS;
    }
    score
}

/// Every channel above the subscriber floor, scored and sorted best first
/// by `(score, subscribers)`.
pub fn scored_channels(
    artist_name: &str,
    channels: &[ChannelCandidate],
    config: &RankerConfig,
) -> Vec<SocialCandidate> {
    let words = significant_words(artist_name, &STOP_WORDS);

    let mut scored: Vec<SocialCandidate> = channels
        .iter()
        .filter(|c| c.subscribers >= config.min_subscribers)
        .map(|c| SocialCandidate {
            platform: Platform::VideoChannel,
            id: c.id.clone(),
            followers: c.subscribers,
            score: score_channel(&words, c, config),
            evidence: c.title.clone(),
        })
        .collect();

    // Stable sort keeps search order among exact ties.
    scored.sort_by_key(|c| Reverse((c.score, c.followers)));
    scored
}

/// Best channel for `artist_name`, or `None` when even the best one scores
/// below the acceptance threshold.
pub fn rank_channels(
    artist_name: &str,
    channels: &[ChannelCandidate],
    config: &RankerConfig,
) -> Option<SocialCandidate> {
    scored_channels(artist_name, channels, config)
        .into_iter()
        .next()
        .filter(|best| best.score >= config.accept_score)
}
