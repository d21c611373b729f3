//! Identity verification for photo-platform handles.

use tracing::debug;

use super::ranker::significant_words;
use crate::config::VerifierConfig;
use crate::error::CollectError;
use crate::services::{ProfileSnapshot, ProfileSource};

const STOP_WORDS: [&str; 5] = ["the", "a", "an", "and", "or"];

/// Outcome of checking one handle against one artist.
#[derive(Debug)]
pub enum Verification {
    Verified(ProfileSnapshot),
    /// The account exists but doesn't look like the artist.
    Rejected,
    NotFound,
    Transient(CollectError),
    Fatal(CollectError),
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified(_))
    }

    fn from_lookup_error(err: CollectError) -> Self {
        match err {
            CollectError::NotFound(_) => Verification::NotFound,
            e if e.is_retryable() => Verification::Transient(e),
            e => Verification::Fatal(e),
        }
    }
}

/// Name or music-keyword evidence in the profile text, plus enough
/// followers to rule out empty and spam accounts.
pub fn is_plausible_match(
    profile: &ProfileSnapshot,
    artist_name: &str,
    config: &VerifierConfig,
) -> bool {
    let full_name = profile.full_name.as_deref().unwrap_or("").to_lowercase();
    let bio = profile.biography.as_deref().unwrap_or("").to_lowercase();

    let name_match = significant_words(artist_name, &STOP_WORDS)
        .iter()
        .any(|w| full_name.contains(w.as_str()) || bio.contains(w.as_str()));
    let keyword_match = config
        .music_keywords
        .iter()
        .any(|k| full_name.contains(k.as_str()) || bio.contains(k.as_str()));
    let credible = profile.followers.unwrap_or(0) >= config.min_followers;

    (name_match || keyword_match) && credible
}

/// Look `handle` up and decide whether it belongs to `artist_name`. Lookup
/// failures come back as variants, never as errors.
pub async fn verify_handle(
    source: &dyn ProfileSource,
    handle: &str,
    artist_name: &str,
    config: &VerifierConfig,
) -> Verification {
    let profile = match source.profile(handle).await {
        Ok(profile) => profile,
        Err(e) => {
            debug!("   Lookup of @{} failed: {}", handle, e);
            return Verification::from_lookup_error(e);
        }
    };

    if is_plausible_match(&profile, artist_name, config) {
        Verification::Verified(profile)
    } else {
        debug!("   @{} doesn't look like {}", handle, artist_name);
        Verification::Rejected
    }
}
