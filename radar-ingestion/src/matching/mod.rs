//! Cross-platform identity resolution: stable artist keys, handle
//! extraction, channel ranking and profile verification.

pub mod artist_key;
pub mod handles;
pub mod ranker;
pub mod verifier;

pub use artist_key::artist_key;
pub use handles::extract_handles;
pub use ranker::{rank_channels, ChannelCandidate};
pub use verifier::{verify_handle, Verification};
