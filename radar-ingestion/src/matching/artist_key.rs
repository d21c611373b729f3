/// Lower-cased, trimmed form of a display name. Two names with the same
/// normalized form are the same artist.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Stable 32-char hex key for an artist, derived from the normalized name.
pub fn artist_key(name: &str) -> String {
    format!("{:x}", md5::compute(normalize_name(name).as_bytes()))
}
