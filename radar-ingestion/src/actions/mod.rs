//! Entry points for each `ACTION`, plus the automated loop that chains them.

use std::path::Path;

use radar_types::ArtistRecord;
use serde::de::DeserializeOwned;

use crate::error::{CollectError, CollectResult};
use crate::repository::read_optional_table;

pub mod automated;
pub mod discover;
pub mod insights;
pub mod instagram;
pub mod merge;
pub mod score;
pub mod youtube;

/// Round half away from zero to `places` decimals.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Load a table an earlier stage must have produced.
pub(crate) fn read_required_table<T: DeserializeOwned>(
    path: &Path,
    produced_by: &str,
) -> CollectResult<Vec<T>> {
    read_optional_table(path)?.ok_or_else(|| {
        CollectError::NotFound(format!(
            "{} not found, run {} first",
            path.display(),
            produced_by
        ))
    })
}

pub(crate) fn read_artists(path: &Path) -> CollectResult<Vec<ArtistRecord>> {
    read_required_table(path, "DISCOVER")
}
