//! Merging, ordering, and capping of normalized entries.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::feed::entry::{Entry, FeedDocument};

/// Merges per-source entry lists into one newest-first list capped at
/// `total_cap`.
///
/// The input lists must be in source-configuration order and already capped
/// per source; this function does not re-cap them. `Vec::sort_by` is stable,
/// so entries with equal publish times keep their concatenation order
/// (source order first, feed order within a source). Given identical inputs
/// the output is identical, regardless of how the inputs were fetched.
pub fn aggregate(per_source: Vec<Vec<Entry>>, total_cap: usize) -> Vec<Entry> {
    let mut merged: Vec<Entry> = per_source.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.published.cmp(&a.published));
    merged.truncate(total_cap);
    merged
}

/// Assembles the document handed to the serializer: channel metadata from
/// the configuration plus the already-ordered entries.
pub fn build_document(
    config: &Config,
    entries: Vec<Entry>,
    build_date: DateTime<Utc>,
) -> FeedDocument {
    FeedDocument {
        title: config.title.clone(),
        link: config.link.clone(),
        description: config.description.clone(),
        self_url: config.self_url.clone(),
        image_url: config.image_url.clone(),
        generator: config.generator.clone(),
        build_date,
        entries,
    }
}
