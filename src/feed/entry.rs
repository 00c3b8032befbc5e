use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The kind of content a source produces. Fixed per source and inherited by
/// every entry from that source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Article,
    Podcast,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Article => "article",
            ContentKind::Podcast => "podcast",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized feed entry: the one shape every source's raw entries are
/// converted into before aggregation.
///
/// Entries are immutable once constructed and live only for the duration of
/// a single run. `published` is always present (second precision, UTC); a
/// raw entry without a date falls back to the run's processing instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Entry title; "Untitled" when the source omits one.
    pub title: String,
    /// Permalink URL; empty when the source omits one.
    pub link: String,
    /// YouTube video id, when the source is a video channel and the id could
    /// be resolved.
    pub video_id: Option<String>,
    /// Plain-text description. Tag-stripped and truncated to 500 characters
    /// for generic sources; the raw summary for video sources.
    pub description: String,
    /// Publish time, truncated to whole seconds.
    pub published: DateTime<Utc>,
    /// Entry author, defaulting to the source's display name.
    pub author: String,
    /// The source's display name.
    pub channel_name: String,
    /// YouTube channel id; only set for video-channel sources.
    pub channel_id: Option<String>,
    /// Highest-resolution thumbnail available for the entry.
    pub thumbnail_url: Option<String>,
    /// Embeddable player URL; only set for video entries with a resolved id.
    pub embed_url: Option<String>,
    pub kind: ContentKind,
}

/// Channel-level metadata plus the ordered entries of one run, handed to the
/// serializer as a unit.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Public URL of the generated document, for the channel's Atom
    /// self-link. Omitted when not configured.
    pub self_url: Option<String>,
    /// Channel image URL. Omitted when not configured.
    pub image_url: Option<String>,
    pub generator: String,
    pub build_date: DateTime<Utc>,
    pub entries: Vec<Entry>,
}
