//! Raw-entry normalization.
//!
//! Two variants share the canonical [`Entry`] output shape:
//!
//! - [`video_entry`] for YouTube channel feeds: resolves the video id,
//!   derives thumbnail/embed URLs from it, and keeps the raw summary
//!   untouched.
//! - [`generic_entry`] for standard RSS/Atom feeds: strips markup from the
//!   description, truncates it, and picks up thumbnails from Media RSS
//!   metadata when present.
//!
//! Both tolerate any missing optional field by substituting defaults; a
//! malformed field never fails the entry, only a whole-feed fetch/parse
//! failure suppresses a source. An entry without a publish time gets the
//! caller-supplied processing instant, so callers (and tests) control the
//! clock.

use chrono::{DateTime, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::FeedSource;
use crate::feed::entry::{ContentKind, Entry};
use crate::util::{strip_html_tags, truncate_chars};

/// Generic descriptions are cut to this many characters after tag stripping.
pub const DESCRIPTION_LIMIT: usize = 500;

/// YouTube watch links carry the video id in the `v` query parameter.
static VIDEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"v=([A-Za-z0-9_-]{11})").expect("literal pattern"));

fn video_thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg")
}

fn video_embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}")
}

/// Publish times are kept at second precision.
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Normalizes one entry of a YouTube channel feed.
///
/// The video id comes from the entry's `yt:video:` id tag when present,
/// falling back to the `v=` parameter of the watch link. Thumbnail and
/// embed URLs are derived from the id; an entry whose id cannot be resolved
/// keeps `kind = Video` but carries none of the id-derived fields.
pub fn video_entry(
    raw: feed_rs::model::Entry,
    channel_name: &str,
    channel_id: &str,
    now: DateTime<Utc>,
) -> Entry {
    let link = raw
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let video_id = raw
        .id
        .strip_prefix("yt:video:")
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| VIDEO_ID_RE.captures(&link).map(|c| c[1].to_string()));

    let author = raw
        .authors
        .first()
        .map(|p| p.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| channel_name.to_string());

    let published = raw
        .published
        .map(truncate_to_seconds)
        .unwrap_or_else(|| truncate_to_seconds(now));

    // YouTube puts the description in media:group, not in a summary element;
    // feed-rs surfaces whichever was present. Kept raw, unlike generic feeds.
    let description = raw
        .summary
        .map(|t| t.content)
        .or_else(|| {
            raw.media
                .iter()
                .find_map(|m| m.description.as_ref().map(|d| d.content.clone()))
        })
        .unwrap_or_default();

    let title = raw
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled".to_string());

    let thumbnail_url = video_id.as_deref().map(video_thumbnail_url);
    let embed_url = video_id.as_deref().map(video_embed_url);

    Entry {
        title,
        link,
        video_id,
        description,
        published,
        author,
        channel_name: channel_name.to_string(),
        channel_id: Some(channel_id.to_string()),
        thumbnail_url,
        embed_url,
        kind: ContentKind::Video,
    }
}

/// Normalizes one entry of a standard RSS/Atom feed.
pub fn generic_entry(raw: feed_rs::model::Entry, source: &FeedSource, now: DateTime<Utc>) -> Entry {
    let link = raw
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let thumbnail_url = media_image(&raw.media);

    let author = raw
        .authors
        .first()
        .map(|p| p.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| source.name.clone());

    let published = raw
        .published
        .or(raw.updated)
        .map(truncate_to_seconds)
        .unwrap_or_else(|| truncate_to_seconds(now));

    let raw_description = raw
        .summary
        .map(|t| t.content)
        .or_else(|| raw.content.and_then(|c| c.body))
        .unwrap_or_default();
    let description = truncate_chars(strip_html_tags(&raw_description).as_ref(), DESCRIPTION_LIMIT)
        .to_string();

    let title = raw
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled".to_string());

    Entry {
        title,
        link,
        video_id: None,
        description,
        published,
        author,
        channel_name: source.name.clone(),
        channel_id: None,
        thumbnail_url,
        embed_url: None,
        kind: source.content_kind,
    }
}

/// Best image reference in the entry's Media RSS metadata: an image-typed
/// media content first, then the first declared thumbnail.
fn media_image(media: &[feed_rs::model::MediaObject]) -> Option<String> {
    for object in media {
        for content in &object.content {
            let is_image = content
                .content_type
                .as_ref()
                .is_some_and(|t| t.to_string().starts_with("image/"));
            if is_image {
                if let Some(url) = &content.url {
                    return Some(url.to_string());
                }
            }
        }
    }

    media
        .iter()
        .find_map(|m| m.thumbnails.first())
        .map(|t| t.image.uri.clone())
}
