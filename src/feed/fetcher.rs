//! Per-source feed retrieval.
//!
//! Every configured source is fetched independently: a failure is recorded
//! against that source alone and the rest of the run continues. The
//! aggregation layer only ever sees entries; callers decide how to report
//! the failures this module returns.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::{Config, FeedSource, Source, YouTubeChannel};
use crate::feed::entry::Entry;
use crate::feed::normalize;
use crate::util::{validate_url, UrlError};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const MAX_CONCURRENT_FETCHES: usize = 4;

/// Channel pages embed the canonical id as a JSON field; a few layouts use
/// a feed link with a query parameter instead.
static CHANNEL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""channelId":"(UC[A-Za-z0-9_-]{22})""#).expect("literal pattern"));
static CHANNEL_ID_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"channel_id=(UC[A-Za-z0-9_-]{22})").expect("literal pattern"));

/// Errors that can occur while fetching one source.
///
/// These never abort the run; each value is reported for its source and the
/// source contributes zero entries.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Configured feed URL failed validation
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlError),
    /// Channel page did not reveal a channel id for the handle
    #[error("Could not resolve handle @{0} to a channel id")]
    HandleNotResolved(String),
    /// Channel configured with neither channel_id nor handle
    #[error("Channel '{0}' has no channel_id or handle")]
    MissingChannelId(String),
}

/// Outcome of one source: its display name plus entries or the failure
/// that suppressed them.
pub struct SourceResult {
    pub name: String,
    pub entries: Result<Vec<Entry>, FetchError>,
}

/// Fetches and normalizes every configured source.
///
/// Sources are fetched concurrently, but results come back in configuration
/// order (`buffered`, not `buffer_unordered`): entries with equal publish
/// times must keep a deterministic tie-break downstream, and that tie-break
/// is defined over configuration order, not completion order.
///
/// `now` is the processing instant substituted for entries without a
/// publish time; passing it in keeps the pipeline testable with a fixed
/// clock.
pub async fn collect_all(
    client: &reqwest::Client,
    config: &Config,
    now: DateTime<Utc>,
) -> Vec<SourceResult> {
    let per_source_cap = config.per_source_cap;

    stream::iter(config.sources())
        .map(|source| async move {
            let name = source.name().to_string();
            let entries = fetch_source(client, &source, per_source_cap, now).await;
            SourceResult { name, entries }
        })
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await
}

/// Fetches one source and normalizes its entries, capped to `cap`.
pub async fn fetch_source(
    client: &reqwest::Client,
    source: &Source,
    cap: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Entry>, FetchError> {
    match source {
        Source::YouTube(channel) => fetch_channel(client, channel, cap, now).await,
        Source::Feed(feed) => fetch_generic(client, feed, cap, now).await,
    }
}

async fn fetch_channel(
    client: &reqwest::Client,
    channel: &YouTubeChannel,
    cap: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Entry>, FetchError> {
    let channel_id = if let Some(id) = &channel.channel_id {
        id.clone()
    } else if let Some(handle) = &channel.handle {
        resolve_channel_id(client, handle).await?
    } else {
        return Err(FetchError::MissingChannelId(channel.name.clone()));
    };

    let feed = fetch_feed(client, &youtube_feed_url(&channel_id)).await?;
    Ok(feed
        .entries
        .into_iter()
        .take(cap)
        .map(|raw| normalize::video_entry(raw, &channel.name, &channel_id, now))
        .collect())
}

async fn fetch_generic(
    client: &reqwest::Client,
    source: &FeedSource,
    cap: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Entry>, FetchError> {
    let url = validate_url(&source.url)?;
    let feed = fetch_feed(client, url.as_str()).await?;
    Ok(feed
        .entries
        .into_iter()
        .take(cap)
        .map(|raw| normalize::generic_entry(raw, source, now))
        .collect())
}

/// The RSS feed YouTube publishes for a channel.
pub fn youtube_feed_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}")
}

/// Resolves a channel @handle to a channel id by fetching the channel page
/// and scanning its markup.
pub async fn resolve_channel_id(
    client: &reqwest::Client,
    handle: &str,
) -> Result<String, FetchError> {
    let url = format!("https://www.youtube.com/@{handle}");
    let bytes = fetch_bytes(client, &url).await?;
    let html = String::from_utf8_lossy(&bytes);
    extract_channel_id(&html).ok_or_else(|| FetchError::HandleNotResolved(handle.to_string()))
}

fn extract_channel_id(html: &str) -> Option<String> {
    CHANNEL_ID_RE
        .captures(html)
        .or_else(|| CHANNEL_ID_PARAM_RE.captures(html))
        .map(|c| c[1].to_string())
}

async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
) -> Result<feed_rs::model::Feed, FetchError> {
    let bytes = fetch_bytes(client, url).await?;
    feed_rs::parser::parse(bytes.as_slice()).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Fetches a URL with a 30-second timeout, exponential backoff on 429 and
/// 5xx responses, and a streamed size cap on the body.
async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let mut retry_count = 0;

    loop {
        let response = tokio::time::timeout(FETCH_TIMEOUT, client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if retry_count >= MAX_RETRIES {
                return Err(FetchError::RateLimited(MAX_RETRIES));
            }

            let delay_secs = 2u64.pow(retry_count);
            tracing::warn!(url = %url, retry = retry_count, delay_secs, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            retry_count += 1;
            continue;
        }

        if response.status().is_server_error() {
            if retry_count >= MAX_RETRIES {
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            let delay_secs = 2u64.pow(retry_count);
            tracing::warn!(
                url = %url,
                status = %response.status(),
                retry = retry_count,
                delay_secs,
                "Server error, retrying after delay"
            );
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            retry_count += 1;
            continue;
        }

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        return read_limited_bytes(response, MAX_FEED_SIZE).await;
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
