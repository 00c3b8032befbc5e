//! Configuration file parser for ~/.config/feedmux/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`,
//! which produces a valid (empty) feed. Unknown top-level keys are accepted
//! but logged as a warning to catch typos.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::feed::ContentKind;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("YouTube channel '{0}' needs a channel_id or a handle")]
    UnresolvableChannel(String),
}

// ============================================================================
// Source Descriptors
// ============================================================================

/// A YouTube channel source. Either `channel_id` or `handle` must be given;
/// a handle is resolved to a channel id at fetch time.
#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeChannel {
    /// Display name used for the category element and author fallback.
    pub name: String,
    pub channel_id: Option<String>,
    /// Channel @handle without the leading '@'.
    pub handle: Option<String>,
}

/// A standard RSS/Atom feed source (articles, podcasts, or hosted video).
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_content_kind")]
    pub content_kind: ContentKind,
}

fn default_content_kind() -> ContentKind {
    ContentKind::Article
}

/// One configured source, in configuration order. The order matters: the
/// aggregator's tie-break for equal publish times follows it.
#[derive(Debug, Clone)]
pub enum Source {
    YouTube(YouTubeChannel),
    Feed(FeedSource),
}

impl Source {
    pub fn name(&self) -> &str {
        match self {
            Source::YouTube(c) => &c.name,
            Source::Feed(f) => &f.name,
        }
    }
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Channel title of the generated feed.
    pub title: String,

    /// Channel link of the generated feed.
    pub link: String,

    /// Channel description of the generated feed.
    pub description: String,

    /// Public URL where the generated document is served, used for the
    /// channel's Atom self-link. No self-link is emitted when unset.
    pub self_url: Option<String>,

    /// Channel image URL. No image block is emitted when unset.
    pub image_url: Option<String>,

    /// Generator string advertised in the channel.
    pub generator: String,

    /// How many recent entries to keep per source.
    pub per_source_cap: usize,

    /// Total entries in the combined feed.
    pub total_cap: usize,

    /// YouTube channel sources, fetched before the generic feeds.
    pub youtube_channels: Vec<YouTubeChannel>,

    /// Generic RSS/Atom feed sources.
    pub feeds: Vec<FeedSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Combined Feed".to_string(),
            link: String::new(),
            description: String::new(),
            self_url: None,
            image_url: None,
            generator: concat!("feedmux ", env!("CARGO_PKG_VERSION")).to_string(),
            per_source_cap: 25,
            total_cap: 50,
            youtube_channels: Vec::new(),
            feeds: Vec::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB). Config files are small; anything
    /// larger is a corrupted or wrong file.
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown top-level keys → accepted, logged as a warning
    /// - YouTube channel without `channel_id` or `handle` →
    ///   `Err(ConfigError::UnresolvableChannel)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "No config file found, emitting an empty feed");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::warn!(path = %path.display(), "Config file disappeared, emitting an empty feed");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to flag probable typos
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "title",
                "link",
                "description",
                "self_url",
                "image_url",
                "generator",
                "per_source_cap",
                "total_cap",
                "youtube_channels",
                "feeds",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            youtube_channels = config.youtube_channels.len(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for channel in &self.youtube_channels {
            if channel.channel_id.is_none() && channel.handle.is_none() {
                return Err(ConfigError::UnresolvableChannel(channel.name.clone()));
            }
        }
        Ok(())
    }

    /// All sources in configuration order: YouTube channels first, then
    /// generic feeds. This order is the aggregator's tie-break order.
    pub fn sources(&self) -> Vec<Source> {
        self.youtube_channels
            .iter()
            .cloned()
            .map(Source::YouTube)
            .chain(self.feeds.iter().cloned().map(Source::Feed))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
