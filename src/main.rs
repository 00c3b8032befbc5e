use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use feedmux::config::Config;
use feedmux::feed::{aggregate, build_document, collect_all};
use feedmux::mrss;

const USER_AGENT: &str = concat!("feedmux/", env!("CARGO_PKG_VERSION"));

#[derive(Parser, Debug)]
#[command(
    name = "feedmux",
    about = "Combines YouTube channel feeds and standard RSS feeds into a single Media RSS document"
)]
struct Args {
    /// Config file path (default: ~/.config/feedmux/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the document to FILE instead of standard output
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

/// Get the default config file path (~/.config/feedmux/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedmux")
        .join("config.toml"))
}

/// Write the document using the write-to-temp-then-rename pattern so the
/// destination is never left in a partial state. Downstream feed readers may
/// poll the file at any moment.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{suffix:016x}"));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temporary file '{}'", temp_path.display()))?;

    file.write_all(content.as_bytes()).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!("Failed to write '{}'", temp_path.display())
    })?;
    file.write_all(b"\n").with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!("Failed to write '{}'", temp_path.display())
    })?;

    file.sync_all().with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!("Failed to sync '{}' to disk", temp_path.display())
    })?;

    drop(file);

    std::fs::rename(&temp_path, path).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to rename '{}' to '{}'",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries only the document
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    let now = Utc::now();
    let results = collect_all(&client, &config, now).await;

    let mut per_source = Vec::with_capacity(results.len());
    for result in results {
        match result.entries {
            Ok(entries) => {
                tracing::debug!(source = %result.name, entries = entries.len(), "Source fetched");
                per_source.push(entries);
            }
            Err(e) => {
                tracing::warn!(source = %result.name, error = %e, "Source failed, contributing no entries");
                per_source.push(Vec::new());
            }
        }
    }

    let entries = aggregate(per_source, config.total_cap);
    let document = build_document(&config, entries, now);
    let xml = mrss::render(&document)?;

    match args.output {
        Some(path) => write_atomic(&path, &xml)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(xml.as_bytes())
                .and_then(|_| stdout.write_all(b"\n"))
                .context("Failed to write document to stdout")?;
        }
    }

    Ok(())
}
