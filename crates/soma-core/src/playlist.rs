//! Resolve `.pls` / `.m3u` playlist links to a playable stream URL.
//!
//! HLS (`.m3u8`) is left alone: the player handles it directly and it carries
//! no ICY metadata anyway.
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::MetadataError;

pub fn is_playlist_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    path.ends_with(".pls") || path.ends_with(".m3u")
}

fn is_pls(url: &str) -> bool {
    url.split(['?', '#'])
        .next()
        .unwrap_or(url)
        .to_ascii_lowercase()
        .ends_with(".pls")
}

/// First `File=` / `FileN=` entry of a PLS body.
pub fn parse_pls(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let (key, value) = line.trim().split_once('=')?;
        let key = key.trim().to_ascii_lowercase();
        let index = key.strip_prefix("file")?;
        if !index.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(value.trim().to_string()).filter(|v| !v.is_empty())
    })
}

/// First non-comment line of an M3U body.
pub fn parse_m3u(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
}

pub fn resolve_relative_url(base: &str, candidate: &str) -> Result<String, MetadataError> {
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Ok(candidate.to_string());
    }
    let base_url = Url::parse(base).map_err(|e| MetadataError::InvalidUrl(format!("{}: {}", base, e)))?;
    base_url
        .join(candidate)
        .map(|u| u.to_string())
        .map_err(|e| MetadataError::InvalidUrl(format!("{}: {}", candidate, e)))
}

/// Return the direct stream behind `url`, fetching it first if it is a playlist.
pub async fn resolve_stream_url(client: &Client, url: &str) -> Result<String, MetadataError> {
    if !is_playlist_url(url) {
        return Ok(url.to_string());
    }

    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(MetadataError::Status(status));
    }
    let body = resp.text().await?;

    let target = if is_pls(url) {
        parse_pls(&body)
    } else {
        parse_m3u(&body)
    }
    .ok_or(MetadataError::EmptyPlaylist)?;

    let resolved = resolve_relative_url(url, &target)?;
    debug!("[playlist] {} -> {}", url, resolved);
    Ok(resolved)
}
