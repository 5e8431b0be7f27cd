//! YouTube watch-page resolver
//!
//! Fetches `https://www.youtube.com/watch?v=<id>` and scrapes the title and
//! view count out of the returned HTML. View count extraction tries several
//! strategies in order and falls back to 0; the title is required.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use songboard_common::song::{thumbnail_url, watch_url};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ResolverError, VideoMetadata, VideoMetadataResolver};

/// Maximum response body size (2MB)
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; songboard/0.1)";

static VIEW_COUNT_PLAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""viewCount"\s*:\s*"(\d+)""#).expect("valid regex"));

static VIEW_COUNT_SIMPLE_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""viewCount"\s*:\s*\{.*?"simpleText"\s*:\s*"([\d,.]+)"#).expect("valid regex")
});

/// Production resolver backed by an HTTP client
pub struct YouTubeResolver {
    client: reqwest::Client,
}

impl YouTubeResolver {
    pub fn new(timeout: Duration) -> Result<Self, ResolverError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ResolverError::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn fetch_page(&self, video_id: &str) -> Result<String, ResolverError> {
        let url = watch_url(video_id);
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| ResolverError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::Fetch(format!("HTTP {}", status.as_u16())));
        }

        if response.content_length().map_or(false, |len| len as usize > MAX_BODY_SIZE) {
            return Err(ResolverError::Fetch("Response too large".to_string()));
        }

        read_capped(response, MAX_BODY_SIZE).await
    }
}

/// Read a response body chunk by chunk, giving up once it exceeds `limit`
///
/// Content-Length is optional (chunked transfer), so the cap is enforced
/// while reading rather than after buffering.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<String, ResolverError> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ResolverError::Fetch(format!("Failed to read response: {}", e)))?
    {
        if body.len() + chunk.len() > limit {
            return Err(ResolverError::Fetch("Response too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[async_trait]
impl VideoMetadataResolver for YouTubeResolver {
    async fn resolve(&self, url: &str) -> Result<VideoMetadata, ResolverError> {
        let video_id = extract_video_id(url).ok_or(ResolverError::InvalidUrl)?;
        let html = self.fetch_page(&video_id).await?;
        parse_video_page(&video_id, &html)
    }
}

/// Extract the video id from a watch, short-link or embed URL
///
/// A missing scheme is tolerated (`youtube.com/watch?v=...`).
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let parsed = if input.contains("://") {
        url::Url::parse(input).ok()?
    } else {
        url::Url::parse(&format!("https://{}", input)).ok()?
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?.to_ascii_lowercase();
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    let candidate = match host.as_str() {
        "youtu.be" | "www.youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "www.youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;

    is_valid_video_id(&candidate).then_some(candidate)
}

fn is_valid_video_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Build metadata from a fetched watch page
pub fn parse_video_page(video_id: &str, html: &str) -> Result<VideoMetadata, ResolverError> {
    let document = Html::parse_document(html);

    let title = extract_title(&document)
        .ok_or_else(|| ResolverError::Parse(format!("no title on page for {}", video_id)))?;

    let views = extract_view_count(html, &document).unwrap_or_else(|| {
        warn!("No view count found for {}, storing 0", video_id);
        0
    });

    Ok(VideoMetadata {
        video_id: video_id.to_string(),
        title,
        views,
        thumbnail: thumbnail_url(video_id),
    })
}

fn extract_title(document: &Html) -> Option<String> {
    let from_title_tag = Selector::parse("title")
        .ok()
        .and_then(|s| document.select(&s).next().map(|el| el.text().collect::<String>()))
        .map(|t| {
            let t = t.trim();
            t.strip_suffix("- YouTube").map(str::trim_end).unwrap_or(t).to_string()
        });

    from_title_tag
        .filter(|t| is_usable_title(t))
        .or_else(|| meta_content(document, "meta[property='og:title']"))
        .or_else(|| meta_content(document, "meta[name='title']"))
}

/// A bare "YouTube" title is what unavailable videos render
fn is_usable_title(title: &str) -> bool {
    !title.is_empty() && title != "YouTube"
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| is_usable_title(c))
}

fn extract_view_count(html: &str, document: &Html) -> Option<u64> {
    if let Some(caps) = VIEW_COUNT_PLAIN.captures(html) {
        if let Ok(views) = caps[1].parse::<u64>() {
            return Some(views);
        }
    }

    if let Some(caps) = VIEW_COUNT_SIMPLE_TEXT.captures(html) {
        let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(views) = digits.parse::<u64>() {
            return Some(views);
        }
    }

    Selector::parse("meta[itemprop='interactionCount']")
        .ok()
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("content"))
        .and_then(|c| c.trim().parse::<u64>().ok())
}
