use std::time::Duration;

use serde_json::Value;

use crate::error::{KursError, Result};
use crate::format::format_timestamp;
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::types::{PlaylistDetails, VideoMetadata};

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const ENV_VAR: &str = "YOUTUBE_API_KEY";

/// Data API v3 client for the lookups the pipeline needs: search, video
/// details, and playlist details. 429/5xx responses go through the shared
/// retry policy.
pub struct YoutubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_VAR).map_err(|_| KursError::MissingApiKey {
            env_var: ENV_VAR.to_string(),
        })?;
        Ok(Self::new(api_key))
    }

    fn retry_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
        }
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        retry_with_backoff(
            &Self::retry_policy(),
            path,
            async || {
                let response = self
                    .http
                    .get(format!("{}/{}", self.base_url, path))
                    .query(&[("key", self.api_key.as_str())])
                    .query(params)
                    .send()
                    .await?;

                let status = response.status().as_u16();
                if !(200..300).contains(&status) {
                    let mut body = response.text().await.unwrap_or_default();
                    if status == 403 && body.contains("quota") {
                        return Err(KursError::RateLimited {
                            operation: format!("youtube:{path}"),
                        });
                    }
                    body.truncate(512);
                    return Err(KursError::UpstreamStatus { status, body });
                }
                Ok(response.json().await?)
            },
            |_, _| {},
        )
        .await
    }

    /// Search for videos and enrich the hits with duration and statistics.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<VideoMetadata>> {
        let max = max_results.to_string();
        let value = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("q", query),
                    ("maxResults", max.as_str()),
                ],
            )
            .await?;

        let ids: Vec<&str> = value["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["id"]["videoId"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.videos_by_ids(&ids).await
    }

    pub async fn video_details(&self, video_id: &str) -> Result<VideoMetadata> {
        let mut videos = self.videos_by_ids(&[video_id]).await?;
        videos.pop().ok_or_else(|| KursError::InvalidVideoId {
            input: video_id.to_string(),
        })
    }

    pub async fn playlist_details(&self, playlist_id: &str) -> Result<PlaylistDetails> {
        let playlists = self
            .get_json("playlists", &[("part", "snippet"), ("id", playlist_id)])
            .await?;
        let title = playlists["items"][0]["snippet"]["title"]
            .as_str()
            .unwrap_or("Untitled playlist")
            .to_string();

        let items = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "snippet,contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", "50"),
                ],
            )
            .await?;

        let ids: Vec<&str> = items["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["contentDetails"]["videoId"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        let videos = if ids.is_empty() {
            Vec::new()
        } else {
            self.videos_by_ids(&ids).await?
        };

        Ok(PlaylistDetails {
            playlist_id: playlist_id.to_string(),
            title,
            videos,
        })
    }

    async fn videos_by_ids(&self, ids: &[&str]) -> Result<Vec<VideoMetadata>> {
        let joined = ids.join(",");
        let value = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,contentDetails,statistics"),
                    ("id", joined.as_str()),
                ],
            )
            .await?;

        Ok(value["items"]
            .as_array()
            .map(|items| items.iter().map(parse_video_item).collect())
            .unwrap_or_default())
    }
}

fn parse_video_item(item: &Value) -> VideoMetadata {
    let snippet = &item["snippet"];
    let thumbnail = ["maxres", "high", "medium", "default"]
        .iter()
        .find_map(|size| snippet["thumbnails"][*size]["url"].as_str())
        .map(str::to_string);

    VideoMetadata {
        video_id: item["id"].as_str().unwrap_or_default().to_string(),
        title: snippet["title"].as_str().unwrap_or_default().to_string(),
        description: snippet["description"].as_str().unwrap_or_default().to_string(),
        channel_name: snippet["channelTitle"].as_str().unwrap_or_default().to_string(),
        thumbnail,
        duration: format_iso8601_duration(
            item["contentDetails"]["duration"].as_str().unwrap_or_default(),
        ),
        view_count: item["statistics"]["viewCount"]
            .as_str()
            .and_then(|v| v.parse().ok()),
        published_at: snippet["publishedAt"].as_str().map(str::to_string),
    }
}

/// Convert an ISO-8601 `PT#H#M#S` duration into display form.
pub fn format_iso8601_duration(raw: &str) -> String {
    let Some(rest) = raw.strip_prefix("PT") else {
        return "0:00".to_string();
    };

    let mut seconds = 0u64;
    let mut digits = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u64 = digits.parse().unwrap_or(0);
        digits.clear();
        match c {
            'H' => seconds += value * 3600,
            'M' => seconds += value * 60,
            'S' => seconds += value,
            _ => return "0:00".to_string(),
        }
    }

    format_timestamp(seconds as f64)
}

fn is_video_id(s: &str) -> bool {
    s.len() == 11
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let marker = format!("{key}=");
    for part in url.split(['?', '&', '#']) {
        if let Some(value) = part.strip_prefix(&marker) {
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// Extract a video id from a watch/short/embed URL or a bare id.
pub fn parse_video_id(input: &str) -> Result<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let candidate = query_param(input, "v").or_else(|| {
        ["youtu.be/", "/embed/", "/shorts/", "/v/"]
            .iter()
            .find_map(|marker| input.split(marker).nth(1))
            .map(|rest| rest.split(['?', '&', '#', '/']).next().unwrap_or(""))
    });

    match candidate {
        Some(id) if is_video_id(id) => Ok(id.to_string()),
        _ => Err(KursError::InvalidVideoId {
            input: input.to_string(),
        }),
    }
}

/// Extract a playlist id from a URL, when one is present.
pub fn parse_playlist_id(input: &str) -> Option<String> {
    query_param(input.trim(), "list").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso8601_durations_format_as_display_timestamps() {
        assert_eq!(format_iso8601_duration("PT1H2M3S"), "1:02:03");
        assert_eq!(format_iso8601_duration("PT15M"), "15:00");
        assert_eq!(format_iso8601_duration("PT45S"), "0:45");
        assert_eq!(format_iso8601_duration("PT2H"), "2:00:00");
        assert_eq!(format_iso8601_duration(""), "0:00");
        assert_eq!(format_iso8601_duration("garbage"), "0:00");
    }

    #[test]
    fn video_ids_parse_from_common_url_shapes() {
        for input in [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?list=PL123&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=42",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(parse_video_id(input).unwrap(), "dQw4w9WgXcQ", "{input}");
        }
    }

    #[test]
    fn invalid_video_input_is_rejected() {
        for input in ["", "not a url", "https://example.com/watch?v=short"] {
            assert!(parse_video_id(input).is_err(), "{input}");
        }
    }

    #[test]
    fn playlist_ids_parse_from_urls() {
        assert_eq!(
            parse_playlist_id("https://www.youtube.com/playlist?list=PLabc123").as_deref(),
            Some("PLabc123")
        );
        assert_eq!(parse_playlist_id("https://youtu.be/dQw4w9WgXcQ"), None);
    }

    #[test]
    fn video_items_parse_into_metadata() {
        let item = serde_json::json!({
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "title": "A Video",
                "description": "About things",
                "channelTitle": "A Channel",
                "publishedAt": "2024-01-01T00:00:00Z",
                "thumbnails": { "high": { "url": "https://example.com/hq.jpg" } }
            },
            "contentDetails": { "duration": "PT10M30S" },
            "statistics": { "viewCount": "12345" }
        });

        let meta = parse_video_item(&item);
        assert_eq!(meta.video_id, "dQw4w9WgXcQ");
        assert_eq!(meta.duration, "10:30");
        assert_eq!(meta.view_count, Some(12_345));
        assert_eq!(meta.thumbnail.as_deref(), Some("https://example.com/hq.jpg"));
    }
}
