use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tubechat_llm::{Author, VideoInfo};

const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";
const TIMEDTEXT_ENDPOINT: &str = "https://www.youtube.com/api/timedtext";
const WATCH_ENDPOINT: &str = "https://www.youtube.com/watch";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("YouTube API key is missing")]
    MissingApiKey,

    #[error("no video found for id {0}")]
    NotFound(String),

    #[error("no transcript available for video {0}")]
    NoTranscript(String),

    #[error("HTTP error! Status: {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Where video metadata and transcripts come from
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo, SourceError>;

    /// Full transcript as one space-separated string
    async fn transcript(&self, video_id: &str) -> Result<String, SourceError>;
}

/// YouTube Data API v3 for metadata, timed-text endpoint for captions
pub struct YouTubeSource {
    http: reqwest::Client,
    api_key: Option<String>,
    transcript_lang: String,
}

impl YouTubeSource {
    pub fn new(api_key: Option<String>, transcript_lang: impl Into<String>) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_key,
            transcript_lang: transcript_lang.into(),
        })
    }
}

#[async_trait]
impl VideoSource for YouTubeSource {
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo, SourceError> {
        let api_key = self.api_key.as_deref().ok_or(SourceError::MissingApiKey)?;

        debug!("Fetching video info for {}", video_id);
        let response = self
            .http
            .get(VIDEOS_ENDPOINT)
            .query(&[("id", video_id), ("key", api_key), ("part", "snippet,statistics")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: VideosResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        body.items
            .into_iter()
            .next()
            .map(VideoItem::into_info)
            .ok_or_else(|| SourceError::NotFound(video_id.to_string()))
    }

    async fn transcript(&self, video_id: &str) -> Result<String, SourceError> {
        debug!("Fetching transcript for {} ({})", video_id, self.transcript_lang);

        let tracks = match self.fetch_text(WATCH_ENDPOINT, &[("v", video_id)]).await {
            Ok(page) => caption_tracks(&page),
            Err(e) => {
                debug!("Watch page for {} unavailable: {}", video_id, e);
                Vec::new()
            }
        };
        if let Some(track) = pick_track(&tracks, &self.transcript_lang) {
            debug!(
                "Using {} caption track for {} ({})",
                if track.is_generated() { "generated" } else { "manual" },
                video_id,
                track.language_code
            );
            let body = self.fetch_text(&track.base_url, &[("fmt", "json3")]).await?;
            let transcript = join_json3(&body)?;
            if !transcript.is_empty() {
                return Ok(transcript);
            }
        }

        // Manual captions first, then the auto-generated ones.
        for kind in [None, Some("asr")] {
            let mut query = vec![
                ("v", video_id),
                ("lang", self.transcript_lang.as_str()),
                ("fmt", "json3"),
            ];
            query.extend(kind.map(|kind| ("kind", kind)));

            let body = self.fetch_text(TIMEDTEXT_ENDPOINT, &query).await?;
            let transcript = join_json3(&body)?;
            if !transcript.is_empty() {
                return Ok(transcript);
            }
        }

        Err(SourceError::NoTranscript(video_id.to_string()))
    }
}

impl YouTubeSource {
    async fn fetch_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, SourceError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT_LANGUAGE, self.transcript_lang.as_str())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// One entry of the player's `captionTracks` list
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptionTrack {
    pub base_url: String,
    #[serde(default)]
    pub language_code: String,
    /// `"asr"` for auto-generated captions
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Caption tracks embedded in a watch page, empty when there are none
pub(crate) fn caption_tracks(page: &str) -> Vec<CaptionTrack> {
    const MARKER: &str = "\"captionTracks\":";
    let Some(start) = page.find(MARKER) else {
        return Vec::new();
    };

    serde_json::Deserializer::from_str(&page[start + MARKER.len()..])
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .and_then(Result::ok)
        .unwrap_or_default()
}

/// Manual track in `lang`, else a generated one in `lang`, else the first track
pub(crate) fn pick_track<'a>(tracks: &'a [CaptionTrack], lang: &str) -> Option<&'a CaptionTrack> {
    let in_lang = |generated: bool| {
        tracks
            .iter()
            .find(|t| t.language_code == lang && t.is_generated() == generated)
    };
    in_lang(false).or_else(|| in_lang(true)).or_else(|| tracks.first())
}

/// Flatten a `json3` caption document into one line of text.
/// An empty body means the video has no captions in that language.
pub(crate) fn join_json3(body: &str) -> Result<String, SourceError> {
    if body.trim().is_empty() {
        return Ok(String::new());
    }

    let doc: CaptionDocument =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;

    let lines: Vec<String> = doc
        .events
        .iter()
        .map(|event| {
            event
                .segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>()
                .replace('\n', " ")
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();

    Ok(lines.join(" "))
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    channel_title: String,
    channel_id: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best_url(&self) -> String {
        self.high
            .as_ref()
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    comment_count: Option<String>,
}

impl VideoItem {
    fn into_info(self) -> VideoInfo {
        let thumbnail = self.snippet.thumbnails.best_url();
        let author = Author {
            name: self.snippet.channel_title,
            channel_id: self.snippet.channel_id,
            thumbnail: thumbnail.clone(),
        };
        VideoInfo {
            url: format!("https://www.youtube.com/watch?v={}", self.id),
            id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            author,
            author_thumbnail: thumbnail.clone(),
            thumbnail,
            comment_count: self
                .statistics
                .and_then(|s| s.comment_count)
                .and_then(|count| count.parse().ok()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CaptionDocument {
    #[serde(default)]
    events: Vec<CaptionEvent>,
}

#[derive(Debug, Deserialize)]
struct CaptionEvent {
    #[serde(default)]
    segs: Vec<CaptionSegment>,
}

#[derive(Debug, Deserialize)]
struct CaptionSegment {
    #[serde(default)]
    utf8: String,
}
