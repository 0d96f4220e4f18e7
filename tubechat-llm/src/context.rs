use serde::{Deserialize, Serialize};

/// Channel that published a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    #[serde(rename = "author_thumbnail")]
    pub thumbnail: String,
}

impl Author {
    pub fn channel_url(&self) -> String {
        format!("https://www.youtube.com/channel/{}", self.channel_id)
    }
}

/// Video metadata as returned to clients when a chat starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub author: Author,
    pub thumbnail: String,
    pub author_thumbnail: String,
    #[serde(rename = "commentCount")]
    pub comment_count: Option<u64>,
}

/// Everything a chat session knows about its video. Immutable once the
/// session exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoContext {
    pub info: VideoInfo,
    pub transcript: String,
}

impl VideoContext {
    pub fn new(info: VideoInfo, transcript: impl Into<String>) -> Self {
        Self {
            info,
            transcript: transcript.into(),
        }
    }

    /// Attribution block naming the channel behind the video
    pub fn attribution(&self) -> String {
        let author = &self.info.author;
        format!(
            "Author: {}\nchannel id: {}\nchannel url: {}",
            author.name,
            author.channel_id,
            author.channel_url()
        )
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_context;

    #[test]
    fn attribution_names_channel() {
        let text = sample_context().attribution();
        assert!(text.starts_with("Author: Rust Channel"));
        assert!(text.contains("https://www.youtube.com/channel/UC123"));
    }

    #[test]
    fn info_serializes_with_client_field_names() {
        let json = serde_json::to_value(&sample_context().info).unwrap();
        assert_eq!(json["commentCount"], 42);
        assert_eq!(json["author"]["channelId"], "UC123");
        assert_eq!(json["author"]["author_thumbnail"], "https://img/author.jpg");
    }
}
