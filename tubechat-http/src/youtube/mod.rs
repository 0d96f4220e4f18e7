//! Video metadata and transcript retrieval.

mod source;
mod link;

pub use self::source::{SourceError, VideoSource, YouTubeSource};
pub use self::link::video_id_from_url;
