//! Content extraction: turns a URL or file into raw text plus metadata.

mod classify;
mod http;
mod types;

pub use classify::{classify_url, is_youtube_url, youtube_playlist_id, youtube_video_id};
pub use http::HttpExtractor;
pub use types::{ExtractError, ExtractedContent, Extractor};
