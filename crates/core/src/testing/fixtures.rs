//! Shared test fixtures.

use crate::distillation::{FileSource, SourceDescriptor, SourceKind};

/// A plain web page source.
pub fn web_page(url: &str) -> SourceDescriptor {
    SourceDescriptor::url(url, SourceKind::WebPage)
}

/// A YouTube video source.
pub fn youtube_video(video_id: &str) -> SourceDescriptor {
    SourceDescriptor::url(
        format!("https://www.youtube.com/watch?v={}", video_id),
        SourceKind::YoutubeVideo,
    )
}

/// A YouTube playlist source.
pub fn youtube_playlist(playlist_id: &str) -> SourceDescriptor {
    SourceDescriptor::url(
        format!("https://www.youtube.com/playlist?list={}", playlist_id),
        SourceKind::YoutubePlaylist,
    )
}

/// A text file source without a backing file on disk.
pub fn text_file(name: &str) -> SourceDescriptor {
    SourceDescriptor::file(FileSource {
        name: name.to_string(),
        media_type: "text/plain".to_string(),
        size_bytes: 64,
        path: None,
    })
}
