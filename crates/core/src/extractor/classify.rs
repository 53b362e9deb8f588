//! URL classification helpers.
//!
//! Detection is intentionally conservative: anything that is not recognizably
//! YouTube is treated as a plain web page.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::distillation::SourceKind;

static YOUTUBE_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(www\.|m\.)?(youtube\.com|youtu\.be)(/|$)").unwrap());

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?[^#]*\bv=|youtu\.be/|youtube\.com/shorts/)([A-Za-z0-9_-]{6,})")
        .unwrap()
});

static PLAYLIST_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]list=([A-Za-z0-9_-]+)").unwrap());

static CHANNEL_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/(channel/[A-Za-z0-9_-]+|@[\w.-]+|c/[\w.-]+|user/[\w.-]+)").unwrap()
});

/// Returns true if the URL points at YouTube.
pub fn is_youtube_url(url: &str) -> bool {
    YOUTUBE_HOST.is_match(url)
}

/// Extract the video id from a YouTube video URL.
pub fn youtube_video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the playlist id from a YouTube playlist URL.
pub fn youtube_playlist_id(url: &str) -> Option<String> {
    PLAYLIST_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Detect the source kind of a URL.
///
/// A watch URL carrying a `list=` parameter counts as a playlist submission:
/// the user asked for the whole list, not the single video.
pub fn classify_url(url: &str) -> SourceKind {
    if !is_youtube_url(url) {
        return SourceKind::WebPage;
    }
    if youtube_playlist_id(url).is_some() {
        return SourceKind::YoutubePlaylist;
    }
    if youtube_video_id(url).is_some() {
        return SourceKind::YoutubeVideo;
    }
    if CHANNEL_PATH.is_match(url) {
        return SourceKind::YoutubeChannel;
    }
    SourceKind::WebPage
}
