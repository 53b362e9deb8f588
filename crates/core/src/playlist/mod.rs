//! Playlist resolution: turns a playlist URL into its member item URLs.

mod feed;

pub use feed::FeedResolver;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for playlist resolution.
///
/// The kinds matter: a private playlist and an empty one both stop the
/// expansion, but the user should be told which it was.
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The playlist exists but is not publicly visible.
    #[error("playlist is private: {0}")]
    Private(String),

    /// No playlist with that id.
    #[error("playlist not found: {0}")]
    NotFound(String),

    /// The playlist resolved but contains no items.
    #[error("playlist is empty: {0}")]
    Empty(String),

    /// Anything else.
    #[error("playlist resolution failed: {0}")]
    Generic(String),
}

/// Trait for playlist resolution backends.
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Resolve a playlist URL into an ordered, de-duplicated list of member
    /// item URLs.
    async fn resolve(&self, url: &str) -> Result<Vec<String>, PlaylistError>;
}
