//! Mock playlist resolver for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::playlist::{PlaylistError, PlaylistResolver};

/// Mock implementation of the PlaylistResolver trait.
pub struct MockResolver {
    items: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<PlaylistError>>>,
    resolved_urls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockResolver {
    /// Create a mock resolver with no items configured.
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            resolved_urls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the item URLs returned by subsequent resolutions.
    pub async fn set_items(&self, items: Vec<String>) {
        *self.items.write().await = items;
    }

    /// Configure the next resolution to fail with the given error.
    pub async fn set_next_error(&self, error: PlaylistError) {
        *self.next_error.write().await = Some(error);
    }

    /// Playlist URLs resolved so far.
    pub async fn resolved_urls(&self) -> Vec<String> {
        self.resolved_urls.read().await.clone()
    }
}

#[async_trait]
impl PlaylistResolver for MockResolver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, url: &str) -> Result<Vec<String>, PlaylistError> {
        self.resolved_urls.write().await.push(url.to_string());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let items = self.items.read().await.clone();
        if items.is_empty() {
            return Err(PlaylistError::Empty(url.to_string()));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolution() {
        let resolver = MockResolver::new();
        resolver
            .set_items(vec!["https://www.youtube.com/watch?v=aaa111".to_string()])
            .await;

        let items = resolver.resolve("https://playlist.example").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            resolver.resolved_urls().await,
            vec!["https://playlist.example"]
        );
    }

    #[tokio::test]
    async fn test_empty_items_resolve_as_empty_error() {
        let resolver = MockResolver::new();
        let result = resolver.resolve("https://playlist.example").await;
        assert!(matches!(result, Err(PlaylistError::Empty(_))));
    }

    #[tokio::test]
    async fn test_error_injection() {
        let resolver = MockResolver::new();
        resolver
            .set_next_error(PlaylistError::Private("PL123".to_string()))
            .await;
        let result = resolver.resolve("https://playlist.example").await;
        assert!(matches!(result, Err(PlaylistError::Private(_))));
    }
}
