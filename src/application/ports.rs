//! Traits describing the platform collaborators the worker talks to.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore, CachedResponse, StoreInfo};
use crate::domain::{FetchRequest, FetchResponse};

/// A fetch that rejected: the request never produced an HTTP response.
///
/// An HTTP error status is not a rejection; it resolves to a
/// [`FetchResponse`] like any other.
#[derive(Debug, Clone, Error)]
#[error("network request to {url} failed: {message}")]
pub struct NetworkError {
    pub url: String,
    pub message: String,
}

impl NetworkError {
    pub fn new(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError>;
}

/// Named cache stores shared by every worker generation.
#[async_trait]
pub trait Caches: Send + Sync {
    /// Open the named store, creating it when absent.
    async fn open(&self, name: &str) -> Result<Arc<CacheStore>, CacheError>;

    /// Store names in creation order.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a whole store; `Ok(false)` when it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, CacheError>;

    /// First response cached under `key` in any store.
    async fn match_request(&self, key: &str) -> Result<Option<CachedResponse>, CacheError>;

    async fn describe(&self) -> Result<Vec<StoreInfo>, CacheError>;
}
