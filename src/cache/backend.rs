//! Storage backend capability
//!
//! A backend stores buffers of one shape (`NativeValue`, `String` or `Vec<u8>`)
//! for one tier. The service never sees backend internals; it only picks a
//! `BackendHandle` and forwards calls.

use crate::cache::config::CacheExpiration;
use crate::cache::types::{BufferKind, CacheTier, NativeValue};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Storage backend for buffers of type `B`
#[async_trait]
pub trait CacheBackend<B>: Send + Sync
where
    B: Send + Sync + 'static,
{
    /// Tier this backend serves
    fn tier(&self) -> CacheTier;

    /// Fetch a buffer, `None` when absent
    async fn get(&self, key: &str, cancel: &CancellationToken) -> Result<Option<B>>;

    /// Store a buffer, replacing any previous value
    async fn set(
        &self,
        key: &str,
        value: B,
        expiration: &CacheExpiration,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Remove a single entry
    async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<()>;

    /// Remove every entry whose key starts with `prefix`
    async fn remove_by_prefix(&self, prefix: &str, cancel: &CancellationToken) -> Result<()>;

    /// Remove every entry carrying at least one of `tags`
    async fn remove_by_tags(&self, tags: &[String], cancel: &CancellationToken) -> Result<()>;

    /// Remove every entry
    async fn clear(&self, cancel: &CancellationToken) -> Result<()>;

    /// Whether a live entry exists for `key`
    async fn exists(&self, key: &str, cancel: &CancellationToken) -> Result<bool>;

    /// Keys matching `pattern` (all keys when `None`)
    async fn list_keys(
        &self,
        pattern: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>>;
}

/// A registered backend, tagged by the buffer kind it stores
#[derive(Clone)]
pub enum BackendHandle {
    Native(Arc<dyn CacheBackend<NativeValue>>),
    Text(Arc<dyn CacheBackend<String>>),
    Binary(Arc<dyn CacheBackend<Vec<u8>>>),
}

/// Forward a call to whichever backend the handle wraps
macro_rules! dispatch {
    ($handle:expr, $backend:ident => $call:expr) => {
        match $handle {
            BackendHandle::Native($backend) => $call,
            BackendHandle::Text($backend) => $call,
            BackendHandle::Binary($backend) => $call,
        }
    };
}

impl BackendHandle {
    pub fn native(backend: impl CacheBackend<NativeValue> + 'static) -> Self {
        BackendHandle::Native(Arc::new(backend))
    }

    pub fn text(backend: impl CacheBackend<String> + 'static) -> Self {
        BackendHandle::Text(Arc::new(backend))
    }

    pub fn binary(backend: impl CacheBackend<Vec<u8>> + 'static) -> Self {
        BackendHandle::Binary(Arc::new(backend))
    }

    /// Buffer kind stored by the wrapped backend
    pub fn kind(&self) -> BufferKind {
        match self {
            BackendHandle::Native(_) => BufferKind::Native,
            BackendHandle::Text(_) => BufferKind::Text,
            BackendHandle::Binary(_) => BufferKind::Binary,
        }
    }

    /// Tier declared by the wrapped backend
    pub fn tier(&self) -> CacheTier {
        dispatch!(self, b => b.tier())
    }

    pub async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        dispatch!(self, b => b.remove(key, cancel).await)
    }

    pub async fn remove_by_prefix(&self, prefix: &str, cancel: &CancellationToken) -> Result<()> {
        dispatch!(self, b => b.remove_by_prefix(prefix, cancel).await)
    }

    pub async fn remove_by_tags(&self, tags: &[String], cancel: &CancellationToken) -> Result<()> {
        dispatch!(self, b => b.remove_by_tags(tags, cancel).await)
    }

    pub async fn clear(&self, cancel: &CancellationToken) -> Result<()> {
        dispatch!(self, b => b.clear(cancel).await)
    }

    pub async fn exists(&self, key: &str, cancel: &CancellationToken) -> Result<bool> {
        dispatch!(self, b => b.exists(key, cancel).await)
    }

    pub async fn list_keys(
        &self,
        pattern: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        dispatch!(self, b => b.list_keys(pattern, cancel).await)
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("kind", &self.kind())
            .field("tier", &self.tier())
            .finish()
    }
}
