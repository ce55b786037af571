//! Cache entry management with expiration support

use crate::cache::config::CacheExpiration;
use crate::cache::types::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A stored buffer with its metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<B> {
    /// The cache key
    pub key: CacheKey,

    /// The cached buffer
    pub value: B,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

impl<B> CacheEntry<B> {
    /// Create a new entry, computing its deadline from `expiration`
    pub fn new(key: CacheKey, value: B, expiration: &CacheExpiration, tags: &[String]) -> Self {
        let now = Utc::now();

        let mut metadata = CacheMetadata {
            created_at: now,
            accessed_at: now,
            expires_at: expiration.deadline_from(now),
            sliding: expiration.sliding,
            access_count: 0,
            tags: Vec::new(),
        };
        for tag in tags {
            metadata.add_tag(tag.clone());
        }

        Self {
            key,
            value,
            metadata,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.metadata.is_expired_at(Utc::now())
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self) {
        self.metadata.accessed_at = Utc::now();
        self.metadata.access_count += 1;
    }

    /// Check if entry carries a specific tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.iter().any(|t| t == tag)
    }

    /// Check if entry carries at least one of `tags`
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.has_tag(tag))
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.metadata.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// Last read time, drives sliding expiration
    pub accessed_at: DateTime<Utc>,

    /// Absolute deadline, if any
    pub expires_at: Option<DateTime<Utc>>,

    /// Sliding window, if any
    pub sliding: Option<Duration>,

    /// Number of times this entry has been read
    pub access_count: u64,

    /// Tags for group invalidation
    pub tags: Vec<String>,
}

impl CacheMetadata {
    /// Whether any configured expiration condition holds at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(deadline) = self.expires_at {
            if now >= deadline {
                return true;
            }
        }

        match self.sliding {
            Some(window) => {
                let idle = (now - self.accessed_at).to_std().unwrap_or(Duration::ZERO);
                idle >= window
            }
            None => false,
        }
    }

    fn add_tag(&mut self, tag: String) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }
}
