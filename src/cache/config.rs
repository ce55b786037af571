//! Per-operation configuration for the cache service
//!
//! `CacheEntryOptions` carries optional fields so that per-call options can be
//! layered over service defaults. The merge produces a `ResolvedOptions` value
//! once per call; nothing downstream inspects the raw options again.

use crate::cache::types::{buffer_kind_for, BufferKind, CacheTier, SerializationFormat};
use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Expiration policy for a cache entry
///
/// All three parts are optional and compose: an entry expires as soon as any
/// configured condition is met.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheExpiration {
    /// Expire after this long without being read
    pub sliding: Option<Duration>,

    /// Expire this long after being written
    pub absolute_from_now: Option<Duration>,

    /// Expire at a fixed point in time
    pub absolute_at: Option<DateTime<Utc>>,
}

impl CacheExpiration {
    /// No expiration
    pub fn none() -> Self {
        Self::default()
    }

    pub fn sliding(window: Duration) -> Self {
        Self {
            sliding: Some(window),
            ..Default::default()
        }
    }

    pub fn absolute_from_now(ttl: Duration) -> Self {
        Self {
            absolute_from_now: Some(ttl),
            ..Default::default()
        }
    }

    pub fn absolute_at(at: DateTime<Utc>) -> Self {
        Self {
            absolute_at: Some(at),
            ..Default::default()
        }
    }

    /// Add a sliding window to this policy
    pub fn with_sliding(mut self, window: Duration) -> Self {
        self.sliding = Some(window);
        self
    }

    /// Add a relative absolute expiration to this policy
    pub fn with_absolute_from_now(mut self, ttl: Duration) -> Self {
        self.absolute_from_now = Some(ttl);
        self
    }

    /// Add a fixed expiration time to this policy
    pub fn with_absolute_at(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_at = Some(at);
        self
    }

    /// True when no condition is configured
    pub fn is_none(&self) -> bool {
        self.sliding.is_none() && self.absolute_from_now.is_none() && self.absolute_at.is_none()
    }

    /// Earliest absolute deadline for an entry written at `written_at`
    pub fn deadline_from(&self, written_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // Durations past the representable range never expire
        let relative = self.absolute_from_now.and_then(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| written_at.checked_add_signed(ttl))
        });

        match (relative, self.absolute_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Validate the expiration policy
    pub fn validate(&self) -> Result<()> {
        if self.sliding == Some(Duration::ZERO) {
            return Err(CacheError::Config(
                "sliding expiration must be greater than 0".to_string(),
            ));
        }
        if self.absolute_from_now == Some(Duration::ZERO) {
            return Err(CacheError::Config(
                "absolute expiration must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-operation cache configuration
///
/// Every field is optional; unset fields fall back to the service defaults and
/// then to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheEntryOptions {
    /// Storage tier to target
    pub tier: Option<CacheTier>,

    /// Serialization format, drives the buffer kind
    pub format: Option<SerializationFormat>,

    /// Expiration policy applied on write
    pub expiration: Option<CacheExpiration>,

    /// Tags for group invalidation
    pub tags: Option<Vec<String>>,

    /// Free-form region label
    pub region: Option<String>,

    /// Return failures to the caller instead of logging them
    pub throw_on_error: Option<bool>,
}

impl CacheEntryOptions {
    /// Create a new builder for entry options
    pub fn builder() -> CacheEntryOptionsBuilder {
        CacheEntryOptionsBuilder::default()
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if let Some(expiration) = &self.expiration {
            expiration.validate()?;
        }

        if let Some(tags) = &self.tags {
            if tags.iter().any(|t| t.trim().is_empty()) {
                return Err(CacheError::Config("tags must not be blank".to_string()));
            }
        }

        if let Some(region) = &self.region {
            if region.trim().is_empty() {
                return Err(CacheError::Config("region must not be blank".to_string()));
            }
        }

        Ok(())
    }

    /// Merge these options over `defaults`, field by field
    pub fn resolve(&self, defaults: &CacheEntryOptions) -> ResolvedOptions {
        ResolvedOptions {
            tier: self
                .tier
                .clone()
                .or_else(|| defaults.tier.clone())
                .unwrap_or_default(),
            format: self.format.or(defaults.format).unwrap_or_default(),
            expiration: self
                .expiration
                .clone()
                .or_else(|| defaults.expiration.clone())
                .unwrap_or_default(),
            tags: self
                .tags
                .clone()
                .or_else(|| defaults.tags.clone())
                .unwrap_or_default(),
            region: self.region.clone().or_else(|| defaults.region.clone()),
            throw_on_error: self
                .throw_on_error
                .or(defaults.throw_on_error)
                .unwrap_or(false),
        }
    }
}

/// Builder for entry options
#[derive(Debug, Default)]
pub struct CacheEntryOptionsBuilder {
    options: CacheEntryOptions,
}

impl CacheEntryOptionsBuilder {
    /// Set the storage tier
    pub fn tier(mut self, tier: CacheTier) -> Self {
        self.options.tier = Some(tier);
        self
    }

    /// Set the serialization format
    pub fn format(mut self, format: SerializationFormat) -> Self {
        self.options.format = Some(format);
        self
    }

    /// Set the full expiration policy
    pub fn expiration(mut self, expiration: CacheExpiration) -> Self {
        self.options.expiration = Some(expiration);
        self
    }

    /// Set a sliding expiration window
    pub fn sliding_expiration(mut self, window: Duration) -> Self {
        let expiration = self.options.expiration.take().unwrap_or_default();
        self.options.expiration = Some(expiration.with_sliding(window));
        self
    }

    /// Set an absolute expiration relative to the write
    pub fn absolute_expiration(mut self, ttl: Duration) -> Self {
        let expiration = self.options.expiration.take().unwrap_or_default();
        self.options.expiration = Some(expiration.with_absolute_from_now(ttl));
        self
    }

    /// Set a fixed expiration time
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        let expiration = self.options.expiration.take().unwrap_or_default();
        self.options.expiration = Some(expiration.with_absolute_at(at));
        self
    }

    /// Add a single tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let tags = self.options.tags.get_or_insert_with(Vec::new);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
        self
    }

    /// Add several tags
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self = self.tag(tag);
        }
        self
    }

    /// Set the region label
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.options.region = Some(region.into());
        self
    }

    /// Enable or disable error propagation
    pub fn throw_on_error(mut self, enable: bool) -> Self {
        self.options.throw_on_error = Some(enable);
        self
    }

    /// Build the options
    pub fn build(self) -> CacheEntryOptions {
        self.options
    }
}

/// Preset options for common use cases
impl CacheEntryOptions {
    /// In-process storage of untransformed values
    pub fn local() -> Self {
        Self::builder()
            .tier(CacheTier::Local)
            .format(SerializationFormat::None)
            .build()
    }

    /// Shared storage of JSON text
    pub fn distributed_json() -> Self {
        Self::builder()
            .tier(CacheTier::Distributed)
            .format(SerializationFormat::Json)
            .build()
    }
}

/// Effective configuration of a single call
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub tier: CacheTier,
    pub format: SerializationFormat,
    pub expiration: CacheExpiration,
    pub tags: Vec<String>,
    pub region: Option<String>,
    pub throw_on_error: bool,
}

impl ResolvedOptions {
    /// Buffer kind this call travels as
    pub fn buffer_kind(&self) -> BufferKind {
        buffer_kind_for(&self.tier, self.format)
    }
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        CacheEntryOptions::default().resolve(&CacheEntryOptions::default())
    }
}
