//! Cache service: the public facade over resolved backends and serializers
//!
//! Each call resolves its options once, picks a buffer kind from the tier and
//! format, asks the resolver for a backend (and a serializer for text/binary
//! storage) and forwards the call. Argument validation happens before the
//! failure boundary, so formal errors always reach the caller. Everything
//! after it is subject to `throw_on_error`.

use crate::cache::backend::{BackendHandle, CacheBackend};
use crate::cache::config::{CacheEntryOptions, ResolvedOptions};
use crate::cache::resolver::Resolver;
use crate::cache::serializer::CacheSerializer;
use crate::cache::types::{
    validate_key, validate_non_blank, validate_tags, BufferKind, Cacheable, NativeValue,
};
use crate::error::{CacheError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Backend and serializer chosen for a get or set
enum Route {
    Native(Arc<dyn CacheBackend<NativeValue>>),
    Text(Arc<dyn CacheBackend<String>>, Arc<dyn CacheSerializer<String>>),
    Binary(Arc<dyn CacheBackend<Vec<u8>>>, Arc<dyn CacheSerializer<Vec<u8>>>),
}

/// What an operation targets, for log output
enum Subject<'a> {
    Key(&'a str),
    Prefix(&'a str),
    Tags(&'a [String]),
    Pattern(Option<&'a str>),
    All,
}

impl fmt::Display for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Key(key) => write!(f, "key={}", key),
            Subject::Prefix(prefix) => write!(f, "prefix={}", prefix),
            Subject::Tags(tags) => write!(f, "tags={}", tags.join(",")),
            Subject::Pattern(Some(pattern)) => write!(f, "pattern={}", pattern),
            Subject::Pattern(None) => write!(f, "pattern=*"),
            Subject::All => write!(f, "all"),
        }
    }
}

/// Uniform cache access over every registered backend and serializer
///
/// The service is cheap to clone and holds no mutable state; concurrent calls
/// need no coordination.
///
/// `get`, `set` and `get_or_set` accept any [`Cacheable`] type so the same call
/// works on every tier. Objects without serde support, such as handles or
/// locks, go through [`get_native`](Self::get_native) and
/// [`set_native`](Self::set_native), which only touch native storage.
#[derive(Debug, Clone)]
pub struct CacheService {
    resolver: Arc<Resolver>,
    defaults: CacheEntryOptions,
}

impl CacheService {
    /// Create a service with the built-in defaults
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            defaults: CacheEntryOptions::default(),
        }
    }

    /// Create a service with instance-level default options
    pub fn with_defaults(resolver: Arc<Resolver>, defaults: CacheEntryOptions) -> Result<Self> {
        defaults.validate()?;
        Ok(Self { resolver, defaults })
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn defaults(&self) -> &CacheEntryOptions {
        &self.defaults
    }

    /// Merge per-call options over the instance defaults
    pub fn resolve_options(&self, options: Option<&CacheEntryOptions>) -> ResolvedOptions {
        match options {
            Some(options) => options.resolve(&self.defaults),
            None => self.defaults.resolve(&CacheEntryOptions::default()),
        }
    }

    /// Validate per-call options and merge them over the defaults
    ///
    /// Invalid options are a formal error, reported before any backend work.
    fn checked_options(&self, options: Option<&CacheEntryOptions>) -> Result<ResolvedOptions> {
        if let Some(options) = options {
            options.validate().map_err(|e| match e {
                CacheError::Config(reason) => CacheError::invalid_argument("options", reason),
                other => other,
            })?;
        }
        Ok(self.resolve_options(options))
    }

    /// Fetch a value
    ///
    /// Returns `None` on a miss, on a native value of a different type, and on
    /// any suppressed failure.
    pub async fn get<T: Cacheable>(
        &self,
        key: &str,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        validate_key(key)?;
        let resolved = self.checked_options(options)?;

        let result = self.fetch::<T>(key, &resolved, cancel).await;
        self.apply_policy("get", Subject::Key(key), &resolved, result, None)
    }

    /// Store a value
    pub async fn set<T: Cacheable>(
        &self,
        key: &str,
        value: T,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_key(key)?;
        let resolved = self.checked_options(options)?;

        let result = self.store(key, value, &resolved, cancel).await;
        self.apply_policy("set", Subject::Key(key), &resolved, result, ())
    }

    /// Return the cached value, or compute, store and return it on a miss
    ///
    /// `factory` runs at most once per call. Concurrent misses on the same key
    /// are not coalesced: each may run its factory, and the last write wins.
    /// Factory errors are returned as-is.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        factory: F,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        validate_key(key)?;

        if let Some(hit) = self.get::<T>(key, options, cancel).await? {
            return Ok(hit);
        }

        debug!(key, "Cache miss, invoking factory");
        let value = factory().await?;
        self.set(key, value.clone(), options, cancel).await?;

        Ok(value)
    }

    /// Store an in-process object without any transformation
    ///
    /// Always targets the native backend of the resolved tier; the format
    /// option is ignored.
    pub async fn set_native<T: Any + Send + Sync>(
        &self,
        key: &str,
        value: T,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_key(key)?;
        let resolved = self.checked_options(options)?;

        let result = async {
            let backend = self.native_backend("set_native", &resolved, cancel)?;
            let value: NativeValue = Arc::new(value);
            backend
                .set(key, value, &resolved.expiration, &resolved.tags, cancel)
                .await
        }
        .await;
        self.apply_policy("set_native", Subject::Key(key), &resolved, result, ())
    }

    /// Fetch the shared object stored under `key` from native storage
    ///
    /// Values written by `set` on a native tier are visible here as well.
    pub async fn get_native<T: Any + Send + Sync>(
        &self,
        key: &str,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<T>>> {
        validate_key(key)?;
        let resolved = self.checked_options(options)?;

        let result = async {
            let backend = self.native_backend("get_native", &resolved, cancel)?;
            let Some(value) = backend.get(key, cancel).await? else {
                return Ok(None);
            };

            match value.downcast::<T>() {
                Ok(value) => Ok(Some(value)),
                Err(_) => {
                    warn_type_mismatch::<T>(key);
                    Ok(None)
                }
            }
        }
        .await;
        self.apply_policy("get_native", Subject::Key(key), &resolved, result, None)
    }

    /// Remove a single entry
    pub async fn remove(
        &self,
        key: &str,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_key(key)?;
        let resolved = self.checked_options(options)?;

        let result = async {
            let backend = self.dispatch_backend("remove", &resolved, cancel)?;
            backend.remove(key, cancel).await
        }
        .await;
        self.apply_policy("remove", Subject::Key(key), &resolved, result, ())
    }

    /// Remove every entry whose key starts with `prefix`
    pub async fn remove_by_prefix(
        &self,
        prefix: &str,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_non_blank("prefix", prefix)?;
        let resolved = self.checked_options(options)?;

        let result = async {
            let backend = self.dispatch_backend("remove_by_prefix", &resolved, cancel)?;
            backend.remove_by_prefix(prefix, cancel).await
        }
        .await;
        self.apply_policy(
            "remove_by_prefix",
            Subject::Prefix(prefix),
            &resolved,
            result,
            (),
        )
    }

    /// Remove every entry carrying at least one of `tags`
    pub async fn remove_by_tags(
        &self,
        tags: &[String],
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_tags(tags)?;
        let resolved = self.checked_options(options)?;

        let result = async {
            let backend = self.dispatch_backend("remove_by_tags", &resolved, cancel)?;
            backend.remove_by_tags(tags, cancel).await
        }
        .await;
        self.apply_policy("remove_by_tags", Subject::Tags(tags), &resolved, result, ())
    }

    /// Remove every entry of the resolved backend
    pub async fn clear(
        &self,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let resolved = self.checked_options(options)?;

        let result = async {
            let backend = self.dispatch_backend("clear", &resolved, cancel)?;
            backend.clear(cancel).await
        }
        .await;
        self.apply_policy("clear", Subject::All, &resolved, result, ())
    }

    /// Whether an entry exists; `false` on a suppressed failure
    pub async fn exists(
        &self,
        key: &str,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        validate_key(key)?;
        let resolved = self.checked_options(options)?;

        let result = async {
            let backend = self.dispatch_backend("exists", &resolved, cancel)?;
            backend.exists(key, cancel).await
        }
        .await;
        self.apply_policy("exists", Subject::Key(key), &resolved, result, false)
    }

    /// Keys of the resolved backend matching `pattern`; empty on a suppressed failure
    pub async fn list_keys(
        &self,
        pattern: Option<&str>,
        options: Option<&CacheEntryOptions>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        if let Some(pattern) = pattern {
            validate_non_blank("pattern", pattern)?;
        }
        let resolved = self.checked_options(options)?;

        let result = async {
            let backend = self.dispatch_backend("list_keys", &resolved, cancel)?;
            backend.list_keys(pattern, cancel).await
        }
        .await;
        self.apply_policy(
            "list_keys",
            Subject::Pattern(pattern),
            &resolved,
            result,
            Vec::new(),
        )
    }

    async fn fetch<T: Cacheable>(
        &self,
        key: &str,
        resolved: &ResolvedOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        ensure_active(cancel, "get")?;

        match self.route(resolved)? {
            Route::Native(backend) => {
                let Some(value) = backend.get(key, cancel).await? else {
                    return Ok(None);
                };

                match value.downcast_ref::<T>() {
                    Some(value) => Ok(Some(value.clone())),
                    None => {
                        warn_type_mismatch::<T>(key);
                        Ok(None)
                    }
                }
            }
            Route::Text(backend, serializer) => {
                decode(backend.get(key, cancel).await?, &*serializer)
            }
            Route::Binary(backend, serializer) => {
                decode(backend.get(key, cancel).await?, &*serializer)
            }
        }
    }

    async fn store<T: Cacheable>(
        &self,
        key: &str,
        value: T,
        resolved: &ResolvedOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancel, "set")?;
        let expiration = &resolved.expiration;
        let tags = resolved.tags.as_slice();

        match self.route(resolved)? {
            Route::Native(backend) => {
                let value: NativeValue = Arc::new(value);
                backend.set(key, value, expiration, tags, cancel).await
            }
            Route::Text(backend, serializer) => {
                let buffer = encode(&value, &*serializer)?;
                backend.set(key, buffer, expiration, tags, cancel).await
            }
            Route::Binary(backend, serializer) => {
                let buffer = encode(&value, &*serializer)?;
                backend.set(key, buffer, expiration, tags, cancel).await
            }
        }
    }

    /// Pick the backend, plus a serializer when values need encoding
    fn route(&self, resolved: &ResolvedOptions) -> Result<Route> {
        let kind = resolved.buffer_kind();
        let backend = self.resolver.get_backend(&resolved.tier, kind)?;

        let route = match backend {
            BackendHandle::Native(backend) => Route::Native(backend),
            BackendHandle::Text(backend) => {
                let serializer = self.resolver.get_serializer(resolved.format, kind)?;
                let serializer = serializer
                    .as_text()
                    .cloned()
                    .ok_or(CacheError::SerializerNotFound {
                        format: resolved.format,
                        kind,
                    })?;
                Route::Text(backend, serializer)
            }
            BackendHandle::Binary(backend) => {
                let serializer = self.resolver.get_serializer(resolved.format, kind)?;
                let serializer = serializer
                    .as_binary()
                    .cloned()
                    .ok_or(CacheError::SerializerNotFound {
                        format: resolved.format,
                        kind,
                    })?;
                Route::Binary(backend, serializer)
            }
        };

        Ok(route)
    }

    fn native_backend(
        &self,
        operation: &'static str,
        resolved: &ResolvedOptions,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn CacheBackend<NativeValue>>> {
        ensure_active(cancel, operation)?;

        match self.resolver.get_backend(&resolved.tier, BufferKind::Native)? {
            BackendHandle::Native(backend) => Ok(backend),
            _ => Err(CacheError::BackendNotFound {
                tier: resolved.tier.clone(),
                kind: BufferKind::Native,
            }),
        }
    }

    fn dispatch_backend(
        &self,
        operation: &'static str,
        resolved: &ResolvedOptions,
        cancel: &CancellationToken,
    ) -> Result<BackendHandle> {
        ensure_active(cancel, operation)?;
        self.resolver
            .get_backend(&resolved.tier, resolved.buffer_kind())
    }

    /// Return the error or log it and fall back to `empty`
    fn apply_policy<R>(
        &self,
        operation: &'static str,
        subject: Subject<'_>,
        resolved: &ResolvedOptions,
        result: Result<R>,
        empty: R,
    ) -> Result<R> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if resolved.throw_on_error => Err(e),
            Err(e) => {
                error!(
                    operation,
                    %subject,
                    tier = %resolved.tier,
                    format = %resolved.format,
                    region = resolved.region.as_deref().unwrap_or(""),
                    error = %e,
                    "Cache operation failed"
                );
                Ok(empty)
            }
        }
    }
}

fn warn_type_mismatch<T>(key: &str) {
    warn!(
        key,
        expected = std::any::type_name::<T>(),
        "Cached value has a different type than requested, treating as miss"
    );
}

fn ensure_active(cancel: &CancellationToken, operation: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(CacheError::Cancelled { operation });
    }
    Ok(())
}

fn encode<T: Serialize, B>(value: &T, serializer: &dyn CacheSerializer<B>) -> Result<B> {
    serializer.serialize(value)
}

/// Deserialize only when the backend returned a buffer
fn decode<T: DeserializeOwned, B>(
    buffer: Option<B>,
    serializer: &dyn CacheSerializer<B>,
) -> Result<Option<T>> {
    let Some(buffer) = buffer else {
        return Ok(None);
    };

    let mut value = None;
    serializer.deserialize(&buffer, &mut |de| {
        value = Some(erased_serde::deserialize::<T>(de)?);
        Ok(())
    })?;

    value
        .map(Some)
        .ok_or_else(|| CacheError::Serialization("serializer produced no value".to_string()))
}
