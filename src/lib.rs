//! # Ouroboros Cache (ouroboros-cache)
//!
//! A cache access facade for Rust: one set of operations over storage
//! backends and serialization formats that are plugged in at startup.
//!
//! ## Features
//!
//! - Uniform `get` / `set` / `get_or_set` / `remove` / `remove_by_prefix` /
//!   `remove_by_tags` / `clear` / `exists` / `list_keys`
//! - Backend selection by tier (local or distributed) and buffer kind
//! - Serializer selection by format (JSON, XML, Protobuf, MessagePack, binary)
//! - Native storage of values on the local tier, without serialization
//! - Sliding, relative and absolute expiration, tags and regions per call
//! - Configurable error policy: log-and-continue or propagate
//! - Cancellation threaded through every backend call
//!
//! ## Cache-aside
//!
//! ```no_run
//! use ouroboros_cache::{
//!     BackendHandle, CacheEntryOptions, CacheService, MemoryBackend, NativeValue, Resolver,
//!     CacheTier,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     ouroboros_cache::logging::init_tracing();
//!
//!     let resolver = Resolver::new(
//!         vec![BackendHandle::native(MemoryBackend::<NativeValue>::new(CacheTier::Local))],
//!         Vec::new(),
//!     );
//!     let cache = CacheService::new(Arc::new(resolver));
//!
//!     let options = CacheEntryOptions::builder()
//!         .absolute_expiration(Duration::from_secs(300))
//!         .tag("reports")
//!         .build();
//!
//!     let report = cache
//!         .get_or_set(
//!             "report:daily",
//!             || async { Ok("expensive result".to_string()) },
//!             Some(&options),
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use cache::{
    BackendHandle, BufferKind, CacheBackend, CacheEntryOptions, CacheEntryOptionsBuilder,
    CacheExpiration, CacheKey, CacheSerializer, CacheService, CacheStats, CacheTier, Cacheable,
    JsonSerializer, MemoryBackend, NativeValue, ResolvedOptions, Resolver, ResolverBuilder,
    SerializationFormat, SerializerHandle, ValueReader,
};
pub use error::{CacheError, Result};
