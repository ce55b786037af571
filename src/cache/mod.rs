//! # Cache Access Layer
//!
//! A facade giving uniform get/set/remove/exists operations over storage
//! backends and serialization formats that are only known at runtime.
//!
//! ## Architecture
//!
//! - **Registries**: backends indexed by `(tier, buffer kind)`, serializers by
//!   `(format, buffer kind)`
//! - **Resolver**: one lookup facade over both registries
//! - **CacheService**: per-call routing, error policy and cache-aside
//!
//! The buffer kind of a call follows from its options: the local tier always
//! stores values natively, other tiers use the kind implied by the format
//! (`none` native, `json`/`xml` text, `protobuf`/`messagepack`/`binary` bytes).
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_cache::cache::{
//!     BackendHandle, CacheEntryOptions, CacheService, JsonSerializer, MemoryBackend,
//!     NativeValue, Resolver, SerializerHandle,
//! };
//! use ouroboros_cache::CacheTier;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let resolver = Resolver::builder()
//!     .backend(BackendHandle::native(MemoryBackend::<NativeValue>::new(CacheTier::Local)))
//!     .backend(BackendHandle::text(MemoryBackend::<String>::new(CacheTier::Distributed)))
//!     .serializer(SerializerHandle::text(JsonSerializer::new()))
//!     .build();
//!
//! let cache = CacheService::new(Arc::new(resolver));
//! let cancel = CancellationToken::new();
//!
//! // Stored as JSON text on the distributed tier
//! let shared = CacheEntryOptions::distributed_json();
//! cache.set("user:42", "Ada".to_string(), Some(&shared), &cancel).await?;
//!
//! let name: Option<String> = cache.get("user:42", Some(&shared), &cancel).await?;
//! assert_eq!(name.as_deref(), Some("Ada"));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod entry;
pub mod json;
pub mod registry;
pub mod resolver;
pub mod serializer;
pub mod service;
pub mod store;
pub mod types;

pub use backend::{BackendHandle, CacheBackend};
pub use config::{CacheEntryOptions, CacheEntryOptionsBuilder, CacheExpiration, ResolvedOptions};
pub use entry::{CacheEntry, CacheMetadata};
pub use json::JsonSerializer;
pub use registry::{BackendRegistry, SerializerRegistry};
pub use resolver::{Resolver, ResolverBuilder};
pub use serializer::{CacheSerializer, SerializerHandle, ValueReader};
pub use service::CacheService;
pub use store::{CacheStats, MemoryBackend};
pub use types::{BufferKind, CacheKey, CacheTier, Cacheable, NativeValue, SerializationFormat};
