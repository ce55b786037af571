//! Backend and serializer resolution
//!
//! The resolver owns both registries and is the only place where capability
//! discovery happens. Construction never fails and performs no I/O: a missing
//! combination only surfaces when a call asks for it.

use crate::cache::backend::BackendHandle;
use crate::cache::registry::{BackendRegistry, SerializerRegistry};
use crate::cache::serializer::SerializerHandle;
use crate::cache::types::{BufferKind, CacheTier, SerializationFormat};
use crate::error::{CacheError, Result};
use tracing::debug;

/// Lookup facade over the backend and serializer registries
#[derive(Debug, Default)]
pub struct Resolver {
    backends: BackendRegistry,
    serializers: SerializerRegistry,
}

impl Resolver {
    /// Build a resolver from explicit backend and serializer lists
    pub fn new<B, S>(backends: B, serializers: S) -> Self
    where
        B: IntoIterator<Item = BackendHandle>,
        S: IntoIterator<Item = SerializerHandle>,
    {
        let mut resolver = Self::default();

        for backend in backends {
            resolver.register_backend(backend);
        }

        for serializer in serializers {
            resolver.register_serializer(serializer);
        }

        resolver
    }

    /// Create a new builder
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    fn register_backend(&mut self, backend: BackendHandle) {
        let tier = backend.tier();
        let kind = backend.kind();

        if self.backends.register(backend).is_some() {
            debug!(%tier, %kind, "Replaced previously registered cache backend");
        } else {
            debug!(%tier, %kind, "Registered cache backend");
        }
    }

    fn register_serializer(&mut self, serializer: SerializerHandle) {
        let format = serializer.format();
        let kind = serializer.kind();

        // Format `none` never reaches a serializer
        if format == SerializationFormat::None {
            debug!(%kind, "Skipping serializer without a usable format");
            return;
        }

        if self.serializers.register(serializer).is_some() {
            debug!(%format, %kind, "Replaced previously registered serializer");
        } else {
            debug!(%format, %kind, "Registered serializer");
        }
    }

    /// Backend registered for `tier` and `kind`
    pub fn get_backend(&self, tier: &CacheTier, kind: BufferKind) -> Result<BackendHandle> {
        self.backends
            .get(tier, kind)
            .cloned()
            .ok_or_else(|| CacheError::BackendNotFound {
                tier: tier.clone(),
                kind,
            })
    }

    /// Serializer registered for `format` and `kind`
    pub fn get_serializer(
        &self,
        format: SerializationFormat,
        kind: BufferKind,
    ) -> Result<SerializerHandle> {
        self.serializers
            .get(format, kind)
            .cloned()
            .ok_or(CacheError::SerializerNotFound { format, kind })
    }

    pub fn has_backend(&self, tier: &CacheTier, kind: BufferKind) -> bool {
        self.backends.get(tier, kind).is_some()
    }

    pub fn has_serializer(&self, format: SerializationFormat, kind: BufferKind) -> bool {
        self.serializers.get(format, kind).is_some()
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    pub fn serializer_count(&self) -> usize {
        self.serializers.len()
    }
}

/// Builder collecting backends and serializers before resolution starts
#[derive(Debug, Default)]
pub struct ResolverBuilder {
    backends: Vec<BackendHandle>,
    serializers: Vec<SerializerHandle>,
}

impl ResolverBuilder {
    /// Add a backend handle
    pub fn backend(mut self, backend: BackendHandle) -> Self {
        self.backends.push(backend);
        self
    }

    /// Add a serializer handle
    pub fn serializer(mut self, serializer: SerializerHandle) -> Self {
        self.serializers.push(serializer);
        self
    }

    /// Build the resolver, registering in insertion order
    pub fn build(self) -> Resolver {
        Resolver::new(self.backends, self.serializers)
    }
}
