//! Backend and serializer registries
//!
//! Both registries are filled once and read-only afterwards. A second
//! registration under the same key replaces the first.

use crate::cache::backend::BackendHandle;
use crate::cache::serializer::SerializerHandle;
use crate::cache::types::{BufferKind, CacheTier, SerializationFormat};
use std::collections::HashMap;

/// Backends indexed by tier and buffer kind
#[derive(Debug, Default)]
pub struct BackendRegistry {
    entries: HashMap<(CacheTier, BufferKind), BackendHandle>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a backend, returning the one it replaced
    pub fn register(&mut self, backend: BackendHandle) -> Option<BackendHandle> {
        let key = (backend.tier(), backend.kind());
        self.entries.insert(key, backend)
    }

    pub fn get(&self, tier: &CacheTier, kind: BufferKind) -> Option<&BackendHandle> {
        self.entries.get(&(tier.clone(), kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serializers indexed by format and buffer kind
#[derive(Debug, Default)]
pub struct SerializerRegistry {
    entries: HashMap<(SerializationFormat, BufferKind), SerializerHandle>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a serializer, returning the one it replaced
    pub fn register(&mut self, serializer: SerializerHandle) -> Option<SerializerHandle> {
        let key = (serializer.format(), serializer.kind());
        self.entries.insert(key, serializer)
    }

    pub fn get(&self, format: SerializationFormat, kind: BufferKind) -> Option<&SerializerHandle> {
        self.entries.get(&(format, kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
