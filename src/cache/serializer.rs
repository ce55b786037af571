//! Serializer capability
//!
//! Serializers receive the caller's value as a type-erased `Serialize` and
//! hand back a type-erased `Deserializer` over a stored buffer, so each codec
//! drives serde directly against the real type. Non-self-describing formats
//! such as bincode work the same way as JSON.

use crate::cache::types::{BufferKind, SerializationFormat};
use crate::error::Result;
use std::sync::Arc;

/// Reads one value out of an erased deserializer
pub type ValueReader<'a> =
    dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> std::result::Result<(), erased_serde::Error>
        + 'a;

/// Converts values to and from buffers of type `B`
pub trait CacheSerializer<B>: Send + Sync {
    /// Format produced by this serializer
    fn format(&self) -> SerializationFormat;

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<B>;

    /// Open `buffer` and pass its deserializer to `read`
    ///
    /// Implementations may check for trailing input after `read` returns.
    fn deserialize(&self, buffer: &B, read: &mut ValueReader<'_>) -> Result<()>;
}

/// A registered serializer, tagged by the buffer kind it produces
#[derive(Clone)]
pub enum SerializerHandle {
    Text(Arc<dyn CacheSerializer<String>>),
    Binary(Arc<dyn CacheSerializer<Vec<u8>>>),
}

impl SerializerHandle {
    pub fn text(serializer: impl CacheSerializer<String> + 'static) -> Self {
        SerializerHandle::Text(Arc::new(serializer))
    }

    pub fn binary(serializer: impl CacheSerializer<Vec<u8>> + 'static) -> Self {
        SerializerHandle::Binary(Arc::new(serializer))
    }

    /// Buffer kind produced by the wrapped serializer
    pub fn kind(&self) -> BufferKind {
        match self {
            SerializerHandle::Text(_) => BufferKind::Text,
            SerializerHandle::Binary(_) => BufferKind::Binary,
        }
    }

    /// Format declared by the wrapped serializer
    pub fn format(&self) -> SerializationFormat {
        match self {
            SerializerHandle::Text(s) => s.format(),
            SerializerHandle::Binary(s) => s.format(),
        }
    }

    pub fn as_text(&self) -> Option<&Arc<dyn CacheSerializer<String>>> {
        match self {
            SerializerHandle::Text(s) => Some(s),
            SerializerHandle::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Arc<dyn CacheSerializer<Vec<u8>>>> {
        match self {
            SerializerHandle::Binary(s) => Some(s),
            SerializerHandle::Text(_) => None,
        }
    }
}

impl std::fmt::Debug for SerializerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerHandle")
            .field("kind", &self.kind())
            .field("format", &self.format())
            .finish()
    }
}
