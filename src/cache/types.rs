//! Core type definitions for the cache facade

use crate::error::{CacheError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Cache key type
pub type CacheKey = String;

/// Buffer stored by native (in-process, untransformed) backends
pub type NativeValue = Arc<dyn Any + Send + Sync>;

/// Values that can travel through every path of the cache service
///
/// Native storage needs `Any + Clone`, serialized storage needs serde.
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Transport shape of a value before it reaches a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    /// No transformation, the value itself is stored
    Native,
    /// String payload
    Text,
    /// Opaque byte sequence
    Binary,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Native => write!(f, "native"),
            BufferKind::Text => write!(f, "text"),
            BufferKind::Binary => write!(f, "binary"),
        }
    }
}

/// Logical storage target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// In-process storage
    Local,
    /// Shared or remote storage
    Distributed,
    /// Host-defined tier
    Custom(String),
}

impl CacheTier {
    /// Local storage always holds untransformed values
    pub fn is_local(&self) -> bool {
        matches!(self, CacheTier::Local)
    }
}

impl Default for CacheTier {
    fn default() -> Self {
        CacheTier::Local
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTier::Local => write!(f, "local"),
            CacheTier::Distributed => write!(f, "distributed"),
            CacheTier::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// Serialization format identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    /// No serialization, values are stored natively
    #[default]
    None,
    Json,
    Xml,
    Protobuf,
    MessagePack,
    Binary,
}

impl SerializationFormat {
    /// Buffer kind a value in this format travels as
    pub fn buffer_kind(&self) -> BufferKind {
        match self {
            SerializationFormat::None => BufferKind::Native,
            SerializationFormat::Json | SerializationFormat::Xml => BufferKind::Text,
            SerializationFormat::Protobuf
            | SerializationFormat::MessagePack
            | SerializationFormat::Binary => BufferKind::Binary,
        }
    }

    /// Convert format to its configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            SerializationFormat::None => "none",
            SerializationFormat::Json => "json",
            SerializationFormat::Xml => "xml",
            SerializationFormat::Protobuf => "protobuf",
            SerializationFormat::MessagePack => "messagepack",
            SerializationFormat::Binary => "binary",
        }
    }
}

impl FromStr for SerializationFormat {
    type Err = CacheError;

    /// Parse format from its configuration name
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(SerializationFormat::None),
            "json" => Ok(SerializationFormat::Json),
            "xml" => Ok(SerializationFormat::Xml),
            "protobuf" => Ok(SerializationFormat::Protobuf),
            "messagepack" | "msgpack" => Ok(SerializationFormat::MessagePack),
            "binary" => Ok(SerializationFormat::Binary),
            other => Err(CacheError::Config(format!(
                "unknown serialization format `{}`",
                other
            ))),
        }
    }
}

impl fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buffer kind for an operation on `tier` with `format`
///
/// The local tier forces native storage regardless of the format.
pub fn buffer_kind_for(tier: &CacheTier, format: SerializationFormat) -> BufferKind {
    if tier.is_local() {
        BufferKind::Native
    } else {
        format.buffer_kind()
    }
}

/// Reject empty or all-whitespace strings for a named argument
pub fn validate_non_blank(name: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CacheError::invalid_argument(
            name,
            "must not be empty or whitespace",
        ));
    }
    Ok(())
}

/// Reject invalid cache keys
pub fn validate_key(key: &str) -> Result<()> {
    validate_non_blank("key", key)
}

/// Reject an empty tag set or any blank tag
pub fn validate_tags(tags: &[String]) -> Result<()> {
    if tags.is_empty() {
        return Err(CacheError::invalid_argument("tags", "must not be empty"));
    }
    if tags.iter().any(|t| t.trim().is_empty()) {
        return Err(CacheError::invalid_argument(
            "tags",
            "must not contain blank tags",
        ));
    }
    Ok(())
}
