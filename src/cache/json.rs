//! JSON text serializer

use crate::cache::serializer::{CacheSerializer, ValueReader};
use crate::cache::types::SerializationFormat;
use crate::error::{CacheError, Result};

/// Serializes values as compact JSON text
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit indented JSON, handy when inspecting a shared store by hand
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl CacheSerializer<String> for JsonSerializer {
    fn format(&self) -> SerializationFormat {
        SerializationFormat::Json
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        text.map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize(&self, buffer: &String, read: &mut ValueReader<'_>) -> Result<()> {
        let mut de = serde_json::Deserializer::from_str(buffer);
        {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
            read(&mut erased)?;
        }

        de.end()?;
        Ok(())
    }
}
