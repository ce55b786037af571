//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bincode::Options;
use ouroboros_cache::{
    BackendHandle, CacheBackend, CacheError, CacheExpiration, CacheSerializer, CacheService,
    CacheTier, JsonSerializer, MemoryBackend, NativeValue, Resolver, Result,
    SerializationFormat, SerializerHandle, ValueReader,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

/// Text serializer that writes JSON while declaring an arbitrary text format
pub struct TextFormatSerializer {
    pub format: SerializationFormat,
}

impl CacheSerializer<String> for TextFormatSerializer {
    fn format(&self) -> SerializationFormat {
        self.format
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, buffer: &String, read: &mut ValueReader<'_>) -> Result<()> {
        let mut de = serde_json::Deserializer::from_str(buffer);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        read(&mut erased)?;
        Ok(())
    }
}

/// Binary serializer that writes JSON bytes while declaring a binary format
pub struct BytesFormatSerializer {
    pub format: SerializationFormat,
}

impl CacheSerializer<Vec<u8>> for BytesFormatSerializer {
    fn format(&self) -> SerializationFormat {
        self.format
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize(&self, buffer: &Vec<u8>, read: &mut ValueReader<'_>) -> Result<()> {
        let mut de = serde_json::Deserializer::from_slice(buffer);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        read(&mut erased)?;
        Ok(())
    }
}

/// Compact bincode encoding; the buffer carries no type information
pub struct BincodeSerializer;

fn bincode_error(e: bincode::Error) -> CacheError {
    CacheError::Serialization(e.to_string())
}

impl CacheSerializer<Vec<u8>> for BincodeSerializer {
    fn format(&self) -> SerializationFormat {
        SerializationFormat::Binary
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>> {
        bincode::DefaultOptions::new()
            .serialize(value)
            .map_err(bincode_error)
    }

    fn deserialize(&self, buffer: &Vec<u8>, read: &mut ValueReader<'_>) -> Result<()> {
        let mut de = bincode::Deserializer::from_slice(buffer, bincode::DefaultOptions::new());
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
        read(&mut erased)?;
        Ok(())
    }
}

/// Backend whose every call fails, counting how often it was reached
#[derive(Clone)]
pub struct FailingBackend {
    pub tier: CacheTier,
    pub calls: Arc<AtomicUsize>,
}

impl FailingBackend {
    pub fn new(tier: CacheTier) -> Self {
        Self {
            tier,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn error() -> CacheError {
        CacheError::Backend("connection refused".to_string())
    }

    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::error())
    }
}

#[async_trait]
impl<B: Send + Sync + 'static> CacheBackend<B> for FailingBackend {
    fn tier(&self) -> CacheTier {
        self.tier.clone()
    }

    async fn get(&self, _key: &str, _cancel: &CancellationToken) -> Result<Option<B>> {
        self.fail()
    }

    async fn set(
        &self,
        _key: &str,
        _value: B,
        _expiration: &CacheExpiration,
        _tags: &[String],
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.fail()
    }

    async fn remove(&self, _key: &str, _cancel: &CancellationToken) -> Result<()> {
        self.fail()
    }

    async fn remove_by_prefix(&self, _prefix: &str, _cancel: &CancellationToken) -> Result<()> {
        self.fail()
    }

    async fn remove_by_tags(&self, _tags: &[String], _cancel: &CancellationToken) -> Result<()> {
        self.fail()
    }

    async fn clear(&self, _cancel: &CancellationToken) -> Result<()> {
        self.fail()
    }

    async fn exists(&self, _key: &str, _cancel: &CancellationToken) -> Result<bool> {
        self.fail()
    }

    async fn list_keys(
        &self,
        _pattern: Option<&str>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        self.fail()
    }
}

/// Backends shared between a service and the test that inspects them
pub struct Fixture {
    pub service: CacheService,
    pub local: MemoryBackend<NativeValue>,
    pub text: MemoryBackend<String>,
    pub binary: MemoryBackend<Vec<u8>>,
}

/// Service with local native, distributed text and distributed binary storage
/// and a serializer for every text and binary format (bincode for `binary`)
pub fn fixture() -> Fixture {
    let local = MemoryBackend::<NativeValue>::new(CacheTier::Local);
    let text = MemoryBackend::<String>::new(CacheTier::Distributed);
    let binary = MemoryBackend::<Vec<u8>>::new(CacheTier::Distributed);

    let resolver = Resolver::builder()
        .backend(BackendHandle::native(local.clone()))
        .backend(BackendHandle::text(text.clone()))
        .backend(BackendHandle::binary(binary.clone()))
        .serializer(SerializerHandle::text(JsonSerializer::new()))
        .serializer(SerializerHandle::text(TextFormatSerializer {
            format: SerializationFormat::Xml,
        }))
        .serializer(SerializerHandle::binary(BytesFormatSerializer {
            format: SerializationFormat::Protobuf,
        }))
        .serializer(SerializerHandle::binary(BytesFormatSerializer {
            format: SerializationFormat::MessagePack,
        }))
        .serializer(SerializerHandle::binary(BincodeSerializer))
        .build();

    Fixture {
        service: CacheService::new(Arc::new(resolver)),
        local,
        text,
        binary,
    }
}

/// Service whose local and distributed backends always fail
pub fn failing_service() -> (CacheService, FailingBackend) {
    let local = FailingBackend::new(CacheTier::Local);
    let distributed = FailingBackend::new(CacheTier::Distributed);

    let resolver = Resolver::builder()
        .backend(BackendHandle::Native(Arc::new(local.clone())))
        .backend(BackendHandle::Text(Arc::new(distributed)))
        .serializer(SerializerHandle::text(JsonSerializer::new()))
        .build();

    (CacheService::new(Arc::new(resolver)), local)
}

/// In-memory log sink for asserting on emitted events
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Number of log lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.contents().lines().filter(|l| l.contains(needle)).count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install a thread-local subscriber writing to the returned sink
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
