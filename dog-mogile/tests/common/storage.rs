use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dog_mogile::{ByteStream, MogileError, MogileResult, StorageLocation, StorageTransport};
use futures_util::StreamExt;
use parking_lot::Mutex;

/// Storage node simulation keeping objects in memory
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    /// Size of the chunks GET bodies are cut into
    chunk_size: usize,
    /// Delay applied per `throttle_every` bytes received by PUT
    throttle: Option<(Duration, usize)>,
    /// GET bodies for these URLs fail after the given number of bytes
    broken_reads: Mutex<HashMap<String, usize>>,
    gets: Mutex<Vec<String>>,
    puts: Mutex<Vec<(String, u64)>>,
    /// Bytes handed out by GET bodies so far
    pub served: Arc<AtomicU64>,
}

impl MemoryStorage {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            chunk_size,
            throttle: None,
            broken_reads: Mutex::new(HashMap::new()),
            gets: Mutex::new(Vec::new()),
            puts: Mutex::new(Vec::new()),
            served: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn throttled(mut self, delay: Duration, every: usize) -> Self {
        self.throttle = Some((delay, every));
        self
    }

    pub fn insert(&self, url: &str, data: impl Into<Bytes>) {
        self.objects.lock().insert(url.to_string(), data.into());
    }

    pub fn object(&self, url: &str) -> Option<Bytes> {
        self.objects.lock().get(url).cloned()
    }

    pub fn break_read_after(&self, url: &str, bytes: usize) {
        self.broken_reads.lock().insert(url.to_string(), bytes);
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().clone()
    }

    /// `(url, declared content length)` of every PUT
    pub fn puts(&self) -> Vec<(String, u64)> {
        self.puts.lock().clone()
    }
}

#[derive(Debug)]
struct NodeError(String);

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NodeError {}

#[async_trait]
impl StorageTransport for MemoryStorage {
    async fn get(&self, location: &StorageLocation) -> MogileResult<ByteStream> {
        let url = location.as_str().to_string();
        self.gets.lock().push(url.clone());
        let data = self
            .object(&url)
            .ok_or_else(|| MogileError::transport(NodeError(format!("404 Not Found: {url}"))))?;
        let break_at = self.broken_reads.lock().get(&url).copied();
        let chunk_size = self.chunk_size;
        let served = self.served.clone();

        let stream = async_stream::stream! {
            let mut offset = 0;
            while offset < data.len() {
                if let Some(limit) = break_at {
                    if offset >= limit {
                        yield Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by node"));
                        break;
                    }
                }
                let end = (offset + chunk_size).min(data.len());
                served.fetch_add((end - offset) as u64, Ordering::SeqCst);
                yield Ok(data.slice(offset..end));
                offset = end;
            }
        };
        Ok(Box::pin(stream))
    }

    async fn put(
        &self,
        location: &StorageLocation,
        content_length: u64,
        mut body: ByteStream,
    ) -> MogileResult<()> {
        let url = location.as_str().to_string();
        self.puts.lock().push((url.clone(), content_length));

        let mut received = BytesMut::new();
        let mut since_pause = 0usize;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(MogileError::transport)?;
            received.extend_from_slice(&chunk);
            if let Some((delay, every)) = self.throttle {
                since_pause += chunk.len();
                while since_pause >= every {
                    tokio::time::sleep(delay).await;
                    since_pause -= every;
                }
            }
            if received.len() as u64 > content_length {
                return Err(MogileError::transport(NodeError("body longer than Content-Length".into())));
            }
        }
        if received.len() as u64 != content_length {
            return Err(MogileError::transport(NodeError(format!(
                "body of {} bytes does not match Content-Length {}",
                received.len(),
                content_length
            ))));
        }

        self.objects.lock().insert(url, received.freeze());
        Ok(())
    }
}
