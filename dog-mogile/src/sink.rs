use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Outcome of handing a chunk to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// More chunks may follow immediately
    Ready,
    /// The chunk was accepted but the sink is full; wait for `drained`
    Saturated,
}

/// Local destination for downloaded bytes, with explicit backpressure
///
/// `write` never blocks. A `Saturated` answer obliges the caller to stop
/// producing until `drained` resolves. `close` persists everything already
/// accepted before releasing the sink and reports the persisted byte count.
#[async_trait]
pub trait ByteSink: Send {
    fn write(&mut self, chunk: Bytes) -> io::Result<WriteStatus>;

    async fn drained(&mut self) -> io::Result<()>;

    async fn close(&mut self) -> io::Result<u64>;
}

/// Something a sink can be opened on, with truncate-or-create semantics
#[async_trait]
pub trait SinkTarget: Send + Sync {
    type Sink: ByteSink;

    async fn open(&self) -> io::Result<Self::Sink>;
}

/// A local file download destination
#[derive(Debug, Clone)]
pub struct FileTarget {
    path: PathBuf,
    high_water_mark: usize,
}

impl FileTarget {
    pub fn new<P: AsRef<Path>>(path: P, high_water_mark: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            high_water_mark: high_water_mark.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SinkTarget for FileTarget {
    type Sink = FileSink;

    async fn open(&self) -> io::Result<FileSink> {
        let file = File::create(&self.path).await?;
        Ok(FileSink::spawn(file, self.high_water_mark))
    }
}

/// File sink backed by a queue drained by a dedicated writer task
///
/// Chunks are queued in order; closing drops the queue's sender so the
/// writer finishes every queued chunk, flushes, and only then reports.
pub struct FileSink {
    queue: Option<mpsc::UnboundedSender<Bytes>>,
    writer: Option<JoinHandle<io::Result<u64>>>,
    state: Arc<QueueState>,
    high_water_mark: usize,
    closed_with: Option<u64>,
}

#[derive(Default)]
struct QueueState {
    pending: Mutex<Pending>,
    drained: Notify,
}

#[derive(Default)]
struct Pending {
    bytes: usize,
    failure: Option<(io::ErrorKind, String)>,
}

impl QueueState {
    fn release(&self, n: usize) {
        let mut pending = self.pending.lock();
        pending.bytes = pending.bytes.saturating_sub(n);
        if pending.bytes == 0 {
            self.drained.notify_waiters();
        }
    }

    fn fail(&self, err: &io::Error) {
        self.pending.lock().failure = Some((err.kind(), err.to_string()));
        self.drained.notify_waiters();
    }

    fn failure(&self) -> Option<io::Error> {
        self.pending
            .lock()
            .failure
            .as_ref()
            .map(|(kind, msg)| io::Error::new(*kind, msg.clone()))
    }
}

impl FileSink {
    fn spawn(file: File, high_water_mark: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState::default());
        let writer = tokio::spawn(run_writer(file, rx, state.clone()));
        Self {
            queue: Some(tx),
            writer: Some(writer),
            state,
            high_water_mark,
            closed_with: None,
        }
    }

    /// Bytes accepted but not yet written to the file
    pub fn buffered(&self) -> usize {
        self.state.pending.lock().bytes
    }
}

async fn run_writer(
    mut file: File,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
    state: Arc<QueueState>,
) -> io::Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = rx.recv().await {
        // tokio's File acknowledges a write before it lands; flush so a
        // chunk only counts as drained once the write has completed
        let result = match file.write_all(&chunk).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            state.fail(&e);
            return Err(e);
        }
        written += chunk.len() as u64;
        state.release(chunk.len());
    }
    if let Err(e) = file.flush().await {
        state.fail(&e);
        return Err(e);
    }
    Ok(written)
}

#[async_trait]
impl ByteSink for FileSink {
    fn write(&mut self, chunk: Bytes) -> io::Result<WriteStatus> {
        if let Some(err) = self.state.failure() {
            return Err(err);
        }
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink already closed"))?;

        let buffered = {
            let mut pending = self.state.pending.lock();
            pending.bytes += chunk.len();
            pending.bytes
        };
        queue
            .send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "sink writer stopped"))?;

        Ok(if buffered >= self.high_water_mark {
            WriteStatus::Saturated
        } else {
            WriteStatus::Ready
        })
    }

    async fn drained(&mut self) -> io::Result<()> {
        loop {
            let notified = self.state.drained.notified();
            if let Some(err) = self.state.failure() {
                return Err(err);
            }
            if self.buffered() == 0 {
                return Ok(());
            }
            notified.await;
        }
    }

    async fn close(&mut self) -> io::Result<u64> {
        if let Some(written) = self.closed_with {
            return Ok(written);
        }
        drop(self.queue.take());
        let writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink writer stopped"))?;
        let written = writer
            .await
            .map_err(io::Error::other)??;
        self.closed_with = Some(written);
        Ok(written)
    }
}

/// In-memory download destination, shared with the caller
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buffer.lock())
    }

    /// Take the written bytes, leaving the target empty
    pub fn take(&self) -> Bytes {
        Bytes::from(std::mem::take(&mut *self.buffer.lock()))
    }
}

#[async_trait]
impl SinkTarget for MemoryTarget {
    type Sink = MemorySink;

    async fn open(&self) -> io::Result<MemorySink> {
        self.buffer.lock().clear();
        Ok(MemorySink {
            buffer: self.buffer.clone(),
            written: 0,
        })
    }
}

/// Sink appending to a shared buffer; it never saturates
#[derive(Debug)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    written: u64,
}

#[async_trait]
impl ByteSink for MemorySink {
    fn write(&mut self, chunk: Bytes) -> io::Result<WriteStatus> {
        self.buffer.lock().extend_from_slice(&chunk);
        self.written += chunk.len() as u64;
        Ok(WriteStatus::Ready)
    }

    async fn drained(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> io::Result<u64> {
        Ok(self.written)
    }
}
