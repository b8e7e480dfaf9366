use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dog_mogile::{ByteSink, SinkTarget, WriteStatus};
use parking_lot::Mutex;
use tokio::sync::watch;

/// What a gated sink observed over its lifetime
#[derive(Debug, Clone, Default)]
pub struct GateReport {
    pub writes_while_saturated: u32,
    pub max_buffered: usize,
    pub drains: u32,
    pub closed: bool,
    pub closed_while_saturated: bool,
}

/// Sink target with a fixed capacity that only drains once its gate opens
#[derive(Clone)]
pub struct GatedTarget {
    capacity: usize,
    gate: watch::Receiver<bool>,
    flushed: Arc<Mutex<Vec<u8>>>,
    report: Arc<Mutex<GateReport>>,
}

impl GatedTarget {
    /// A target whose gate starts closed; send `true` to let it drain
    pub fn closed(capacity: usize) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self::with_gate(capacity, rx), tx)
    }

    /// A target that drains whenever asked
    pub fn open(capacity: usize) -> Self {
        let (tx, rx) = watch::channel(true);
        // keep the value observable after the sender goes away
        drop(tx);
        Self::with_gate(capacity, rx)
    }

    fn with_gate(capacity: usize, gate: watch::Receiver<bool>) -> Self {
        Self {
            capacity,
            gate,
            flushed: Arc::new(Mutex::new(Vec::new())),
            report: Arc::new(Mutex::new(GateReport::default())),
        }
    }

    pub fn flushed(&self) -> Vec<u8> {
        self.flushed.lock().clone()
    }

    pub fn report(&self) -> GateReport {
        self.report.lock().clone()
    }
}

#[async_trait]
impl SinkTarget for GatedTarget {
    type Sink = GatedSink;

    async fn open(&self) -> io::Result<GatedSink> {
        self.flushed.lock().clear();
        Ok(GatedSink {
            capacity: self.capacity,
            buffered: BytesMut::new(),
            gate: self.gate.clone(),
            flushed: self.flushed.clone(),
            report: self.report.clone(),
        })
    }
}

pub struct GatedSink {
    capacity: usize,
    buffered: BytesMut,
    gate: watch::Receiver<bool>,
    flushed: Arc<Mutex<Vec<u8>>>,
    report: Arc<Mutex<GateReport>>,
}

impl GatedSink {
    fn saturated(&self) -> bool {
        self.buffered.len() >= self.capacity
    }

    fn flush(&mut self) {
        self.flushed.lock().extend_from_slice(&self.buffered.split());
    }
}

#[async_trait]
impl ByteSink for GatedSink {
    fn write(&mut self, chunk: Bytes) -> io::Result<WriteStatus> {
        let mut report = self.report.lock();
        if self.saturated() {
            report.writes_while_saturated += 1;
        }
        self.buffered.extend_from_slice(&chunk);
        report.max_buffered = report.max_buffered.max(self.buffered.len());
        drop(report);

        Ok(if self.saturated() {
            WriteStatus::Saturated
        } else {
            WriteStatus::Ready
        })
    }

    async fn drained(&mut self) -> io::Result<()> {
        // a dropped sender leaves the last value in place, so an open gate stays open
        loop {
            let open = *self.gate.borrow_and_update();
            if open {
                break;
            }
            if self.gate.changed().await.is_err() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gate dropped while closed"));
            }
        }
        self.flush();
        self.report.lock().drains += 1;
        Ok(())
    }

    async fn close(&mut self) -> io::Result<u64> {
        {
            let mut report = self.report.lock();
            report.closed = true;
            report.closed_while_saturated |= self.saturated();
        }
        self.flush();
        Ok(self.flushed.lock().len() as u64)
    }
}
