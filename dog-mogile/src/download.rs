use std::io;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    flow::{pump, PumpError},
    ByteSink, MogileError, MogileResult, PathResolver, SinkTarget, StorageTransport, TransferId,
};

/// Streams a key's bytes from a storage node into a local sink
///
/// Only the first resolved location is tried. A failed GET is reported to
/// the caller, who may retry; no other replica is attempted here.
#[derive(Clone)]
pub struct Downloader {
    resolver: PathResolver,
    transport: Arc<dyn StorageTransport>,
    verify: bool,
}

impl Downloader {
    pub fn new(resolver: PathResolver, transport: Arc<dyn StorageTransport>) -> Self {
        Self {
            resolver,
            transport,
            verify: false,
        }
    }

    /// Ask the tracker to verify replicas before picking one
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Download `key` into a freshly opened sink, returning the bytes persisted
    #[instrument(skip(self, target), fields(transfer_id = %TransferId::new()))]
    pub async fn download<T: SinkTarget>(&self, key: &str, target: &T) -> MogileResult<u64> {
        let location = self
            .resolver
            .resolve_paths(key, self.verify)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MogileError::not_found(key))?;

        let mut sink = target.open().await.map_err(MogileError::sink_io)?;

        let mut body = match self.transport.get(&location).await {
            Ok(body) => body,
            Err(e) => {
                close_after_failure(&mut sink).await;
                return Err(e);
            }
        };

        let stats = match pump(&mut body, &mut sink).await {
            Ok(stats) => stats,
            Err(failure) => {
                drop(body);
                close_after_failure(&mut sink).await;
                return Err(match failure {
                    PumpError::Source(e) => MogileError::transport(e),
                    PumpError::Sink(e) => MogileError::sink_io(e),
                });
            }
        };

        let persisted = sink.close().await.map_err(MogileError::sink_io)?;
        if persisted != stats.bytes {
            return Err(MogileError::sink_io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sink persisted {} of {} received bytes", persisted, stats.bytes),
            )));
        }

        info!(
            "Downloaded {} bytes of {} from {} ({} suspensions)",
            persisted, key, location, stats.suspensions
        );
        Ok(persisted)
    }
}

async fn close_after_failure<S: ByteSink>(sink: &mut S) {
    if let Err(e) = sink.close().await {
        warn!("Failed to close sink after aborted download: {}", e);
    }
}
