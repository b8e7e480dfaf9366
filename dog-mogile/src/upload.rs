use std::io;
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::{
    ByteSource, ByteStream, MogileError, MogileResult, StorageTransport, TransactionCoordinator,
    TransferId,
};

/// Streams local content to a storage node inside a create transaction
///
/// Backpressure on this path is left to the transport: the body stream is
/// only polled as fast as the connection accepts bytes.
#[derive(Clone)]
pub struct Uploader {
    transactions: TransactionCoordinator,
    transport: Arc<dyn StorageTransport>,
}

impl Uploader {
    pub fn new(transactions: TransactionCoordinator, transport: Arc<dyn StorageTransport>) -> Self {
        Self {
            transactions,
            transport,
        }
    }

    /// Upload `source` under `key`, returning the size declared to the node
    ///
    /// If the storage node accepted the bytes but the tracker refused to
    /// commit them, the result is [`MogileError::UncommittedUpload`]; the
    /// replica is left where it is.
    #[instrument(skip(self, source), fields(transfer_id = %TransferId::new()))]
    pub async fn upload<S: ByteSource + ?Sized>(
        &self,
        key: &str,
        class: Option<&str>,
        source: &S,
    ) -> MogileResult<u64> {
        let transaction = self.transactions.open_create(key, class).await?;

        let size = source.size().await.map_err(MogileError::source_io)?;
        let body = source.open().await.map_err(MogileError::source_io)?;
        let (body, source_failure) = watch_source(body);

        if let Err(e) = self.transport.put(&transaction.path, size, body).await {
            if let Some(cause) = source_failure.lock().take() {
                return Err(MogileError::source_io(cause));
            }
            return Err(e);
        }

        let path = transaction.path.clone();
        if let Err(e) = self.transactions.close_create(key, class, transaction).await {
            warn!(
                "Storage node at {} holds {} uncommitted bytes for {}: {}",
                path, size, key, e
            );
            return Err(MogileError::UncommittedUpload {
                key: key.to_string(),
                source: Box::new(e),
            });
        }

        info!("Uploaded {} bytes of {} to {}", size, key, path);
        Ok(size)
    }
}

/// Remember the source's own read error so it is not mistaken for a
/// network failure once the transport aborts the request.
fn watch_source(body: ByteStream) -> (ByteStream, Arc<Mutex<Option<io::Error>>>) {
    let slot = Arc::new(Mutex::new(None));
    let recorder = slot.clone();
    let body = body.map(move |item| {
        item.map_err(|e| {
            let forwarded = io::Error::new(e.kind(), e.to_string());
            *recorder.lock() = Some(e);
            forwarded
        })
    });
    (Box::pin(body), slot)
}
