use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    tracker::{args, Tracker},
    MogileError, MogileResult, StorageLocation, Transaction,
};

/// Opens and commits create transactions with the tracker
///
/// The value returned by [`open_create`](Self::open_create) must be handed
/// to [`close_create`](Self::close_create) exactly once, after the bytes
/// have been streamed to its path and acknowledged by the storage node.
#[derive(Clone)]
pub struct TransactionCoordinator {
    domain: String,
    tracker: Arc<dyn Tracker>,
}

impl TransactionCoordinator {
    pub fn new<S: Into<String>>(domain: S, tracker: Arc<dyn Tracker>) -> Self {
        Self {
            domain: domain.into(),
            tracker,
        }
    }

    /// Open a create transaction, obtaining the target location
    #[instrument(skip(self), fields(domain = %self.domain))]
    pub async fn open_create(&self, key: &str, class: Option<&str>) -> MogileResult<Transaction> {
        let request = args([
            ("key", Some(key.to_string())),
            ("class", class.map(str::to_string)),
        ]);
        let response = self
            .tracker
            .send(&self.domain, "create_open", &request)
            .await
            .map_err(|e| MogileError::from_tracker("create_open", None, e))?;

        let transaction = Transaction {
            device_id: response.require("devid")?.to_string(),
            file_id: response.require("fid")?.to_string(),
            path: StorageLocation::parse(response.require("path")?)?,
        };
        debug!(
            "Opened create for {}: fid={} devid={} path={}",
            key, transaction.file_id, transaction.device_id, transaction.path
        );
        Ok(transaction)
    }

    /// Commit a transaction, echoing the identifiers from `open_create`
    #[instrument(skip(self, transaction), fields(domain = %self.domain, fid = %transaction.file_id))]
    pub async fn close_create(
        &self,
        key: &str,
        class: Option<&str>,
        transaction: Transaction,
    ) -> MogileResult<()> {
        let request = args([
            ("key", Some(key.to_string())),
            ("class", class.map(str::to_string)),
            ("devid", Some(transaction.device_id)),
            ("fid", Some(transaction.file_id)),
            ("path", Some(transaction.path.as_str().to_string())),
        ]);
        self.tracker
            .send(&self.domain, "create_close", &request)
            .await
            .map_err(|e| MogileError::from_tracker("create_close", None, e))?;
        Ok(())
    }
}
