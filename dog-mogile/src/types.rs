use bytes::Bytes;
use futures_core::Stream;
use reqwest::Url;
use std::pin::Pin;

use crate::{MogileError, MogileResult};

/// Stream of bytes flowing to or from a storage node
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// One replica of an object on a storage node
///
/// The tracker's text is kept verbatim next to the parsed URL so it can be
/// echoed back unchanged when a transaction is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    raw: String,
    url: Url,
}

impl StorageLocation {
    /// Parse a location handed out by the tracker
    pub fn parse<S: Into<String>>(raw: S) -> MogileResult<Self> {
        let raw = raw.into();
        let url = Url::parse(&raw)
            .map_err(|e| MogileError::protocol(format!("invalid storage location {raw:?}: {e}")))?;
        Ok(Self { raw, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The location exactly as the tracker sent it
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Identifiers of an open create operation
///
/// A transaction is single-use: it is produced by `create_open`, the bytes
/// are streamed to `path`, and the same value is consumed by `create_close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub device_id: String,
    pub file_id: String,
    pub path: StorageLocation,
}

/// Unique identifier attached to every transfer's log span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(uuid::Uuid);

impl TransferId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
