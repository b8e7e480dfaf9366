use std::io;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::CONTENT_LENGTH;

use crate::{ByteStream, HttpConfig, MogileError, MogileResult, StorageLocation};

/// Byte transport to and from storage nodes
///
/// Timeouts and connection reuse belong to the implementation; callers
/// only see a body stream for reads and a length-declared body for writes.
#[async_trait]
pub trait StorageTransport: Send + Sync {
    /// Start reading a replica; the stream ends at the end of the object
    async fn get(&self, location: &StorageLocation) -> MogileResult<ByteStream>;

    /// Write exactly `content_length` bytes and wait for the node's answer
    async fn put(
        &self,
        location: &StorageLocation,
        content_length: u64,
        body: ByteStream,
    ) -> MogileResult<()>;
}

/// Plain HTTP GET/PUT against storage nodes
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with its own connection pool
    pub fn new(config: &HttpConfig) -> MogileResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(MogileError::transport)?;
        Ok(Self { client })
    }

    /// Reuse an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageTransport for HttpTransport {
    async fn get(&self, location: &StorageLocation) -> MogileResult<ByteStream> {
        let response = self
            .client
            .get(location.url().clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(MogileError::transport)?;

        let stream = response
            .bytes_stream()
            .map_err(io::Error::other);
        Ok(Box::pin(stream))
    }

    async fn put(
        &self,
        location: &StorageLocation,
        content_length: u64,
        body: ByteStream,
    ) -> MogileResult<()> {
        self.client
            .put(location.url().clone())
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(MogileError::transport)?;
        Ok(())
    }
}
