use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::{
    ByteSource, ClientConfig, Downloader, FileSource, FileTarget, HttpTransport, KeyOps,
    MemorySource, MemoryTarget, MogileResult, PathResolver, SinkTarget, StorageLocation,
    StorageTransport, Tracker, TransactionCoordinator, Uploader,
};

/// A named key space, bound to a tracker and a storage transport
///
/// This is what applications hold on to. Every component it hands out
/// shares the same tracker handle; nothing here is process-global.
#[derive(Clone)]
pub struct Domain {
    name: String,
    resolver: PathResolver,
    downloader: Downloader,
    uploader: Uploader,
    keys: KeyOps,
    config: ClientConfig,
}

impl Domain {
    /// Create a domain handle over explicit collaborators
    pub fn new<S: Into<String>>(
        name: S,
        tracker: Arc<dyn Tracker>,
        transport: Arc<dyn StorageTransport>,
        config: ClientConfig,
    ) -> Self {
        let name = name.into();
        let resolver = PathResolver::new(name.clone(), tracker.clone());
        let downloader = Downloader::new(resolver.clone(), transport.clone())
            .with_verify(config.verify_download_paths);
        let uploader = Uploader::new(
            TransactionCoordinator::new(name.clone(), tracker.clone()),
            transport,
        );
        let keys = KeyOps::new(name.clone(), tracker);

        Self {
            name,
            resolver,
            downloader,
            uploader,
            keys,
            config,
        }
    }

    /// Create a domain handle talking HTTP to storage nodes
    pub fn with_http<S: Into<String>>(
        name: S,
        tracker: Arc<dyn Tracker>,
        config: ClientConfig,
    ) -> MogileResult<Self> {
        let transport = HttpTransport::new(&config.http)?;
        Ok(Self::new(name, tracker, Arc::new(transport), config))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    pub fn keys(&self) -> &KeyOps {
        &self.keys
    }

    /// Where the replicas of `key` live
    pub async fn resolve_paths(&self, key: &str, verify: bool) -> MogileResult<Vec<StorageLocation>> {
        self.resolver.resolve_paths(key, verify).await
    }

    /// Download `key` into a local file, truncating it first
    pub async fn download<P: AsRef<Path>>(&self, key: &str, path: P) -> MogileResult<u64> {
        let target = FileTarget::new(path, self.config.sink_high_water_mark);
        self.downloader.download(key, &target).await
    }

    /// Download `key` into any sink target
    pub async fn download_to<T: SinkTarget>(&self, key: &str, target: &T) -> MogileResult<u64> {
        self.downloader.download(key, target).await
    }

    /// Download `key` into memory
    pub async fn fetch_bytes(&self, key: &str) -> MogileResult<Bytes> {
        let target = MemoryTarget::new();
        self.downloader.download(key, &target).await?;
        Ok(target.take())
    }

    /// Upload a local file under `key`
    pub async fn upload<P: AsRef<Path>>(
        &self,
        key: &str,
        class: Option<&str>,
        path: P,
    ) -> MogileResult<u64> {
        let source = FileSource::new(path, self.config.chunk_size);
        self.uploader.upload(key, class, &source).await
    }

    /// Upload from any byte source
    pub async fn upload_from<S: ByteSource + ?Sized>(
        &self,
        key: &str,
        class: Option<&str>,
        source: &S,
    ) -> MogileResult<u64> {
        self.uploader.upload(key, class, source).await
    }

    /// Upload an in-memory buffer under `key`
    pub async fn store_bytes<B: Into<Bytes>>(
        &self,
        key: &str,
        class: Option<&str>,
        data: B,
    ) -> MogileResult<u64> {
        let source = MemorySource::new(data, self.config.chunk_size);
        self.uploader.upload(key, class, &source).await
    }

    pub async fn delete(&self, key: &str, class: Option<&str>) -> MogileResult<()> {
        self.keys.delete(key, class).await
    }

    pub async fn rename(&self, from_key: &str, to_key: &str) -> MogileResult<()> {
        self.keys.rename(from_key, to_key).await
    }

    pub async fn list_keys(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: Option<u32>,
    ) -> MogileResult<Vec<String>> {
        self.keys.list_keys(prefix, after, limit).await
    }
}
