use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;

use crate::ByteStream;

/// Local content to upload, with a size known before streaming starts
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Total number of bytes `open` will yield
    async fn size(&self) -> io::Result<u64>;

    async fn open(&self) -> io::Result<ByteStream>;
}

/// Uploads a local file in fixed-size reads
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    chunk_size: usize,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P, chunk_size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn size(&self) -> io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    async fn open(&self) -> io::Result<ByteStream> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        let chunk_size = self.chunk_size;
        let stream = async_stream::stream! {
            loop {
                match read_chunk(&mut file, chunk_size).await {
                    Ok(chunk) if chunk.is_empty() => break,
                    Ok(chunk) => yield Ok(chunk),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

/// Read up to `chunk_size` bytes, short only at end of file
async fn read_chunk(file: &mut tokio::fs::File, chunk_size: usize) -> io::Result<Bytes> {
    let mut buf = BytesMut::with_capacity(chunk_size);
    while buf.len() < chunk_size {
        let remaining = (chunk_size - buf.len()) as u64;
        if (&mut *file).take(remaining).read_buf(&mut buf).await? == 0 {
            break;
        }
    }
    Ok(buf.freeze())
}

/// Uploads an in-memory buffer
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    chunk_size: usize,
}

impl MemorySource {
    pub fn new<B: Into<Bytes>>(data: B, chunk_size: usize) -> Self {
        Self {
            data: data.into(),
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn size(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    async fn open(&self) -> io::Result<ByteStream> {
        let data = self.data.clone();
        let chunk_size = self.chunk_size;
        let stream = async_stream::stream! {
            let mut offset = 0;
            while offset < data.len() {
                let end = (offset + chunk_size).min(data.len());
                yield Ok(data.slice(offset..end));
                offset = end;
            }
        };
        Ok(Box::pin(stream))
    }
}
