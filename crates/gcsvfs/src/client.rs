//! Backend client abstraction
//!
//! A [`BlobClient`] is bound to one object and can do two things: probe its
//! metadata and fetch an exact byte range. Retries, timeouts and connection
//! pooling live inside the implementation, not in the reader.

use crate::runtime::block_on;
use crate::{ReadOptions, Result, VfsError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::trace;

/// Result of a metadata probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectProperties {
    /// Object size in bytes
    pub size: u64,
    /// Last modification time reported by the store
    pub last_modified: DateTime<Utc>,
}

/// Client for a single remote object
pub trait BlobClient: Send + std::fmt::Debug {
    /// Fetch size and modification time without transferring content.
    fn properties(&self) -> Result<ObjectProperties>;

    /// Fetch exactly `out.len()` bytes starting at `offset` into `out`.
    fn read_range(&self, offset: u64, out: &mut [u8]) -> Result<()>;
}

/// [`BlobClient`] backed by an [`ObjectStore`]
#[derive(Debug)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    path: ObjectPath,
    options: ReadOptions,
}

impl ObjectStoreClient {
    /// Bind a client to `key` inside `store`.
    ///
    /// The key is parsed as-is; keys the store cannot represent (empty
    /// segments, `..`) are rejected as invalid URLs.
    pub fn new(store: Arc<dyn ObjectStore>, key: &str, options: ReadOptions) -> Result<Self> {
        let path = ObjectPath::parse(key)
            .map_err(|source| VfsError::from(object_store::Error::InvalidPath { source }))?;
        Ok(Self {
            store,
            path,
            options,
        })
    }

    /// The object path inside the store.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }
}

impl BlobClient for ObjectStoreClient {
    fn properties(&self) -> Result<ObjectProperties> {
        let store = self.store.clone();
        let path = self.path.clone();
        let meta = block_on(async move { store.head(&path).await })??;
        Ok(ObjectProperties {
            size: meta.size as u64,
            last_modified: meta.last_modified,
        })
    }

    fn read_range(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let chunk_size = self.options.transfer_chunk_size.max(1);
        let start = range_start(offset)?;
        let mut filled = 0;

        // One request per transfer chunk, issued in order.
        while filled < out.len() {
            let len = chunk_size.min(out.len() - filled);
            let range = start + filled..start + filled + len;
            trace!("get_range {} {:?}", self.path, range);

            let store = self.store.clone();
            let path = self.path.clone();
            let request = range.clone();
            let data: Bytes =
                block_on(async move { store.get_range(&path, request).await })??;
            if data.len() != len {
                return Err(VfsError::remote(
                    "ShortRead",
                    "Partial Content",
                    format!(
                        "expected {} bytes for range {:?} of {}, got {}",
                        len,
                        range,
                        self.path,
                        data.len()
                    ),
                ));
            }

            out[filled..filled + len].copy_from_slice(&data);
            filled += len;
        }

        Ok(())
    }
}

/// Offsets the store addresses with `usize`; larger ones cannot be requested.
fn range_start(offset: u64) -> Result<usize> {
    usize::try_from(offset).map_err(|_| {
        VfsError::PreconditionViolation(format!(
            "offset {} is not addressable on this platform",
            offset
        ))
    })
}
