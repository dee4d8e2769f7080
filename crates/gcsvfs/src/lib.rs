//! # gcsvfs
//!
//! Read-only virtual file system adapter for Google Cloud Storage. Objects
//! named by `gs://bucket/key` URLs are exposed through synchronous
//! file-handle operations, so code written against random-access files can
//! read remote objects unchanged.
//!
//! ## Architecture
//!
//! - [`ParsedUrl`]: splits a URL into bucket, scheme prefix and key
//! - [`RemoteObjectHandle`]: one open object: size, cursor and an owned
//!   read buffer
//! - buffered range reads on the handle: small reads are served from a
//!   window refilled one `buffer_size` at a time, large reads bypass it
//! - [`GcsFileSystem`]: the [`FileSystem`] surface a host dispatches to
//! - [`VirtualFileSystem`]: explicit registry a host registers sub-systems with
//!
//! Backend calls go through a [`BlobClient`] built by a
//! [`CredentialProvider`]. The stock client uses `object_store` and blocks
//! on an internal Tokio runtime.

#![warn(missing_debug_implementations)]

mod buffer;
mod client;
mod config;
mod error;
mod filesystem;
mod handle;
mod provider;
mod reader;
mod registry;
mod runtime;
mod url;

use std::sync::Arc;

pub use client::{BlobClient, ObjectProperties, ObjectStoreClient};
pub use config::{
    parse_size, settings, Authentication, Config, FileOpener, ReadOptions, DEFAULT_BUFFER_SIZE,
    DEFAULT_TRANSFER_CHUNK_SIZE, DEFAULT_TRANSFER_CONCURRENCY,
};
pub use error::{Result, VfsError};
pub use filesystem::{FileCompression, FileHandle, FileLockType, FileSystem, GcsFileSystem};
pub use handle::{OpenFlags, RemoteObjectHandle};
pub use provider::{CredentialProvider, GcsCredentialProvider, ObjectStoreProvider};
pub use registry::VirtualFileSystem;
pub use url::{has_gcs_scheme, parse_url, ParsedUrl, GCS_SCHEME};

/// Register a [`GcsFileSystem`] backed by `provider` with the host registry.
pub fn register(vfs: &mut VirtualFileSystem, provider: Arc<dyn CredentialProvider>) -> Result<()> {
    vfs.register_subsystem(Box::new(GcsFileSystem::new(provider)))
}
