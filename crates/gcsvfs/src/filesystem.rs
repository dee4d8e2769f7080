//! Virtual file system surface
//!
//! [`FileSystem`] is what a host engine talks to; [`FileHandle`] is the
//! readable and seekable capability behind each open file.
//! [`GcsFileSystem`] implements both for `gs://` URLs.

use crate::provider::{CredentialProvider, GcsCredentialProvider};
use crate::url::has_gcs_scheme;
use crate::{
    Authentication, FileOpener, OpenFlags, ReadOptions, RemoteObjectHandle, Result, VfsError,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, trace};

/// Compression a host may request when opening a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileCompression {
    /// Plain bytes
    #[default]
    Uncompressed,
    /// Detect from the file name
    Auto,
    Gzip,
    Zstd,
}

/// Lock a host may request when opening a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileLockType {
    #[default]
    NoLock,
    ReadLock,
    WriteLock,
}

/// An open file
pub trait FileHandle: Send + std::fmt::Debug {
    /// Path the file was opened with
    fn path(&self) -> &str;

    /// Read at the current position, truncated at end of file.
    fn read_next(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read exactly `buf.len()` bytes at `location`.
    fn read_at(&mut self, buf: &mut [u8], location: u64) -> Result<()>;

    /// Move the current position.
    fn seek_to(&mut self, location: u64);

    /// Current position
    fn position(&self) -> u64;

    fn file_size(&self) -> u64;

    fn last_modified(&self) -> DateTime<Utc>;

    /// Flush pending writes.
    fn sync(&mut self) -> Result<()>;

    /// Release resources held by the handle.
    fn close(&mut self);
}

impl FileHandle for RemoteObjectHandle {
    fn path(&self) -> &str {
        RemoteObjectHandle::path(self)
    }

    fn read_next(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_sequential(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], location: u64) -> Result<()> {
        RemoteObjectHandle::read_at(self, buf, location)
    }

    fn seek_to(&mut self, location: u64) {
        RemoteObjectHandle::seek_to(self, location)
    }

    fn position(&self) -> u64 {
        self.cursor()
    }

    fn file_size(&self) -> u64 {
        self.length()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        RemoteObjectHandle::last_modified(self)
    }

    fn sync(&mut self) -> Result<()> {
        Err(VfsError::Unsupported("sync".to_string()))
    }

    fn close(&mut self) {
        RemoteObjectHandle::close(self)
    }
}

/// File system operations a host engine dispatches to
pub trait FileSystem: Send + Sync {
    /// Name used in diagnostics and by the registry
    fn name(&self) -> &str;

    /// Open `path`.
    fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        lock: FileLockType,
        compression: FileCompression,
        opener: Option<&dyn FileOpener>,
    ) -> Result<Box<dyn FileHandle>>;

    /// Read at the handle's position.
    fn read(&self, handle: &mut dyn FileHandle, buf: &mut [u8]) -> Result<usize> {
        handle.read_next(buf)
    }

    /// Read at an explicit location.
    fn read_at(&self, handle: &mut dyn FileHandle, buf: &mut [u8], location: u64) -> Result<()> {
        handle.read_at(buf, location)
    }

    fn seek(&self, handle: &mut dyn FileHandle, location: u64) {
        handle.seek_to(location)
    }

    fn file_size(&self, handle: &dyn FileHandle) -> u64 {
        handle.file_size()
    }

    fn last_modified(&self, handle: &dyn FileHandle) -> DateTime<Utc> {
        handle.last_modified()
    }

    fn file_sync(&self, handle: &mut dyn FileHandle) -> Result<()> {
        handle.sync()
    }

    /// True if `path` names a file that exists.
    fn file_exists(&self, path: &str, opener: Option<&dyn FileOpener>) -> bool;

    /// True if this file system serves `path`.
    fn can_handle_file(&self, path: &str) -> bool;

    /// Expand a pattern into matching paths.
    fn glob(&self, pattern: &str, opener: Option<&dyn FileOpener>) -> Result<Vec<String>>;

    fn can_seek(&self) -> bool;

    fn on_disk_file(&self, handle: &dyn FileHandle) -> bool;

    fn is_pipe(&self, path: &str) -> bool;
}

/// Read-only file system over Google Cloud Storage
#[derive(Debug, Clone)]
pub struct GcsFileSystem {
    provider: Arc<dyn CredentialProvider>,
}

impl Default for GcsFileSystem {
    fn default() -> Self {
        Self::new(Arc::new(GcsCredentialProvider))
    }
}

impl GcsFileSystem {
    /// Create a file system whose clients come from `provider`.
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }

    /// Open `path` and return the concrete handle.
    ///
    /// Credentials and read options are resolved from `opener`, falling
    /// back to defaults.
    pub fn open(
        &self,
        path: &str,
        flags: OpenFlags,
        opener: Option<&dyn FileOpener>,
    ) -> Result<RemoteObjectHandle> {
        if flags.contains(OpenFlags::WRITE) {
            return Err(VfsError::Unsupported("write".to_string()));
        }

        let auth = Authentication::from_opener(opener);
        let read_options = ReadOptions::from_opener(opener)?;
        RemoteObjectHandle::open(path, flags, &auth, read_options, self.provider.as_ref())
    }
}

impl FileSystem for GcsFileSystem {
    fn name(&self) -> &str {
        "GCSFileSystem"
    }

    fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        lock: FileLockType,
        compression: FileCompression,
        opener: Option<&dyn FileOpener>,
    ) -> Result<Box<dyn FileHandle>> {
        if compression != FileCompression::Uncompressed {
            return Err(VfsError::PreconditionViolation(format!(
                "only uncompressed objects can be opened, got {:?}",
                compression
            )));
        }
        trace!("ignoring {:?} for '{}'", lock, path);

        let handle = self.open(path, flags, opener)?;
        Ok(Box::new(handle))
    }

    /// Any failure to open, including permission and network errors,
    /// reports `false`. Zero-length objects also report `false`.
    fn file_exists(&self, path: &str, opener: Option<&dyn FileOpener>) -> bool {
        match self.open(path, OpenFlags::READ, opener) {
            Ok(handle) => handle.length() != 0,
            Err(e) => {
                debug!("'{}' treated as missing: {}", path, e);
                false
            }
        }
    }

    fn can_handle_file(&self, path: &str) -> bool {
        has_gcs_scheme(path)
    }

    fn glob(&self, _pattern: &str, _opener: Option<&dyn FileOpener>) -> Result<Vec<String>> {
        Err(VfsError::Unsupported("glob".to_string()))
    }

    fn can_seek(&self) -> bool {
        true
    }

    fn on_disk_file(&self, _handle: &dyn FileHandle) -> bool {
        false
    }

    fn is_pipe(&self, _path: &str) -> bool {
        false
    }
}
