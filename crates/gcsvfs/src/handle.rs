//! Open remote objects

use crate::buffer::ReadBuffer;
use crate::client::BlobClient;
use crate::{Authentication, CredentialProvider, ParsedUrl, ReadOptions, Result, VfsError};
use chrono::{DateTime, Utc};
use std::ops::{BitOr, BitOrAssign, Range};
use tracing::debug;

/// Flags a file is opened with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OpenFlags(u8);

impl OpenFlags {
    /// Open for reading; allocates the read buffer
    pub const READ: Self = Self(1 << 0);
    /// Open for writing; always rejected
    pub const WRITE: Self = Self(1 << 1);
    /// Disable buffering, every read is an exact range fetch
    pub const DIRECT_IO: Self = Self(1 << 2);

    /// No flags set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bit representation
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every flag in `other` is also set in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One open remote object
///
/// Size and modification time are probed once at open and never refreshed.
/// The handle owns its read buffer and backend client; it is not meant to be
/// shared between threads, which `&mut self` on every read enforces.
#[derive(Debug)]
pub struct RemoteObjectHandle {
    path: String,
    bucket: String,
    key: String,
    flags: OpenFlags,
    length: u64,
    last_modified: DateTime<Utc>,
    read_options: ReadOptions,
    /// Current logical offset
    pub(crate) cursor: u64,
    pub(crate) buffer: ReadBuffer,
    /// `None` once closed
    pub(crate) client: Option<Box<dyn BlobClient>>,
}

impl RemoteObjectHandle {
    /// Open `path`, building the backend client through `provider`.
    ///
    /// # Errors
    /// `InvalidUrl` for a malformed path, `Unsupported` for write flags,
    /// `RemoteIo` when the metadata probe fails.
    pub fn open(
        path: &str,
        flags: OpenFlags,
        auth: &Authentication,
        read_options: ReadOptions,
        provider: &dyn CredentialProvider,
    ) -> Result<Self> {
        let url = Self::check_open(path, flags, &read_options)?;
        let client = provider.client(&url, auth, &read_options)?;
        Self::probe(path, url, flags, read_options, client)
    }

    /// Open `path` using an already built client.
    pub fn open_with_client(
        path: &str,
        flags: OpenFlags,
        read_options: ReadOptions,
        client: Box<dyn BlobClient>,
    ) -> Result<Self> {
        let url = Self::check_open(path, flags, &read_options)?;
        Self::probe(path, url, flags, read_options, client)
    }

    fn check_open(path: &str, flags: OpenFlags, read_options: &ReadOptions) -> Result<ParsedUrl> {
        let url = ParsedUrl::parse(path)?;
        if flags.contains(OpenFlags::WRITE) {
            return Err(VfsError::Unsupported("write".to_string()));
        }
        read_options.validate()?;
        Ok(url)
    }

    fn probe(
        path: &str,
        url: ParsedUrl,
        flags: OpenFlags,
        read_options: ReadOptions,
        client: Box<dyn BlobClient>,
    ) -> Result<Self> {
        let properties = client.properties().map_err(|e| {
            debug!("Open of '{}' failed during metadata probe: {}", path, e);
            e
        })?;

        let buffer = if flags.contains(OpenFlags::READ) {
            ReadBuffer::new(read_options.buffer_size)
        } else {
            ReadBuffer::new(0)
        };

        debug!(
            "Opened '{}' ({} bytes, buffer {} bytes)",
            path,
            properties.size,
            buffer.capacity()
        );

        Ok(Self {
            path: path.to_string(),
            bucket: url.bucket,
            key: url.key,
            flags,
            length: properties.size,
            last_modified: properties.last_modified,
            read_options,
            cursor: 0,
            buffer,
            client: Some(client),
        })
    }

    /// The URL this handle was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Object size in bytes, as probed at open
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Modification time, as probed at open
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Current logical offset
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Object range currently held in the read buffer
    pub fn buffer_window(&self) -> Range<u64> {
        self.buffer.window()
    }

    pub fn read_options(&self) -> &ReadOptions {
        &self.read_options
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    /// Release the backend client and the read buffer. Safe to call twice.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("Closed '{}'", self.path);
        }
        self.buffer.release();
    }

    pub(crate) fn closed_error(&self) -> VfsError {
        VfsError::PreconditionViolation(format!("file handle for '{}' is closed", self.path))
    }
}
