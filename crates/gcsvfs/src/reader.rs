//! Buffered range reads
//!
//! Every read is resolved against the handle's buffer window:
//! - with `DIRECT_IO` the exact range is fetched and nothing is buffered;
//! - a read starting inside the window is served from it;
//! - when the window runs dry the rest of the request is either fetched
//!   straight into the caller's buffer (if it is larger than one window) or
//!   the window is refilled from the cursor and copying continues.
//!
//! Seeking only moves the cursor; whether the window is still useful is
//! decided by the next read.

use crate::handle::{OpenFlags, RemoteObjectHandle};
use crate::{Result, VfsError};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

impl RemoteObjectHandle {
    /// Read up to `buf.len()` bytes at the cursor.
    ///
    /// Requests running past the end of the object are truncated. Returns the
    /// number of bytes written into `buf`; zero at end of object.
    pub fn read_sequential(&mut self, buf: &mut [u8]) -> Result<usize> {
        let max_read = self.length().saturating_sub(self.cursor);
        let nr_bytes = (buf.len() as u64).min(max_read) as usize;
        let location = self.cursor;

        self.read_at(&mut buf[..nr_bytes], location)?;
        Ok(nr_bytes)
    }

    /// Fill `buf` with the bytes at `[location, location + buf.len())` and
    /// leave the cursor just after them.
    ///
    /// # Errors
    /// `PreconditionViolation` if the range extends past the end of the
    /// object, the handle was not opened for reading, or it is closed.
    /// Backend failures surface as `RemoteIo`.
    pub fn read_at(&mut self, buf: &mut [u8], location: u64) -> Result<()> {
        let nr_bytes = buf.len();
        self.check_readable(nr_bytes, location)?;

        if self.flags().contains(OpenFlags::DIRECT_IO) && nr_bytes > 0 {
            trace!("direct read of {} bytes at {} from '{}'", nr_bytes, location, self.path());
            self.fetch(location, buf)?;
            self.buffer.invalidate();
            self.cursor = location + nr_bytes as u64;
            return Ok(());
        }

        if self.buffer.contains(location) {
            trace!("read at {} served from window {:?}", location, self.buffer.window());
            self.buffer.reposition(location);
        } else {
            self.buffer.invalidate();
        }
        self.cursor = location;

        let mut buffer_offset = 0;
        while buffer_offset < nr_bytes {
            let copied = self.buffer.take_into(&mut buf[buffer_offset..]);
            buffer_offset += copied;
            self.cursor += copied as u64;

            let to_read = nr_bytes - buffer_offset;
            if to_read == 0 || self.buffer.available() > 0 {
                continue;
            }

            let refill_size =
                (self.read_options().buffer_size as u64).min(self.length() - self.cursor) as usize;

            if to_read > refill_size {
                // Requests larger than a window go straight into the caller buffer.
                debug!(
                    "bypassing buffer for {} bytes at {} of '{}'",
                    to_read,
                    self.cursor,
                    self.path()
                );
                let start = self.cursor;
                self.fetch(start, &mut buf[buffer_offset..])?;
                self.buffer.invalidate();
                self.cursor += to_read as u64;
                break;
            }

            self.refill(refill_size)?;
        }

        Ok(())
    }

    /// Move the cursor to `location` without touching the buffer.
    pub fn seek_to(&mut self, location: u64) {
        self.cursor = location;
    }

    fn check_readable(&self, nr_bytes: usize, location: u64) -> Result<()> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        if !self.flags().contains(OpenFlags::READ) {
            return Err(VfsError::PreconditionViolation(format!(
                "'{}' was not opened for reading",
                self.path()
            )));
        }
        if nr_bytes > 0 {
            let end = location.checked_add(nr_bytes as u64);
            if end.map_or(true, |end| end > self.length()) {
                return Err(VfsError::PreconditionViolation(format!(
                    "read of {} bytes at offset {} exceeds length {} of '{}'",
                    nr_bytes,
                    location,
                    self.length(),
                    self.path()
                )));
            }
        }
        Ok(())
    }

    /// Fetch straight into `out`, bypassing the buffer.
    fn fetch(&self, location: u64, out: &mut [u8]) -> Result<()> {
        let client = self.client.as_deref().ok_or_else(|| self.closed_error())?;
        client.read_range(location, out)
    }

    /// Replace the window with `len` bytes starting at the cursor.
    fn refill(&mut self, len: usize) -> Result<()> {
        let start = self.cursor;
        debug!("refilling buffer with {} bytes at {} of '{}'", len, start, self.path());

        let Some(client) = self.client.as_deref() else {
            return Err(self.closed_error());
        };
        client.read_range(start, self.buffer.fill_slot(len))?;
        self.buffer.filled(start, len);
        Ok(())
    }
}

impl Read for RemoteObjectHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_sequential(buf)?)
    }
}

impl Seek for RemoteObjectHandle {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let size = self.length();
        let new_pos = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => size.checked_add_signed(offset),
            SeekFrom::Current(offset) => self.cursor.checked_add_signed(offset),
        };

        let new_pos = match new_pos {
            Some(p) if p <= size => p,
            Some(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Cannot seek beyond end of file",
                ))
            }
            None => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Cannot seek before start of file",
                ))
            }
        };

        self.seek_to(new_pos);
        Ok(new_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BlobClient, ObjectProperties};
    use crate::ReadOptions;
    use chrono::Utc;
    use std::ops::Range;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct StubClient {
        data: Vec<u8>,
        fetches: Arc<Mutex<Vec<Range<u64>>>>,
    }

    impl BlobClient for StubClient {
        fn properties(&self) -> Result<ObjectProperties> {
            Ok(ObjectProperties {
                size: self.data.len() as u64,
                last_modified: Utc::now(),
            })
        }

        fn read_range(&self, offset: u64, out: &mut [u8]) -> Result<()> {
            let start = offset as usize;
            out.copy_from_slice(&self.data[start..start + out.len()]);
            self.fetches
                .lock()
                .unwrap()
                .push(offset..offset + out.len() as u64);
            Ok(())
        }
    }

    fn open(
        len: usize,
        buffer_size: usize,
        flags: OpenFlags,
    ) -> (RemoteObjectHandle, Vec<u8>, Arc<Mutex<Vec<Range<u64>>>>) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let fetches = Arc::new(Mutex::new(Vec::new()));
        let client = StubClient {
            data: data.clone(),
            fetches: fetches.clone(),
        };
        let options = ReadOptions {
            buffer_size,
            ..Default::default()
        };
        let handle =
            RemoteObjectHandle::open_with_client("gs://bucket/obj", flags, options, Box::new(client))
                .unwrap();
        (handle, data, fetches)
    }

    #[test]
    fn test_small_reads_share_one_fetch() {
        let (mut handle, data, fetches) = open(1000, 100, OpenFlags::READ);

        let mut out = [0u8; 10];
        for i in 0..10 {
            handle.read_sequential(&mut out).unwrap();
            assert_eq!(&out[..], &data[i * 10..i * 10 + 10]);
        }

        assert_eq!(*fetches.lock().unwrap(), vec![0..100]);
        assert_eq!(handle.cursor(), 100);
    }

    #[test]
    fn test_read_spanning_windows() {
        let (mut handle, data, fetches) = open(1000, 100, OpenFlags::READ);

        let mut out = [0u8; 60];
        handle.read_at(&mut out, 70).unwrap();
        assert_eq!(&out[..], &data[70..130]);
        assert_eq!(*fetches.lock().unwrap(), vec![70..170]);

        handle.read_at(&mut out, 100).unwrap();
        assert_eq!(&out[..], &data[100..160]);
        assert_eq!(fetches.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_large_read_bypasses_buffer() {
        let (mut handle, data, fetches) = open(1000, 100, OpenFlags::READ);

        let mut out = vec![0u8; 250];
        handle.read_at(&mut out, 500).unwrap();
        assert_eq!(out, &data[500..750]);
        assert_eq!(*fetches.lock().unwrap(), vec![500..750]);
        assert_eq!(handle.buffer_window(), 0..0);
        assert_eq!(handle.cursor(), 750);
    }

    #[test]
    fn test_direct_io_fetches_exact_range() {
        let (mut handle, data, fetches) = open(1000, 100, OpenFlags::READ | OpenFlags::DIRECT_IO);

        let mut out = [0u8; 5];
        handle.read_at(&mut out, 10).unwrap();
        handle.read_at(&mut out, 12).unwrap();
        assert_eq!(&out[..], &data[12..17]);
        assert_eq!(*fetches.lock().unwrap(), vec![10..15, 12..17]);
        assert_eq!(handle.cursor(), 17);
    }

    #[test]
    fn test_read_sequential_truncates_at_end() {
        let (mut handle, data, _) = open(50, 16, OpenFlags::READ);
        handle.seek_to(45);

        let mut out = [0u8; 20];
        let n = handle.read_sequential(&mut out).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&out[..5], &data[45..50]);
        assert_eq!(handle.read_sequential(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_read_at_past_end_is_rejected() {
        let (mut handle, _, fetches) = open(50, 16, OpenFlags::READ);
        let mut out = [0u8; 10];
        let err = handle.read_at(&mut out, 45).unwrap_err();
        assert!(matches!(err, VfsError::PreconditionViolation(_)));
        assert!(fetches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_seek_is_lazy() {
        let (mut handle, data, fetches) = open(1000, 100, OpenFlags::READ);
        let mut out = [0u8; 4];
        handle.read_sequential(&mut out).unwrap();

        handle.seek_to(900);
        assert_eq!(handle.buffer_window(), 0..100);
        handle.seek_to(50);
        handle.read_sequential(&mut out).unwrap();
        assert_eq!(&out[..], &data[50..54]);
        assert_eq!(fetches.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_not_opened_for_reading() {
        let (mut handle, _, _) = open(10, 4, OpenFlags::empty());
        let mut out = [0u8; 1];
        assert!(matches!(
            handle.read_at(&mut out, 0),
            Err(VfsError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_closed_handle() {
        let (mut handle, _, _) = open(10, 4, OpenFlags::READ);
        handle.close();
        handle.close();
        assert!(handle.is_closed());
        let mut out = [0u8; 1];
        assert!(matches!(
            handle.read_at(&mut out, 0),
            Err(VfsError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_io_traits() {
        let (mut handle, data, _) = open(300, 64, OpenFlags::READ);

        let mut all = Vec::new();
        handle.read_to_end(&mut all).unwrap();
        assert_eq!(all, data);

        assert_eq!(handle.seek(SeekFrom::End(-10)).unwrap(), 290);
        let mut tail = [0u8; 10];
        handle.read_exact(&mut tail).unwrap();
        assert_eq!(&tail[..], &data[290..]);

        assert_eq!(handle.seek(SeekFrom::Current(-20)).unwrap(), 280);
        assert!(handle.seek(SeekFrom::Current(-1000)).is_err());
        assert!(handle.seek(SeekFrom::Start(301)).is_err());
    }
}
