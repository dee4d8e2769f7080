//! Helper utilities for gcsvfs testing

use anyhow::{ensure, Result};
use gcsvfs::FileHandle;

/// Runs a read plan against a handle and reassembles the object.
///
/// Each `(offset, length)` request is issued with `read_at`; the result is
/// placed at its offset, so plans may be issued in any order.
pub fn read_with_plan(
    handle: &mut dyn FileHandle,
    plan: &[(u64, u64)],
) -> Result<Vec<u8>> {
    let mut assembled = vec![0u8; handle.file_size() as usize];

    for &(offset, len) in plan {
        let start = offset as usize;
        let end = start + len as usize;
        ensure!(end <= assembled.len(), "request {offset}+{len} past end");

        handle.read_at(&mut assembled[start..end], offset)?;
        ensure!(
            handle.position() == offset + len,
            "cursor at {} after reading {offset}+{len}",
            handle.position()
        );
    }

    Ok(assembled)
}

/// Reads a handle from its current position to the end in `chunk` sized reads
pub fn read_to_end_in_chunks(handle: &mut dyn FileHandle, chunk: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];

    loop {
        let n = handle.read_next(&mut buf)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }

    Ok(out)
}
