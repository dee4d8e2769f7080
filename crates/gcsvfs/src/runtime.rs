//! Tokio runtime management for synchronous operations

use crate::{Result, VfsError};
use std::future::Future;
use std::sync::{mpsc, Arc, OnceLock};
use tokio::runtime::Runtime;

static RUNTIME: OnceLock<std::result::Result<Arc<Runtime>, String>> = OnceLock::new();

/// Get or create the shared Tokio runtime used to drive backend calls
pub(crate) fn get_runtime() -> Result<Arc<Runtime>> {
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .thread_name("gcsvfs-io")
                .build()
                .map(Arc::new)
                .map_err(|e| format!("Failed to create Tokio runtime: {}", e))
        })
        .clone()
        .map_err(VfsError::Runtime)
}

/// Run `future` on the shared runtime and block the calling thread until it
/// completes.
///
/// The future never runs on the caller's thread, so this works from plain
/// threads, `spawn_blocking` threads and the host's own runtime alike.
pub(crate) fn block_on<F>(future: F) -> Result<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    get_runtime()?.spawn(async move {
        // The receiver only goes away if the caller is gone.
        let _ = tx.send(future.await);
    });

    rx.recv()
        .map_err(|_| VfsError::Runtime("backend task ended without a result".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_plain_thread() {
        assert_eq!(block_on(async { 40 + 2 }).unwrap(), 42);
    }

    #[test]
    fn test_block_on_from_spawn_blocking() {
        let host = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();

        let value = host
            .block_on(host.spawn_blocking(|| block_on(async { 7 })))
            .unwrap()
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_block_on_inside_host_runtime() {
        let host = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        let value = host.block_on(async { block_on(async { "done" }) }).unwrap();
        assert_eq!(value, "done");
    }

    #[test]
    fn test_panicking_task_is_reported() {
        let err = block_on(async { panic!("backend blew up") }).map(|()| ()).unwrap_err();
        assert!(matches!(err, VfsError::Runtime(_)));
    }
}
