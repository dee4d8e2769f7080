//! Host-side file system registry

use crate::filesystem::{FileCompression, FileHandle, FileLockType, FileSystem};
use crate::{FileOpener, OpenFlags, Result, VfsError};
use tracing::debug;

/// Dispatches paths to registered sub-systems
///
/// Sub-systems are consulted in registration order; the first whose
/// `can_handle_file` accepts a path serves it.
#[derive(Default)]
pub struct VirtualFileSystem {
    subsystems: Vec<Box<dyn FileSystem>>,
}

impl std::fmt::Debug for VirtualFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFileSystem")
            .field("subsystems", &self.subsystem_names())
            .finish()
    }
}

impl VirtualFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sub-system. Registering two with the same name is an error.
    pub fn register_subsystem(&mut self, fs: Box<dyn FileSystem>) -> Result<()> {
        if self.subsystems.iter().any(|s| s.name() == fs.name()) {
            return Err(VfsError::Config(format!(
                "file system '{}' is already registered",
                fs.name()
            )));
        }
        debug!("Registered file system {}", fs.name());
        self.subsystems.push(fs);
        Ok(())
    }

    /// Names of registered sub-systems, in registration order
    pub fn subsystem_names(&self) -> Vec<&str> {
        self.subsystems.iter().map(|s| s.name()).collect()
    }

    /// The sub-system serving `path`.
    pub fn find(&self, path: &str) -> Result<&dyn FileSystem> {
        self.subsystems
            .iter()
            .find(|s| s.can_handle_file(path))
            .map(|s| s.as_ref())
            .ok_or_else(|| {
                VfsError::Unsupported(format!("no file system registered for '{}'", path))
            })
    }

    pub fn can_handle_file(&self, path: &str) -> bool {
        self.find(path).is_ok()
    }

    pub fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        lock: FileLockType,
        compression: FileCompression,
        opener: Option<&dyn FileOpener>,
    ) -> Result<Box<dyn FileHandle>> {
        self.find(path)?
            .open_file(path, flags, lock, compression, opener)
    }

    /// Unhandled paths report `false`.
    pub fn file_exists(&self, path: &str, opener: Option<&dyn FileOpener>) -> bool {
        self.find(path)
            .map(|fs| fs.file_exists(path, opener))
            .unwrap_or(false)
    }

    pub fn glob(&self, pattern: &str, opener: Option<&dyn FileOpener>) -> Result<Vec<String>> {
        self.find(pattern)?.glob(pattern, opener)
    }
}
