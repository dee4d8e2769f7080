//! Testing utilities and fixtures for gcsvfs
//!
//! [`MockStore`] is an in-memory bucket that records every metadata probe and
//! range fetch, so tests can assert exactly how many round trips a read
//! pattern costs. Failures can be injected per object.

use chrono::{DateTime, TimeZone, Utc};
use gcsvfs::{
    Authentication, BlobClient, CredentialProvider, GcsFileSystem, ObjectProperties, ParsedUrl,
    ReadOptions, Result, VfsError,
};
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::TempDir;

pub mod assertions;
pub mod fixtures;
pub mod helpers;

/// A call that reached the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// Metadata probe of the given URL
    Probe(String),
    /// Range fetch of the given URL
    Fetch(String, Range<u64>),
}

#[derive(Debug, Clone)]
struct MockObject {
    data: Arc<Vec<u8>>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Failure {
    code: String,
    reason: String,
    message: String,
}

#[derive(Debug, Default)]
struct MockState {
    objects: HashMap<String, MockObject>,
    failures: HashMap<String, Failure>,
    calls: Vec<BackendCall>,
    opened_with: Vec<(Authentication, ReadOptions)>,
}

/// In-memory bucket shared by every client it hands out
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
}

/// Timestamp given to objects inserted without one
pub fn default_last_modified() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `data` under `url` (`gs://bucket/key`)
    pub fn insert(&self, url: &str, data: impl Into<Vec<u8>>) {
        self.insert_with_time(url, data, default_last_modified());
    }

    /// Store `data` under `url` with an explicit modification time
    pub fn insert_with_time(
        &self,
        url: &str,
        data: impl Into<Vec<u8>>,
        last_modified: DateTime<Utc>,
    ) {
        self.state().objects.insert(
            url.to_string(),
            MockObject {
                data: Arc::new(data.into()),
                last_modified,
            },
        );
    }

    /// Make every call against `url` fail with the given backend error
    pub fn fail_with(&self, url: &str, code: &str, reason: &str, message: &str) {
        self.state().failures.insert(
            url.to_string(),
            Failure {
                code: code.to_string(),
                reason: reason.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Make `url` fail the way a bucket without read permission does
    pub fn deny(&self, url: &str) {
        self.fail_with(
            url,
            "403",
            "Forbidden",
            "caller does not have storage.objects.get access",
        );
    }

    /// Remove an injected failure
    pub fn heal(&self, url: &str) {
        self.state().failures.remove(url);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Ranges fetched so far, in order
    pub fn fetches(&self) -> Vec<Range<u64>> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Fetch(_, range) => Some(range.clone()),
                BackendCall::Probe(_) => None,
            })
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches().len()
    }

    pub fn probe_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Probe(_)))
            .count()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Credentials and options each client was built with
    pub fn opened_with(&self) -> Vec<(Authentication, ReadOptions)> {
        self.state().opened_with.clone()
    }

    /// Credential provider handing out clients of this store
    pub fn provider(&self) -> Arc<MockProvider> {
        Arc::new(MockProvider {
            store: self.clone(),
        })
    }

    /// File system backed by this store
    pub fn file_system(&self) -> GcsFileSystem {
        GcsFileSystem::new(self.provider())
    }

    /// Client bound to `url`, for opening handles directly
    pub fn client(&self, url: &str) -> Box<dyn BlobClient> {
        Box::new(MockClient {
            store: self.clone(),
            url: url.to_string(),
        })
    }

    fn probe(&self, url: &str) -> Result<ObjectProperties> {
        let mut state = self.state();
        state.calls.push(BackendCall::Probe(url.to_string()));

        if let Some(failure) = state.failures.get(url) {
            return Err(failure.to_error());
        }
        let object = state.objects.get(url).ok_or_else(|| not_found(url))?;
        Ok(ObjectProperties {
            size: object.data.len() as u64,
            last_modified: object.last_modified,
        })
    }

    fn fetch(&self, url: &str, offset: u64, out: &mut [u8]) -> Result<()> {
        let mut state = self.state();
        let range = offset..offset + out.len() as u64;
        state.calls.push(BackendCall::Fetch(url.to_string(), range.clone()));

        if let Some(failure) = state.failures.get(url) {
            return Err(failure.to_error());
        }
        let object = state.objects.get(url).ok_or_else(|| not_found(url))?;
        if range.end > object.data.len() as u64 {
            return Err(VfsError::remote(
                "416",
                "Range Not Satisfiable",
                format!("range {:?} outside object of {} bytes", range, object.data.len()),
            ));
        }

        out.copy_from_slice(&object.data[range.start as usize..range.end as usize]);
        Ok(())
    }
}

impl Failure {
    fn to_error(&self) -> VfsError {
        VfsError::remote(self.code.clone(), self.reason.clone(), self.message.clone())
    }
}

fn not_found(url: &str) -> VfsError {
    VfsError::remote("404", "Not Found", format!("No such object: {}", url))
}

/// [`CredentialProvider`] for a [`MockStore`]
#[derive(Debug)]
pub struct MockProvider {
    store: MockStore,
}

impl CredentialProvider for MockProvider {
    fn client(
        &self,
        url: &ParsedUrl,
        auth: &Authentication,
        options: &ReadOptions,
    ) -> Result<Box<dyn BlobClient>> {
        self.store
            .state()
            .opened_with
            .push((auth.clone(), *options));
        Ok(self.store.client(&url.to_url()))
    }
}

/// [`BlobClient`] for one object of a [`MockStore`]
#[derive(Debug)]
pub struct MockClient {
    store: MockStore,
    url: String,
}

impl BlobClient for MockClient {
    fn properties(&self) -> Result<ObjectProperties> {
        self.store.probe(&self.url)
    }

    fn read_range(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        self.store.fetch(&self.url, offset, out)
    }
}

/// Temporary directory holding a gcsvfs configuration file
pub struct TestConfigDir {
    dir: TempDir,
}

impl TestConfigDir {
    /// Creates a new temporary directory
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `content` as `config.toml` and returns its path
    pub fn write_config(&self, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.dir.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_records_calls() {
        let store = MockStore::new();
        store.insert("gs://b/k", b"hello".to_vec());

        let client = store.client("gs://b/k");
        assert_eq!(client.properties().unwrap().size, 5);

        let mut out = [0u8; 3];
        client.read_range(1, &mut out).unwrap();
        assert_eq!(&out, b"ell");

        assert_eq!(
            store.calls(),
            vec![
                BackendCall::Probe("gs://b/k".to_string()),
                BackendCall::Fetch("gs://b/k".to_string(), 1..4),
            ]
        );
    }

    #[test]
    fn test_missing_and_denied() {
        let store = MockStore::new();
        store.insert("gs://b/secret", b"x".to_vec());
        store.deny("gs://b/secret");

        let err = store.client("gs://b/missing").properties().unwrap_err();
        assert!(err.is_not_found());

        let err = store.client("gs://b/secret").properties().unwrap_err();
        assert_eq!(err.code(), Some("403"));
    }

    #[test]
    fn test_config_dir() {
        let dir = TestConfigDir::new().unwrap();
        let path = dir.write_config("[read]\nbuffer_size = 10\n").unwrap();
        assert!(path.exists());
    }
}
