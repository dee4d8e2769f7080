//! Credential providers
//!
//! A provider turns resolved credentials and read options into a
//! [`BlobClient`] bound to one object.

use crate::client::{BlobClient, ObjectStoreClient};
use crate::{Authentication, ParsedUrl, ReadOptions, Result};
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// Builds backend clients for opened objects
pub trait CredentialProvider: Send + Sync + std::fmt::Debug {
    /// Create a client for the object named by `url`.
    fn client(
        &self,
        url: &ParsedUrl,
        auth: &Authentication,
        options: &ReadOptions,
    ) -> Result<Box<dyn BlobClient>>;
}

/// Google Cloud Storage provider
///
/// Starts from the environment (`GOOGLE_SERVICE_ACCOUNT`,
/// `GOOGLE_APPLICATION_CREDENTIALS`, ...) and applies any explicitly
/// configured credentials on top.
#[derive(Debug, Default, Clone)]
pub struct GcsCredentialProvider;

impl CredentialProvider for GcsCredentialProvider {
    fn client(
        &self,
        url: &ParsedUrl,
        auth: &Authentication,
        options: &ReadOptions,
    ) -> Result<Box<dyn BlobClient>> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(&url.bucket);

        if let Some(path) = &auth.service_account_path {
            builder = builder.with_service_account_path(path);
        }
        if let Some(key) = &auth.service_account_key {
            builder = builder.with_service_account_key(key);
        }
        if let Some(path) = &auth.application_credentials {
            builder = builder.with_application_credentials(path);
        }

        debug!("Building GCS client for bucket {}", url.bucket);
        let store = builder.build()?;
        let client = ObjectStoreClient::new(Arc::new(store), &url.key, *options)?;
        Ok(Box::new(client))
    }
}

/// Provider serving every bucket from one pre-built [`ObjectStore`]
///
/// Credentials are ignored; the store is assumed to be configured already.
#[derive(Debug, Clone)]
pub struct ObjectStoreProvider {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreProvider {
    /// Wrap an existing store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl CredentialProvider for ObjectStoreProvider {
    fn client(
        &self,
        url: &ParsedUrl,
        _auth: &Authentication,
        options: &ReadOptions,
    ) -> Result<Box<dyn BlobClient>> {
        let client = ObjectStoreClient::new(self.store.clone(), &url.key, *options)?;
        Ok(Box::new(client))
    }
}
