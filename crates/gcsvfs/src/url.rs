//! Storage URL parsing
//!
//! URLs have the form `scheme://bucket/key`. The key is taken verbatim: no
//! percent-decoding and no normalization of repeated or trailing slashes.

use crate::{Result, VfsError};

/// Scheme prefix handled by [`crate::GcsFileSystem`]
pub const GCS_SCHEME: &str = "gs://";

/// A storage URL split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Bucket name, never empty
    pub bucket: String,
    /// Scheme and separator (`gs://`), kept for rebuilding the URL
    pub prefix: String,
    /// Object key, everything after the first `/` following the bucket
    pub key: String,
}

impl ParsedUrl {
    /// Parse a `gs://bucket/key` URL.
    pub fn parse(url: &str) -> Result<Self> {
        parse_url(url, GCS_SCHEME)
    }

    /// Rebuild the URL this was parsed from.
    pub fn to_url(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}/{}", self.prefix, self.bucket, self.key)
    }
}

/// Parse `url` against an arbitrary `scheme` prefix such as `"gs://"`.
pub fn parse_url(url: &str, scheme: &str) -> Result<ParsedUrl> {
    let rest = url
        .strip_prefix(scheme)
        .ok_or_else(|| VfsError::InvalidUrl(format!("URL needs to start with {}: {}", scheme, url)))?;

    let slash_pos = rest.find('/').ok_or_else(|| {
        VfsError::InvalidUrl(format!("URL needs to contain a '/' after the host: {}", url))
    })?;

    let bucket = &rest[..slash_pos];
    if bucket.is_empty() {
        return Err(VfsError::InvalidUrl(format!(
            "URL needs to contain a bucket name: {}",
            url
        )));
    }

    Ok(ParsedUrl {
        bucket: bucket.to_string(),
        prefix: scheme.to_string(),
        key: rest[slash_pos + 1..].to_string(),
    })
}

/// True if `path` carries the `gs://` scheme prefix.
pub fn has_gcs_scheme(path: &str) -> bool {
    path.starts_with(GCS_SCHEME)
}
