use thiserror::Error;

/// Errors surfaced by the file system adapter.
///
/// Nothing is retried or masked here; every variant reaches the caller as-is.
#[derive(Error, Debug)]
pub enum VfsError {
    /// The path is not a well-formed `gs://bucket/key` URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The operation is not available on a read-only object store
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The backend rejected a metadata probe or range fetch
    #[error("Remote I/O error (code '{code}', reason '{reason}'): {message}")]
    RemoteIo {
        /// Backend status code, verbatim
        code: String,
        /// Backend reason phrase, verbatim
        reason: String,
        /// Backend message, verbatim
        message: String,
    },

    /// The caller broke a contract of the adapter
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// A setting or configuration file could not be understood
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking runtime bridge could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl VfsError {
    /// Build a [`VfsError::RemoteIo`] from its three parts.
    pub fn remote(
        code: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        VfsError::RemoteIo {
            code: code.into(),
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Backend status code, if this error came from the backend.
    pub fn code(&self) -> Option<&str> {
        match self {
            VfsError::RemoteIo { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the backend reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code() == Some("404")
    }
}

/// Codes follow HTTP status numbers so every backend reports the same
/// condition the same way.
impl From<object_store::Error> for VfsError {
    fn from(err: object_store::Error) -> Self {
        use object_store::Error as E;

        let message = err.to_string();
        match err {
            E::NotFound { .. } => VfsError::remote("404", "Not Found", message),
            E::PermissionDenied { .. } => VfsError::remote("403", "Forbidden", message),
            E::Unauthenticated { .. } => VfsError::remote("401", "Unauthorized", message),
            E::Precondition { .. } => VfsError::remote("412", "Precondition Failed", message),
            E::NotModified { .. } => VfsError::remote("304", "Not Modified", message),
            E::AlreadyExists { .. } => VfsError::remote("409", "Conflict", message),
            E::NotImplemented => VfsError::remote("501", "Not Implemented", message),
            E::NotSupported { .. } => VfsError::remote("NotSupported", "Not Supported", message),
            E::InvalidPath { .. } => VfsError::InvalidUrl(message),
            E::Generic { store, .. } => match http_status(&message) {
                Some((code, reason)) => VfsError::remote(code, reason, message),
                None => VfsError::remote("Generic", store, message),
            },
            _ => VfsError::remote("Unknown", "Unknown", message),
        }
    }
}

/// Status code and reason phrase of a rendered HTTP failure, e.g.
/// `"... status code: 503 Service Unavailable: ..."`.
fn http_status(message: &str) -> Option<(String, String)> {
    let after = &message[message.find("status")? + "status".len()..];
    let start = after.find(|c: char| c.is_ascii_digit())?;
    let rest = &after[start..];

    let code = rest.get(..3)?;
    let in_range = code
        .parse::<u16>()
        .map_or(false, |n| (100..=599).contains(&n));
    if !in_range || rest[3..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let reason = rest[3..]
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    Some((code.to_string(), reason))
}

pub type Result<T> = std::result::Result<T, VfsError>;

impl From<VfsError> for std::io::Error {
    fn from(err: VfsError) -> Self {
        use std::io::ErrorKind;

        let kind = match &err {
            VfsError::Io(_) => None,
            e if e.is_not_found() => Some(ErrorKind::NotFound),
            VfsError::Unsupported(_) => Some(ErrorKind::Unsupported),
            VfsError::InvalidUrl(_) | VfsError::PreconditionViolation(_) => {
                Some(ErrorKind::InvalidInput)
            }
            _ => Some(ErrorKind::Other),
        };

        match (kind, err) {
            (_, VfsError::Io(io_err)) => io_err,
            (Some(kind), other) => std::io::Error::new(kind, other),
            (None, other) => std::io::Error::new(ErrorKind::Other, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_keeps_fields_verbatim() {
        let err = VfsError::remote("403", "Forbidden", "caller lacks storage.objects.get");
        assert_eq!(err.code(), Some("403"));
        let text = err.to_string();
        assert!(text.contains("'403'"));
        assert!(text.contains("'Forbidden'"));
        assert!(text.contains("caller lacks storage.objects.get"));
    }

    #[test]
    fn test_object_store_not_found_mapping() {
        let err: VfsError = object_store::Error::NotFound {
            path: "bucket/missing".to_string(),
            source: "no such object".into(),
        }
        .into();
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some("404"));
    }

    #[test]
    fn test_object_store_auth_failures_keep_status() {
        let err: VfsError = object_store::Error::PermissionDenied {
            path: "bucket/secret".to_string(),
            source: "403 Forbidden".into(),
        }
        .into();
        assert_eq!(err.code(), Some("403"));
        assert!(!err.is_not_found());
        assert!(matches!(err, VfsError::RemoteIo { ref reason, .. } if reason == "Forbidden"));

        let err: VfsError = object_store::Error::Unauthenticated {
            path: "bucket/secret".to_string(),
            source: "401 Unauthorized".into(),
        }
        .into();
        assert_eq!(err.code(), Some("401"));
    }

    #[test]
    fn test_generic_error_keeps_http_status() {
        let err: VfsError = object_store::Error::Generic {
            store: "GCS",
            source: "Server returned non-2xx status code: 503 Service Unavailable: try later"
                .into(),
        }
        .into();
        match err {
            VfsError::RemoteIo {
                code,
                reason,
                message,
            } => {
                assert_eq!(code, "503");
                assert_eq!(reason, "Service Unavailable");
                assert!(message.contains("try later"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err: VfsError = object_store::Error::Generic {
            store: "GCS",
            source: "connection reset by peer".into(),
        }
        .into();
        assert_eq!(err.code(), Some("Generic"));
    }

    #[test]
    fn test_http_status_extraction() {
        assert_eq!(
            http_status("Client error with status 429 Too Many Requests: slow down"),
            Some(("429".to_string(), "Too Many Requests".to_string()))
        );
        assert_eq!(http_status("status 5000 things"), None);
        assert_eq!(http_status("no code here"), None);
    }

    #[test]
    fn test_io_error_kinds() {
        let io: std::io::Error = VfsError::Unsupported("glob".to_string()).into();
        assert_eq!(io.kind(), std::io::ErrorKind::Unsupported);

        let io: std::io::Error = VfsError::remote("404", "Not Found", "gone").into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);

        let io: std::io::Error = VfsError::PreconditionViolation("closed".to_string()).into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);
    }
}
