use std::time::Duration;

use thiserror::Error;

/// An error that happens when fetching a call tracking configuration from a
/// remote location.
///
/// This error enum is intended for sharing between all requesters of a cache
/// entry, which is why it is cheap to clone and carries the remote failure as
/// an owned message rather than the underlying error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The resource was not found at the remote source.
    #[error("not found")]
    NotFound,
    /// The resource could not be fetched from the remote source due to missing
    /// permissions.
    ///
    /// The attached string contains the remote source's response.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The resource could not be fetched from the remote source due to a timeout.
    #[error("download timed out after {0:?}")]
    Timeout(Duration),
    /// The resource could not be fetched from the remote source due to another
    /// problem, like connection loss, DNS resolution, or a 5xx server response.
    ///
    /// The attached string contains the remote source's response.
    #[error("download failed: {0}")]
    DownloadError(String),
    /// The resource was fetched successfully, but is invalid in some way.
    ///
    /// For example, this could result from an invalid URL, a response that is
    /// not valid JSON, or a response missing a required field.
    #[error("malformed: {0}")]
    Malformed(String),
    /// An unexpected error in the service itself.
    #[error("internal error")]
    InternalError,
}

impl CacheError {
    /// Records an unexpected internal error.
    ///
    /// The original error is logged, and an opaque [`InternalError`](Self::InternalError)
    /// is returned so the underlying detail does not end up shared between requesters.
    #[track_caller]
    pub fn from_std_error<E: std::error::Error + 'static>(e: E) -> Self {
        // tracing can only record a `&dyn Error`
        let dynerr: &dyn std::error::Error = &e;
        tracing::error!(error = dynerr);
        Self::InternalError
    }
}


/// An entry in the cache, containing either `Ok(T)` or an error denoting the
/// reason why the resource could not be fetched or is otherwise unusable.
pub type CacheEntry<T = ()> = Result<T, CacheError>;
