/// Result alias that carries the custom [`CatalogError`] type.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Common error type for the core crate.
///
/// Routine outcomes such as contention on a guard, duplicate scans or unknown
/// codes are not errors; they are reported through the outcome enums of the
/// individual subsystems.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Free-form failure raised by a collaborator.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON in a config, catalog or snapshot file.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// A buffer handle was released to a pool that did not hand it out, or
    /// was released twice.
    #[error("buffer {id} is not checked out from pool {pool}")]
    InvalidHandle { pool: u64, id: u64 },
    /// The persisted page snapshot was written by an incompatible version.
    #[error("unsupported page snapshot version {found} (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },
    /// The camera could not be started or could not deliver a frame.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    /// A page index outside the contiguous range was requested.
    #[error("page index {index} is outside 1..={max}")]
    InvalidIndex { index: usize, max: usize },
}

impl CatalogError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for CatalogError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for CatalogError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
