use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced when reading a document range.
pub enum DocumentError {
    #[error("range {offset}+{length} is outside the document (length {doc_len})")]
    /// The requested offset or range lies outside `[0, len]`.
    OutOfRange {
        /// Requested start offset.
        offset: usize,
        /// Requested length.
        length: usize,
        /// Document length at the time of the request.
        doc_len: usize,
    },
}

impl DocumentError {
    /// Shorthand for [`DocumentError::OutOfRange`].
    pub fn out_of_range(offset: usize, length: usize, doc_len: usize) -> Self {
        DocumentError::OutOfRange {
            offset,
            length,
            doc_len,
        }
    }
}

#[derive(Debug, Error)]
/// Errors returned by a reconciling strategy for one call.
pub enum ReconcileError {
    #[error(transparent)]
    /// The document could not be read at the requested range.
    Document(#[from] DocumentError),

    #[error("strategy failed: {0}")]
    /// The strategy gave up for a reason of its own.
    Strategy(String),
}

#[derive(Debug, Error)]
/// Errors produced while loading a settings file.
pub enum SettingsError {
    #[error("I/O error: {0}")]
    /// Filesystem I/O failed.
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    /// The settings file is not valid JSON for [`TweeSettings`](crate::TweeSettings).
    Json(#[from] serde_json::Error),
}
