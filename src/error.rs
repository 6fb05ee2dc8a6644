use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Archive (assessor cleanup) errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive did not answer in time. The only retryable kind.
    #[error("Archive request timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gave up on {label} after {attempts} attempts")]
    RetriesExhausted { label: String, attempts: u32 },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Archive returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Authentication failed for {0}")]
    Auth(String),

    #[error("Malformed archive response: {0}")]
    ResponseParsing(String),

    #[error("Malformed assessor label: {0}")]
    MalformedLabel(String),
}

impl ArchiveError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ArchiveError::Timeout(_))
    }
}

// ---------------------------------------------------------------------------
// Slice pipeline errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Malformed label catalog {}, row {row}: {reason}", path.display())]
    MalformedCatalog {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("Segmentation value {value} has no entry in the label catalog")]
    UnknownLabel { value: i64 },

    #[error("Missing label sidecar {}", .0.display())]
    MissingSidecar(PathBuf),

    #[error("Reorientation of {} failed: {reason}", path.display())]
    Reorient { path: PathBuf, reason: String },

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Attach a path to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
