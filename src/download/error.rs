use reqwest::StatusCode;
use thiserror::Error;
use tokio::io;

/// Why a single range request or chunk write failed.
#[derive(Error, Debug)]
pub enum ChunkFailure {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}, expected 206 Partial Content")]
    UnexpectedStatus(StatusCode),

    #[error("missing or unexpected Content-Range: {0}")]
    UnexpectedContentRange(String),

    #[error("unexpected body length {actual}, expected {expected}")]
    UnexpectedLength { expected: u64, actual: u64 },

    #[error("resource changed during download: etag {found:?} does not match {expected:?}")]
    EtagMismatch { expected: String, found: String },

    #[error("span of {len} bytes does not fit after offset {offset}")]
    RangeOverflow { offset: u64, len: u64 },

    #[error("write failed: {0}")]
    Write(#[from] io::Error),
}

impl ChunkFailure {
    pub fn at(self, offset: u64) -> DownloadError {
        DownloadError::Chunk { offset, source: self }
    }

    pub fn is_consistency(&self) -> bool {
        matches!(self, ChunkFailure::EtagMismatch { .. })
    }
}

/// Outcome of a failed download.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("failed to discover resource size: {0}")]
    Discovery(#[source] ChunkFailure),

    #[error("chunk at offset {offset}: {source}")]
    Chunk {
        offset: u64,
        #[source]
        source: ChunkFailure,
    },

    #[error("download worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

impl DownloadError {
    /// Offset of the chunk that failed, if the error belongs to one.
    pub fn offset(&self) -> Option<u64> {
        match self {
            DownloadError::Chunk { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Whether the resource was modified on the server mid-download.
    pub fn is_consistency(&self) -> bool {
        match self {
            DownloadError::Chunk { source, .. } => source.is_consistency(),
            _ => false,
        }
    }
}
