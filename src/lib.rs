//! Parallel chunked HTTP downloads: a resource is split into byte ranges, fetched concurrently
//! by a bounded pool of workers and written in place into a positional sink.

pub mod download;

pub use download::chunk_client::{ChunkClient, DEFAULT_CHUNK_SIZE, DEFAULT_VERIFY_ETAG, DEFAULT_WORKER_COUNT};
pub use download::chunk_range::{plan_chunks, ChunkInfo, ChunkRange};
pub use download::config::Config;
pub use download::error::{ChunkFailure, DownloadError};
pub use download::progress::{progress_channel, progress_stream, Progress};
pub use download::sink::{MemorySink, PositionalSink};
pub use download::DownloadSummary;
