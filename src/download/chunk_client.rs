use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::Arc;
use headers::{ContentRange, HeaderMap, HeaderMapExt};
use log::info;
use reqwest::{Client, Response, StatusCode};
use tokio::sync::watch;
use url::Url;
use crate::download::chunk_item::{ChunkContext, ChunkItem};
use crate::download::chunk_manager::ChunkManager;
use crate::download::chunk_range::{ChunkInfo, ChunkPlan, ChunkRange, ChunkRangeIterator};
use crate::download::config::Config;
use crate::download::error::{ChunkFailure, DownloadError};
use crate::download::identity::EtagBaseline;
use crate::download::progress::Progress;
use crate::download::range_fetcher::{check_partial, read_payload, RangeFetcher};
use crate::download::sink::PositionalSink;
use crate::download::DownloadSummary;

/// Used when the configured worker count is zero.
pub const DEFAULT_WORKER_COUNT: usize = 8;
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024 * 4;
/// ETag consistency checks are on unless turned off, for the library and the config file alike.
pub const DEFAULT_VERIFY_ETAG: bool = true;

/// Downloads one resource as concurrent byte-range chunks.
///
/// ```no_run
/// # async fn run() -> Result<(), rangefetch::DownloadError> {
/// use std::sync::Arc;
/// use rangefetch::{ChunkClient, MemorySink};
///
/// let sink = Arc::new(MemorySink::new());
/// let client = ChunkClient::new(reqwest::Client::new()).with_worker_count(16);
/// client.get_file("https://example.com/big.iso", sink.clone()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChunkClient {
    pub client: Client,
    pub worker_count: usize,
    pub chunk_size: NonZeroU64,
    pub verify_etag: bool,
    pub headers: HeaderMap,
}

impl ChunkClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            worker_count: DEFAULT_WORKER_COUNT,
            chunk_size: NonZeroU64::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroU64::MIN),
            verify_etag: DEFAULT_VERIFY_ETAG,
            headers: HeaderMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, DownloadError> {
        let client = config.build_client().map_err(DownloadError::Client)?;
        Ok(Self {
            client,
            worker_count: config.worker_count,
            chunk_size: config.resolved_chunk_size(),
            verify_etag: config.verify_etag,
            headers: config.header_map(),
        })
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: NonZeroU64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_verify_etag(mut self, verify_etag: bool) -> Self {
        self.verify_etag = verify_etag;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Effective concurrency; zero falls back to [`DEFAULT_WORKER_COUNT`].
    pub fn workers(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.worker_count)
            .or(NonZeroUsize::new(DEFAULT_WORKER_COUNT))
            .unwrap_or(NonZeroUsize::MIN)
    }

    fn fetcher(&self, url: &str) -> Result<RangeFetcher, DownloadError> {
        let url = Url::parse(url)?;
        Ok(RangeFetcher::new(self.client.clone(), url, &self.headers))
    }

    /// Fetches the chunk starting at `offset` and returns the raw response.
    /// Anything other than `206 Partial Content` is an error.
    pub async fn get_chunk(&self, url: &str, offset: u64) -> Result<Response, DownloadError> {
        let len = self.chunk_size.get();
        let range = ChunkRange::checked_from_len(offset, len)
            .ok_or(ChunkFailure::RangeOverflow { offset, len })
            .map_err(|err| err.at(offset))?;
        self.fetcher(url)?
            .send_partial(range)
            .await
            .map_err(|err| err.at(offset))
    }

    /// Downloads `url` into `sink`. On failure the sink holds partial, undefined content.
    pub async fn get_file(&self, url: &str, sink: Arc<dyn PositionalSink>) -> Result<DownloadSummary, DownloadError> {
        self.run(url, sink, None).await
    }

    /// Like [`ChunkClient::get_file`], publishing progress after discovery and after each chunk.
    pub async fn get_file_with_progress(
        &self,
        url: &str,
        sink: Arc<dyn PositionalSink>,
        progress: &watch::Sender<Progress>,
    ) -> Result<DownloadSummary, DownloadError> {
        self.run(url, sink, Some(progress)).await
    }

    async fn run(
        &self,
        url: &str,
        sink: Arc<dyn PositionalSink>,
        progress: Option<&watch::Sender<Progress>>,
    ) -> Result<DownloadSummary, DownloadError> {
        let fetcher = self.fetcher(url)?;
        let chunk_size = self.chunk_size;

        // the first chunk doubles as size and identity discovery
        let first_range = ChunkRange::from_len(0, chunk_size.get());
        let response = fetcher.send(first_range).await.map_err(DownloadError::Discovery)?;
        if is_empty_resource(&response) {
            info!("{} is empty, nothing to download", fetcher.url());
            return Ok(DownloadSummary::default());
        }
        check_partial(&response).map_err(DownloadError::Discovery)?;
        let payload = read_payload(response, first_range).await.map_err(DownloadError::Discovery)?;
        let total_len = payload.total_len.ok_or_else(|| {
            DownloadError::Discovery(ChunkFailure::UnexpectedContentRange("no complete length".to_string()))
        })?;
        info!(
            "Downloading {} ({} bytes, chunk size {}, {} workers)",
            fetcher.url(), total_len, chunk_size, self.workers()
        );

        let context = Arc::new(ChunkContext {
            fetcher,
            baseline: EtagBaseline::new(self.verify_etag),
            sink,
        });

        let first_chunk = ChunkInfo {
            index: 0,
            range: ChunkRange::from_len(0, total_len.min(chunk_size.get())),
        };
        let first_len = ChunkItem::new(first_chunk, context.clone())
            .commit(payload)
            .await
            .map_err(|err| err.at(0))?;
        if let Some(progress) = progress {
            progress.send_replace(Progress { downloaded_len: first_len, total_len });
        }

        let plan = ChunkPlan::starting_at(chunk_size, total_len, first_len);
        let manager = ChunkManager::new(self.workers(), ChunkRangeIterator::new(plan), context);
        let mut summary = manager.download(progress).await?;
        summary.total_len += first_len;
        summary.chunk_count += 1;

        info!("Downloaded {} bytes in {} chunks", summary.total_len, summary.chunk_count);
        Ok(summary)
    }
}

/// `416` with `Content-Range: bytes */0`: a range request against an empty resource.
fn is_empty_resource(response: &Response) -> bool {
    response.status() == StatusCode::RANGE_NOT_SATISFIABLE
        && response.headers()
            .typed_get::<ContentRange>()
            .is_some_and(|range| range.bytes_range().is_none() && range.bytes_len() == Some(0))
}
