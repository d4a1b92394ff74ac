use std::num::NonZeroUsize;
use std::sync::Arc;
use log::{debug, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use crate::download::chunk_item::{ChunkContext, ChunkItem};
use crate::download::chunk_range::ChunkRangeIterator;
use crate::download::error::{ChunkFailure, DownloadError};
use crate::download::progress::Progress;
use crate::download::DownloadSummary;

/// Result reported by a worker for one dispatched chunk.
struct ChunkOutcome {
    offset: u64,
    result: Result<u64, ChunkFailure>,
}

/// Fixed pool of workers draining a shared chunk queue. Fails fast: after the first failure no
/// new chunk is dispatched, in-flight chunks run to completion and their results are dropped.
pub struct ChunkManager {
    worker_count: NonZeroUsize,
    chunk_iter: ChunkRangeIterator,
    context: Arc<ChunkContext>,
    cancel_token: CancellationToken,
}

impl ChunkManager {
    pub fn new(worker_count: NonZeroUsize, chunk_iter: ChunkRangeIterator, context: Arc<ChunkContext>) -> Self {
        Self {
            worker_count,
            chunk_iter,
            context,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Runs every queued chunk, adding each written chunk to `progress`.
    pub async fn download(&self, progress: Option<&watch::Sender<Progress>>) -> Result<DownloadSummary, DownloadError> {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();

        for worker_id in 0..self.worker_count.get() {
            workers.spawn(run_worker(
                worker_id,
                self.chunk_iter.clone(),
                self.context.clone(),
                self.cancel_token.clone(),
                sender.clone(),
            ));
        }
        // the channel closes once every worker has exited
        drop(sender);

        let mut summary = DownloadSummary::default();
        let mut first_error = None;
        while let Some(outcome) = receiver.recv().await {
            match outcome.result {
                Ok(len) => {
                    summary.total_len += len;
                    summary.chunk_count += 1;
                    if let Some(progress) = progress {
                        progress.send_modify(|p| p.downloaded_len += len);
                    }
                }
                Err(failure) if first_error.is_none() => {
                    warn!("Chunk at offset {} failed: {}", outcome.offset, failure);
                    self.cancel_token.cancel();
                    first_error = Some(failure.at(outcome.offset));
                }
                Err(failure) => {
                    debug!("Discarding failure of chunk at offset {}: {}", outcome.offset, failure);
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                self.cancel_token.cancel();
                first_error.get_or_insert(DownloadError::WorkerPanicked(err.to_string()));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }
}

async fn run_worker(
    worker_id: usize,
    chunk_iter: ChunkRangeIterator,
    context: Arc<ChunkContext>,
    cancel_token: CancellationToken,
    sender: mpsc::UnboundedSender<ChunkOutcome>,
) {
    while !cancel_token.is_cancelled() {
        let Some(chunk_info) = chunk_iter.next() else {
            break;
        };

        let item = ChunkItem::new(chunk_info, context.clone());
        let result = item.download().await;
        let failed = result.is_err();
        if failed {
            cancel_token.cancel();
        }
        if sender.send(ChunkOutcome { offset: item.offset(), result }).is_err() || failed {
            break;
        }
    }
    debug!("Worker {} exiting", worker_id);
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;
    use headers::HeaderMap;
    use reqwest::Client;
    use url::Url;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use super::*;
    use crate::download::chunk_range::ChunkPlan;
    use crate::download::identity::EtagBaseline;
    use crate::download::range_fetcher::RangeFetcher;
    use crate::download::sink::MemorySink;
    use crate::download::test_util::{sample_body, FileResponder};

    fn create_manager(server: &MockServer, workers: usize, total_len: u64, sink: Arc<MemorySink>) -> ChunkManager {
        let url = Url::parse(&format!("{}/file.bin", server.uri())).unwrap();
        let context = ChunkContext {
            fetcher: RangeFetcher::new(Client::new(), url, &HeaderMap::new()),
            baseline: EtagBaseline::new(false),
            sink,
        };
        let plan = ChunkPlan::new(NonZeroU64::new(100).unwrap(), total_len);
        ChunkManager::new(
            NonZeroUsize::new(workers).unwrap(),
            ChunkRangeIterator::new(plan),
            Arc::new(context),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_download_every_chunk_once() {
        let server = MockServer::start().await;
        let body = sample_body(1050);
        Mock::given(method("GET"))
            .respond_with(FileResponder::new(body.clone()))
            .expect(11)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::new());
        let manager = create_manager(&server, 4, body.len() as u64, sink.clone());
        let (progress, receiver) = watch::channel(Progress::default());

        let summary = manager.download(Some(&progress)).await.unwrap();
        assert_eq!(summary.total_len, 1050);
        assert_eq!(summary.chunk_count, 11);
        assert_eq!(receiver.borrow().downloaded_len, 1050);
        assert_eq!(sink.to_vec(), body);
    }

    #[tokio::test]
    async fn should_idle_excess_workers() {
        let server = MockServer::start().await;
        let body = vec![1u8; 150];
        Mock::given(method("GET"))
            .respond_with(FileResponder::new(body.clone()))
            .expect(2)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::new());
        let summary = create_manager(&server, 16, 150, sink.clone())
            .download(None)
            .await
            .unwrap();
        assert_eq!(summary.chunk_count, 2);
        assert_eq!(sink.to_vec(), body);
    }

    #[tokio::test]
    async fn should_stop_dispatching_after_failure() {
        let server = MockServer::start().await;
        let body = vec![1u8; 1000];
        Mock::given(method("GET"))
            .and(header("range", "bytes=0-99"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(FileResponder::new(body))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::new());
        let err = create_manager(&server, 1, 1000, sink.clone())
            .download(None)
            .await
            .unwrap_err();

        assert_eq!(err.offset(), Some(0));
        assert!(err.to_string().contains("chunk at offset 0"), "{err}");
        // a single worker fails on the first chunk and nothing else is dispatched
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn failing_worker_should_stop_dispatch_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let manager = create_manager(&server, 1, 1000, Arc::new(MemorySink::new()));
        // outcomes are never drained, so only the worker itself can cancel
        let (sender, _receiver) = mpsc::unbounded_channel();
        run_worker(
            0,
            manager.chunk_iter.clone(),
            manager.context.clone(),
            manager.cancel_token.clone(),
            sender,
        )
        .await;

        assert!(manager.cancel_token.is_cancelled());
        assert_eq!(manager.chunk_iter.remaining_len(), 900);
    }
}
