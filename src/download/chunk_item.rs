use std::sync::Arc;
use log::debug;
use crate::download::chunk_range::ChunkInfo;
use crate::download::error::ChunkFailure;
use crate::download::identity::EtagBaseline;
use crate::download::range_fetcher::{RangeFetcher, RangePayload};
use crate::download::sink::{write_chunk, PositionalSink};

/// State shared by every chunk of one download.
pub struct ChunkContext {
    pub fetcher: RangeFetcher,
    pub baseline: EtagBaseline,
    pub sink: Arc<dyn PositionalSink>,
}

/// One chunk job: fetch its span, verify the resource identity, write it in place.
pub struct ChunkItem {
    pub chunk_info: ChunkInfo,
    context: Arc<ChunkContext>,
}

impl ChunkItem {
    pub fn new(chunk_info: ChunkInfo, context: Arc<ChunkContext>) -> Self {
        Self { chunk_info, context }
    }

    pub fn offset(&self) -> u64 {
        self.chunk_info.range.start
    }

    /// Returns the number of bytes written.
    pub async fn download(&self) -> Result<u64, ChunkFailure> {
        let payload = self.context.fetcher.fetch(self.chunk_info.range).await?;
        self.commit(payload).await
    }

    /// Verifies and writes a payload that was already fetched for this chunk.
    pub async fn commit(&self, payload: RangePayload) -> Result<u64, ChunkFailure> {
        let range = self.chunk_info.range;
        if payload.range != range {
            return Err(ChunkFailure::UnexpectedLength {
                expected: range.len(),
                actual: payload.body.len() as u64,
            });
        }

        self.context.baseline.verify(payload.etag.as_deref())?;

        let len = payload.body.len() as u64;
        write_chunk(self.context.sink.clone(), range.start, payload.body).await?;
        debug!("Chunk {} written [{}-{}]", self.chunk_info.index, range.start, range.end);

        Ok(len)
    }
}
