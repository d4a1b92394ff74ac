pub mod chunk_client;
pub mod chunk_item;
pub mod chunk_manager;
pub mod chunk_range;
pub mod config;
pub mod error;
pub mod identity;
pub mod logger;
pub mod progress;
pub mod range_fetcher;
pub mod sink;
#[cfg(test)]
mod test_util;

/// What a finished download wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub total_len: u64,
    pub chunk_count: usize,
}
