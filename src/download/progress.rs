use futures_util::Stream;
use tokio::sync::watch;

/// Snapshot of a running download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub downloaded_len: u64,
    /// Zero until the resource size has been discovered.
    pub total_len: u64,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.total_len > 0 && self.downloaded_len >= self.total_len
    }
}

pub fn progress_channel() -> (watch::Sender<Progress>, watch::Receiver<Progress>) {
    watch::channel(Progress::default())
}

/// Yields the current progress, then every change until the sender is dropped.
pub fn progress_stream(mut receiver: watch::Receiver<Progress>) -> impl Stream<Item=Progress> + 'static {
    async_stream::stream! {
        let progress = *receiver.borrow_and_update();
        yield progress;

        while receiver.changed().await.is_ok() {
            let progress = *receiver.borrow_and_update();
            yield progress;
        }
    }
}
