//!
//! Destinations that accept writes at explicit byte offsets.
//!

use std::fs::File;
use std::io;
use std::sync::Arc;
use bytes::Bytes;

/// A destination that can be written at arbitrary offsets, concurrently from several workers
/// as long as their ranges do not overlap. Opening, flushing and closing belong to the caller.
pub trait PositionalSink: Send + Sync + 'static {
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()>;
}

impl PositionalSink for File {
    #[cfg(unix)]
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        std::os::unix::fs::FileExt::write_all_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn write_at(&self, offset: u64, mut buf: &[u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        let mut offset = offset;
        while !buf.is_empty() {
            match self.seek_write(buf, offset) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => {
                    buf = &buf[n..];
                    offset += n as u64;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

/// In-memory sink. Grows to fit, zero-filling any gap left by chunks that land out of order.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: parking_lot::Mutex<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: parking_lot::Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.lock().clone()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf.into_inner()
    }
}

impl PositionalSink for MemorySink {
    fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of memory range"))?;
        let end = start + data.len();

        let mut buf = self.buf.lock();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(data);

        Ok(())
    }
}

/// Writes `payload` at `offset` on the blocking pool, keeping file I/O off the async workers.
pub async fn write_chunk(sink: Arc<dyn PositionalSink>, offset: u64, payload: Bytes) -> io::Result<()> {
    match tokio::task::spawn_blocking(move || sink.write_at(offset, &payload)).await {
        Ok(result) => result,
        Err(err) => Err(io::Error::new(io::ErrorKind::Other, err)),
    }
}
