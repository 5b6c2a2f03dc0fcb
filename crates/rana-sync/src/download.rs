//! Streaming transfers between pre-signed URLs and disk

use futures::Stream;
use rana_core::error::{RanaError, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

/// Read/write granularity for transfers (1 MiB)
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Integer percentage of a transfer, or `None` while the size is unknown
pub type Percent = Option<u8>;

/// Turns byte counts into percentages, reporting only strict increases
#[derive(Debug, Clone)]
pub struct PercentTracker {
    total: Option<u64>,
    last: Option<u8>,
}

impl PercentTracker {
    pub fn new(total: Option<u64>) -> Self {
        Self { total, last: None }
    }

    /// Percentage to report after `done` bytes, if it grew
    pub fn advance(&mut self, done: u64) -> Option<u8> {
        let total = self.total.filter(|t| *t > 0)?;
        let percent = (done.saturating_mul(100) / total).min(100) as u8;
        self.bump(percent)
    }

    /// Final 100%, unless already reported
    pub fn finish(&mut self) -> Option<u8> {
        self.bump(100)
    }

    fn bump(&mut self, percent: u8) -> Option<u8> {
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }
}

/// Stream `url` into `path`, reporting progress as it goes
///
/// Without a content length a single indeterminate (`None`) progress is
/// reported up front and 100% once the body is complete.
pub async fn stream_to_file<F>(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    mut on_progress: F,
) -> Result<u64>
where
    F: FnMut(Percent),
{
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RanaError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RanaError::Api { status: status.as_u16(), body });
    }

    let total = response.content_length();
    let mut tracker = PercentTracker::new(total);
    if total.is_none() {
        on_progress(None);
    }

    let file = File::create(path).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut written: u64 = 0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| RanaError::Transport(e.to_string()))?
    {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let Some(percent) = tracker.advance(written) {
            on_progress(Some(percent));
        }
    }
    writer.flush().await?;

    if let Some(percent) = tracker.finish() {
        on_progress(Some(percent));
    }
    tracing::debug!(path = %path.display(), bytes = written, "Download complete");
    Ok(written)
}

/// Contents of `file` as a stream of chunks of at most [`CHUNK_SIZE`] bytes
pub fn file_chunks(file: File) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static {
    futures::stream::try_unfold(file, next_chunk)
}

async fn next_chunk(mut file: File) -> std::io::Result<Option<(Vec<u8>, File)>> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut filled = 0;
    while filled < CHUNK_SIZE {
        let read = file.read(&mut chunk[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    if filled == 0 {
        return Ok(None);
    }
    chunk.truncate(filled);
    Ok(Some((chunk, file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_file_chunks_are_bounded() {
        use futures::TryStreamExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..CHUNK_SIZE * 2 + 1234).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let chunks: Vec<Vec<u8>> =
            file_chunks(File::open(&path).await.unwrap()).try_collect().await.unwrap();

        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![CHUNK_SIZE, CHUNK_SIZE, 1234]);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn test_empty_file_has_no_chunks() {
        use futures::StreamExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let chunks: Vec<_> = file_chunks(File::open(&path).await.unwrap()).collect().await;
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_reports_only_increases() {
        let mut tracker = PercentTracker::new(Some(1000));
        assert_eq!(tracker.advance(0), Some(0));
        assert_eq!(tracker.advance(5), None);
        assert_eq!(tracker.advance(10), Some(1));
        assert_eq!(tracker.advance(999), Some(99));
        assert_eq!(tracker.advance(1000), Some(100));
        assert_eq!(tracker.finish(), None);
    }

    #[test]
    fn test_unknown_total_never_divides() {
        let mut tracker = PercentTracker::new(None);
        assert_eq!(tracker.advance(123), None);
        assert_eq!(tracker.finish(), Some(100));
    }

    #[test]
    fn test_zero_length_body() {
        let mut tracker = PercentTracker::new(Some(0));
        assert_eq!(tracker.advance(0), None);
        assert_eq!(tracker.finish(), Some(100));
    }

    proptest! {
        #[test]
        fn reported_percentages_strictly_increase(
            total in 1u64..10_000_000,
            steps in proptest::collection::vec(1u64..2_000_000, 1..40),
        ) {
            let mut tracker = PercentTracker::new(Some(total));
            let mut done = 0u64;
            let mut reported = Vec::new();
            for step in steps {
                done = (done + step).min(total);
                if let Some(p) = tracker.advance(done) {
                    reported.push(p);
                }
            }
            if let Some(p) = tracker.finish() {
                reported.push(p);
            }

            prop_assert!(reported.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(reported.last().copied(), Some(100));
            prop_assert!(reported.iter().all(|p| *p <= 100));
        }
    }
}
