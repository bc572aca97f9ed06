//! Chunk window resolution
//!
//! The chunk index is paginated by bucket. Buckets are walked upwards from
//! the seed taken from the show page, keeping every chunk that starts inside
//! the airing (or just before it, within the tolerance), until a chunk
//! starting after the end of the airing shows up.

use chrono::{DateTime, FixedOffset};
use radiocut_proto::config::ScanConfig;
use tracing::{debug, info, warn};

use crate::radiocut_download::api::{BucketPage, RadiocutClient};
use crate::radiocut_download::error::{Error, Result};
use crate::radiocut_download::parser::bucket_seed;
use crate::radiocut_download::{AudioInfo, Chunk};

/// Outcome of feeding one bucket to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Every chunk was at or before the end; fetch the next bucket.
    Continue,
    /// A chunk past the end was seen.
    Complete,
    /// The bucket held no chunks.
    Empty,
}

/// Accumulates the chunks of one airing, bucket by bucket.
#[derive(Debug, Clone)]
pub struct ChunkWindow {
    start: i64,
    end: i64,
    tolerance_secs: i64,
    chunks: Vec<Chunk>,
}

impl ChunkWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>, tolerance_secs: i64) -> Self {
        Self {
            start: start.timestamp(),
            end: end.timestamp(),
            tolerance_secs,
            chunks: Vec::new(),
        }
    }

    /// Whether a chunk starting at `epoch` belongs to the airing.
    ///
    /// The tolerance is direction-agnostic and exclusive, so it overlaps the
    /// "at or after start" clause for chunks just after the start.
    pub fn admits(&self, epoch: i64) -> bool {
        epoch <= self.end
            && (epoch >= self.start
                || self.start.abs_diff(epoch) < self.tolerance_secs.unsigned_abs())
    }

    pub fn absorb(&mut self, page: &BucketPage) -> Step {
        if page.chunks.is_empty() {
            return Step::Empty;
        }

        for entry in &page.chunks {
            if entry.start > self.end {
                return Step::Complete;
            }
            if self.admits(entry.start) {
                self.chunks.push(Chunk {
                    start: entry.start,
                    url: format!("{}/{}", page.base_url, entry.filename),
                });
            }
        }

        Step::Continue
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// Seconds between the last chunk's start and `end`. The whole airing when
/// there are no chunks.
pub fn uncovered_secs(chunks: &[Chunk], end: DateTime<FixedOffset>) -> i64 {
    chunks
        .last()
        .map_or(end.timestamp(), |last| end.timestamp().saturating_sub(last.start))
        .max(0)
}

/// Collect the chunks covering `[start, end]` from the chunk index.
///
/// Stops at the first chunk past `end`, at an empty or missing bucket, or
/// after `scan.max_buckets` fetches. Fetch failures abort the whole scan.
pub async fn resolve_chunks(
    client: &RadiocutClient,
    audio: &AudioInfo,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    scan: &ScanConfig,
) -> Result<Vec<Chunk>> {
    debug!("Fetch json chunks from {} to {}", start, end);

    let mut bucket = bucket_seed(&audio.seconds)?;
    let mut window = ChunkWindow::new(start, end, scan.tolerance_secs);
    let mut scanned = 0u32;

    loop {
        if scanned >= scan.max_buckets {
            return Err(Error::ScanLimitExceeded {
                limit: scan.max_buckets,
            });
        }
        scanned += 1;

        let step = match client.fetch_chunk_bucket(audio, bucket).await? {
            Some(page) => window.absorb(&page),
            None => Step::Empty,
        };
        debug!(
            "Bucket {}: {:?} ({} chunks so far)",
            bucket,
            step,
            window.chunks().len()
        );

        match step {
            Step::Continue => bucket += 1,
            Step::Complete => break,
            Step::Empty => {
                warn!(
                    "Bucket {} has no chunks; stopping scan {}s short of the end",
                    bucket,
                    uncovered_secs(window.chunks(), end)
                );
                break;
            }
        }
    }

    let chunks = window.into_chunks();
    if chunks.is_empty() {
        return Err(Error::NoChunks);
    }

    info!("Resolved {} chunks over {} buckets", chunks.len(), scanned);
    Ok(chunks)
}

#[cfg(test)]
mod chunk_tests {
    use super::*;
    use crate::radiocut_download::api::ChunkEntry;
    use radiocut_proto::time::parse_datetime;

    const START: i64 = 1468069200;

    fn window() -> ChunkWindow {
        ChunkWindow::new(
            parse_datetime("2016-07-09T10:00:00-03:00").unwrap(),
            parse_datetime("2016-07-09T13:00:00-03:00").unwrap(),
            120,
        )
    }

    fn page(starts: &[i64]) -> BucketPage {
        BucketPage {
            base_url: "http://chunks.example/lared".to_string(),
            chunks: starts
                .iter()
                .map(|s| ChunkEntry {
                    start: *s,
                    filename: format!("{}.mp3", s),
                })
                .collect(),
        }
    }

    #[test]
    fn test_tolerance_boundary_is_exclusive() {
        let w = window();
        assert!(w.admits(START - 119));
        assert!(!w.admits(START - 120));
        assert!(!w.admits(START - 121));
        assert!(w.admits(START));
        assert!(w.admits(START + 119));
        assert!(w.admits(START + 3600));
    }

    #[test]
    fn test_end_is_inclusive_then_complete() {
        let end = START + 3 * 3600;
        let mut w = window();
        assert_eq!(w.absorb(&page(&[end - 300, end, end + 300, end + 600])), Step::Complete);
        let starts: Vec<i64> = w.chunks().iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![end - 300, end]);
    }

    #[test]
    fn test_early_chunks_skipped_late_tolerance_kept() {
        let mut w = window();
        let step = w.absorb(&page(&[START - 600, START - 300, START - 100, START + 200]));
        assert_eq!(step, Step::Continue);
        let starts: Vec<i64> = w.chunks().iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![START - 100, START + 200]);
    }

    #[test]
    fn test_extreme_epochs_are_skipped() {
        let mut w = window();
        assert!(!w.admits(i64::MIN));
        assert!(!w.admits(i64::MIN + 1));
        assert!(!w.admits(i64::MAX));
        assert_eq!(w.absorb(&page(&[i64::MIN, START])), Step::Continue);
        let starts: Vec<i64> = w.chunks().iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![START]);
    }

    #[test]
    fn test_chunk_url_joins_base_and_filename() {
        let mut w = window();
        w.absorb(&page(&[START]));
        assert_eq!(
            w.chunks()[0].url,
            format!("http://chunks.example/lared/{}.mp3", START)
        );
    }

    #[test]
    fn test_uncovered_secs_measures_tail() {
        let end = parse_datetime("2016-07-09T13:00:00-03:00").unwrap();
        let mut w = window();
        w.absorb(&page(&[START, START + 300]));
        assert_eq!(uncovered_secs(w.chunks(), end), 3 * 3600 - 300);

        w.absorb(&page(&[START + 3 * 3600]));
        assert_eq!(uncovered_secs(w.chunks(), end), 0);
    }

    #[test]
    fn test_empty_bucket() {
        let mut w = window();
        assert_eq!(w.absorb(&page(&[])), Step::Empty);
        assert!(w.into_chunks().is_empty());
    }

    #[test]
    fn test_multi_bucket_result_is_ordered_prefix() {
        let end = START + 3 * 3600;
        let all: Vec<i64> = (0..80).map(|i| START - 1200 + i * 300).collect();
        let mut w = window();

        let mut step = Step::Continue;
        for bucket in all.chunks(20) {
            step = w.absorb(&page(bucket));
            if step == Step::Complete {
                break;
            }
        }
        assert_eq!(step, Step::Complete);

        let got: Vec<i64> = w.chunks().iter().map(|c| c.start).collect();
        let expected: Vec<i64> = all
            .iter()
            .copied()
            .filter(|s| *s >= START && *s <= end)
            .collect();
        assert_eq!(got, expected);
        assert!(got.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
