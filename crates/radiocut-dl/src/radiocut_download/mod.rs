//! Radiocut show downloader
//!
//! Locates an archived airing, resolves the audio chunks covering it,
//! downloads them and joins them into a single MP3.

use std::path::PathBuf;

pub mod api;
pub mod chunks;
pub mod download;
pub mod error;
pub mod metadata;
pub mod parser;


use chrono::{DateTime, FixedOffset, NaiveDate};
use radiocut_proto::config::{Config, ConcatMethod};
use radiocut_proto::time;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use api::RadiocutClient;
pub use error::{Error, Result};
use parser::{AudioInfoExtractor, HtmlAudioInfo};

/// One airing as listed by the recordings API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowInfo {
    #[serde(default)]
    pub radio: String,
    pub start: String,
    pub end: String,
    pub url: String,
}

impl ShowInfo {
    /// Airing start; timestamps without an offset are read in `fallback`.
    pub fn start_time(&self, fallback: FixedOffset) -> Result<DateTime<FixedOffset>> {
        time::parse_datetime_or(&self.start, fallback)
            .ok_or_else(|| Error::InvalidTimestamp(self.start.clone()))
    }

    pub fn end_time(&self, fallback: FixedOffset) -> Result<DateTime<FixedOffset>> {
        time::parse_datetime_or(&self.end, fallback)
            .ok_or_else(|| Error::InvalidTimestamp(self.end.clone()))
    }
}

/// Fields scraped from the show page describing where its chunks live.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub station: String,
    /// Epoch-like digits; the first six seed the chunk bucket.
    pub seconds: String,
    pub base_url: String,
    pub duration: Option<String>,
    pub has_recordings_url: Option<String>,
    pub time: Option<String>,
}

/// A single audio segment of the recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub start: i64,
    pub url: String,
}

impl Chunk {
    pub fn local_start(&self, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        time::epoch_to_local(self.start, offset)
    }
}

/// What to download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub show: String,
    pub date: Option<NaiveDate>,
    pub output_dir: PathBuf,
    pub concat: ConcatMethod,
}

impl DownloadRequest {
    pub fn new(show: impl Into<String>, config: &Config) -> Self {
        Self {
            show: show.into(),
            date: None,
            output_dir: config.output.dir.clone(),
            concat: config.concat.method,
        }
    }
}

/// A recording whose last chunk starts further than this before the
/// scheduled end is reported as short.
pub const SHORT_RECORDING_SECS: i64 = 900;

/// Everything known about an airing once its chunk list is resolved.
#[derive(Debug, Clone)]
pub struct ResolvedShow {
    pub info: ShowInfo,
    pub audio: AudioInfo,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub chunks: Vec<Chunk>,
}

impl ResolvedShow {
    /// Seconds of the airing after the start of the last chunk.
    pub fn uncovered_secs(&self) -> i64 {
        chunks::uncovered_secs(&self.chunks, self.end)
    }

    pub fn is_short(&self) -> bool {
        self.uncovered_secs() > SHORT_RECORDING_SECS
    }
}

/// Locate the airing and resolve its chunk list without downloading audio.
pub async fn resolve_show(
    client: &RadiocutClient,
    config: &Config,
    request: &DownloadRequest,
) -> Result<ResolvedShow> {
    resolve_show_with(client, config, request, &HtmlAudioInfo).await
}

pub async fn resolve_show_with<E: AudioInfoExtractor>(
    client: &RadiocutClient,
    config: &Config,
    request: &DownloadRequest,
    extractor: &E,
) -> Result<ResolvedShow> {
    // 1. Find the airing
    let info = client.locate_show(&request.show, request.date).await?;
    info!("Found '{}' on {} ({} to {})", request.show, info.radio, info.start, info.end);

    // 2. Scrape chunk server details from the show page
    let html = client.fetch_show_page(&info).await?;
    let audio = extractor.extract(&html)?;
    info!("Audio served by {} for station {}", audio.base_url, audio.station);
    debug!(
        "Audio details: duration={:?} time={:?} has_recordings={:?}",
        audio.duration, audio.time, audio.has_recordings_url
    );

    // 3. Resolve the chunks covering the airing
    let fallback = config
        .scan
        .fallback_offset()
        .ok_or_else(|| Error::InvalidOffset(config.scan.default_utc_offset.clone()))?;
    let start = info.start_time(fallback)?;
    let end = info.end_time(fallback)?;
    let chunks = chunks::resolve_chunks(client, &audio, start, end, &config.scan).await?;

    Ok(ResolvedShow {
        info,
        audio,
        start,
        end,
        chunks,
    })
}

/// Download a Radiocut show and return the path of the joined MP3.
///
/// # Arguments
/// * `client` - HTTP client bound to the Radiocut host
/// * `config` - Scan, concatenation and tagging settings
/// * `request` - Show name, optional airing date and output directory
pub async fn download_show(
    client: &RadiocutClient,
    config: &Config,
    request: &DownloadRequest,
) -> Result<PathBuf> {
    let resolved = resolve_show(client, config, request).await?;
    let offset = *resolved.start.offset();
    info!(
        "Fetching {} chunks for {} to {}",
        resolved.chunks.len(),
        resolved.start,
        resolved.end
    );

    // 4. Fetch every chunk into the show directory
    let chunk_dir = download::download_chunks(
        client,
        &request.show,
        &resolved.chunks,
        &request.output_dir,
        offset,
    )
    .await?;

    // 5. Join them
    let final_path = download::concatenate(&chunk_dir, request.concat, &config.concat).await?;

    // 6. Tag the result
    if config.output.tag {
        let tags = metadata::ShowTags::from_resolved(&request.show, &resolved);
        if let Err(e) = metadata::write_tags(&final_path, &tags).await {
            warn!("Could not tag {}: {:#}", final_path.display(), e);
        }
    }

    if resolved.is_short() {
        warn!(
            "Recording is short: last chunk starts {}s before the scheduled end {}",
            resolved.uncovered_secs(),
            resolved.end
        );
    }
    info!(
        "Radio show created: {} ({} chunks, {}s uncovered)",
        final_path.display(),
        resolved.chunks.len(),
        resolved.uncovered_secs()
    );
    Ok(final_path)
}
