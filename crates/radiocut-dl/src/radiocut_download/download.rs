//! Chunk download and concatenation

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::FixedOffset;
use radiocut_proto::config::{ConcatConfig, ConcatMethod};
use radiocut_proto::time;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::radiocut_download::api::RadiocutClient;
use crate::radiocut_download::error::{Error, Result};
use crate::radiocut_download::parser::safe_filename;
use crate::radiocut_download::Chunk;

pub const MP3_EXTENSION: &str = "mp3";
const MP3WRAP_SUFFIX: &str = "_MP3WRAP";

/// `{output_dir}/{show}-{YYYY-MM-DD}`, dated by the first chunk in the show's offset.
pub fn show_directory(
    output_dir: &Path,
    show_name: &str,
    chunks: &[Chunk],
    offset: FixedOffset,
) -> Result<PathBuf> {
    let first = chunks.first().ok_or(Error::NoChunks)?;
    let date = first
        .local_start(offset)
        .ok_or_else(|| Error::InvalidTimestamp(first.start.to_string()))?;

    Ok(output_dir.join(format!(
        "{}-{}",
        safe_filename(show_name),
        date.format(time::DATE_FORMAT)
    )))
}

/// Download every chunk, in order, as `{epoch}.mp3` inside the show directory.
///
/// An existing directory is reused. A failed chunk aborts the whole run and
/// leaves already written files in place.
pub async fn download_chunks(
    client: &RadiocutClient,
    show_name: &str,
    chunks: &[Chunk],
    output_dir: &Path,
    offset: FixedOffset,
) -> Result<PathBuf> {
    let directory = show_directory(output_dir, show_name, chunks, offset)?;
    tokio::fs::create_dir_all(&directory)
        .await
        .map_err(Error::io(&directory))?;

    info!("Downloading {} chunks into {}", chunks.len(), directory.display());

    for (i, chunk) in chunks.iter().enumerate() {
        let path = directory.join(chunk_file_name(chunk));
        let bytes = client.fetch_to_file(&chunk.url, &path).await?;
        debug!("[{}/{}] {} ({} bytes)", i + 1, chunks.len(), path.display(), bytes);
    }

    info!("All MP3 chunks retrieved and saved to {}", directory.display());
    Ok(directory)
}

pub fn chunk_file_name(chunk: &Chunk) -> String {
    format!("{}.{}", chunk.start, MP3_EXTENSION)
}

/// Chunk files in the directory, ordered by their epoch name.
pub async fn chunk_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(directory)
        .await
        .map_err(Error::io(directory))?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(Error::io(directory))? {
        let path = entry.path();
        let is_mp3 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(MP3_EXTENSION));
        if is_mp3 && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by_key(|path| {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        (stem.parse::<i64>().unwrap_or(i64::MAX), stem)
    });

    Ok(files)
}

/// `{directory}{suffix}.mp3` next to the directory.
fn sibling_mp3(directory: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(directory.as_os_str());
    name.push(suffix);
    name.push(".");
    name.push(MP3_EXTENSION);
    PathBuf::from(name)
}

/// Join the chunk files into `{directory}.mp3` and remove the directory.
pub async fn concatenate(
    directory: &Path,
    method: ConcatMethod,
    config: &ConcatConfig,
) -> Result<PathBuf> {
    info!("Create a single MP3 file for {}", directory.display());

    let files = chunk_files(directory).await?;
    if files.is_empty() {
        return Err(Error::NoChunks);
    }

    let final_path = match method {
        ConcatMethod::Mp3wrap => concat_mp3wrap(directory, &files, &config.mp3wrap_binary()).await?,
        ConcatMethod::Native => concat_native(directory, &files).await?,
    };

    tokio::fs::remove_dir_all(directory)
        .await
        .map_err(Error::io(directory))?;

    Ok(final_path)
}

/// Run mp3wrap over the chunk files and move its `_MP3WRAP` output into place.
pub async fn concat_mp3wrap(directory: &Path, files: &[PathBuf], mp3wrap: &Path) -> Result<PathBuf> {
    let final_path = sibling_mp3(directory, "");
    let wrapped_path = sibling_mp3(directory, MP3WRAP_SUFFIX);
    let tool = mp3wrap.display().to_string();

    // mp3wrap prompts before overwriting its own output
    if wrapped_path.exists() {
        tokio::fs::remove_file(&wrapped_path)
            .await
            .map_err(Error::io(&wrapped_path))?;
    }

    info!("Running {} on {} files", tool, files.len());

    let output = Command::new(mp3wrap)
        .arg(&final_path)
        .args(files)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| Error::ToolUnavailable {
            tool: tool.clone(),
            source,
        })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!("mp3wrap: {}", line);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        warn!("mp3wrap stderr: {}", line);
    }

    if !output.status.success() {
        return Err(Error::ExternalTool {
            tool,
            code: output.status.code(),
        });
    }

    tokio::fs::rename(&wrapped_path, &final_path)
        .await
        .map_err(Error::io(&wrapped_path))?;

    Ok(final_path)
}

/// Append the chunk files byte for byte into `{directory}.mp3`.
///
/// Frames are not validated; chunks carrying their own ID3 headers are kept as-is.
pub async fn concat_native(directory: &Path, files: &[PathBuf]) -> Result<PathBuf> {
    let final_path = sibling_mp3(directory, "");

    let mut out = tokio::fs::File::create(&final_path)
        .await
        .map_err(Error::io(&final_path))?;

    for path in files {
        let mut input = tokio::fs::File::open(path).await.map_err(Error::io(path))?;
        tokio::io::copy(&mut input, &mut out)
            .await
            .map_err(Error::io(&final_path))?;
    }

    out.flush().await.map_err(Error::io(&final_path))?;
    Ok(final_path)
}
