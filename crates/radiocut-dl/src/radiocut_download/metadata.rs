//! ID3 tagging of the joined show using lofty

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagType};
use std::path::Path;

use crate::radiocut_download::ResolvedShow;
use radiocut_proto::time;

/// Tags written onto the final file.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowTags {
    pub title: String,
    pub album: String,
    pub artist: String,
    pub date: String,
    pub comment: String,
}

impl ShowTags {
    /// - Title: "{show} - YYYY-MM-DD"
    /// - Album: "Radiocut"
    /// - Artist: radio station name (station id when the listing has none)
    /// - Year: broadcast date
    /// - Comment: station, time range and show page
    pub fn from_resolved(show_name: &str, resolved: &ResolvedShow) -> Self {
        let date = resolved.start.format(time::DATE_FORMAT).to_string();
        let artist = if resolved.info.radio.is_empty() {
            resolved.audio.station.clone()
        } else {
            resolved.info.radio.clone()
        };

        let comment = [
            format!("Station: {}", resolved.audio.station),
            format!("Aired: {} to {}", resolved.info.start, resolved.info.end),
            format!("Source: {}", resolved.info.url),
        ]
        .join("\n");

        Self {
            title: format!("{} - {}", show_name, date),
            album: "Radiocut".to_string(),
            artist,
            date,
            comment,
        }
    }
}

pub async fn write_tags(file_path: &Path, tags: &ShowTags) -> Result<()> {
    // Use blocking task for file I/O
    let path = file_path.to_path_buf();
    let tags = tags.clone();

    tokio::task::spawn_blocking(move || write_tags_blocking(&path, &tags))
        .await
        .context("Tag writing task failed")??;

    Ok(())
}

fn write_tags_blocking(file_path: &Path, tags: &ShowTags) -> Result<()> {
    let tagged_file = Probe::open(file_path)?
        .read()
        .context("Failed to read audio file")?;

    let mut tag = tagged_file
        .primary_tag()
        .cloned()
        .unwrap_or_else(|| Tag::new(TagType::Id3v2));

    tag.insert_text(ItemKey::TrackTitle, tags.title.clone());
    tag.insert_text(ItemKey::AlbumTitle, tags.album.clone());
    if !tags.artist.is_empty() {
        tag.insert_text(ItemKey::TrackArtist, tags.artist.clone());
    }
    tag.insert_text(ItemKey::Year, tags.date.clone());
    tag.insert_text(ItemKey::Comment, tags.comment.clone());

    tag.save_to_path(file_path, WriteOptions::default())
        .context("Failed to save tags to file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radiocut_download::{AudioInfo, ShowInfo};
    use tempfile::TempDir;

    fn resolved(radio: &str) -> ResolvedShow {
        let info = ShowInfo {
            radio: radio.to_string(),
            start: "2016-07-09T10:00:00-03:00".to_string(),
            end: "2016-07-09T13:00:00-03:00".to_string(),
            url: "/radiostation/lared/listen/2016/07/09/10/00/00/".to_string(),
        };
        let art = time::parse_offset("-03:00").unwrap();
        ResolvedShow {
            start: info.start_time(art).unwrap(),
            end: info.end_time(art).unwrap(),
            info,
            audio: AudioInfo {
                station: "lared".to_string(),
                seconds: "1468069200".to_string(),
                base_url: "http://chunkserver.radiocut.fm/".to_string(),
                duration: None,
                has_recordings_url: None,
                time: None,
            },
            chunks: Vec::new(),
        }
    }

    #[test]
    fn test_tags_from_resolved_show() {
        let tags = ShowTags::from_resolved("marca-de-radio", &resolved("La Red"));
        assert_eq!(tags.title, "marca-de-radio - 2016-07-09");
        assert_eq!(tags.album, "Radiocut");
        assert_eq!(tags.artist, "La Red");
        assert_eq!(tags.date, "2016-07-09");
        assert!(tags.comment.contains("Station: lared"));
        assert!(tags.comment.contains("/radiostation/lared/listen/2016/07/09/10/00/00/"));
    }

    #[test]
    fn test_artist_falls_back_to_station() {
        let tags = ShowTags::from_resolved("marca-de-radio", &resolved(""));
        assert_eq!(tags.artist, "lared");
    }

    /// Silent MPEG-1 Layer III frames at 128 kbps / 44.1 kHz.
    fn silent_mp3(frames: usize) -> Vec<u8> {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        frame.repeat(frames)
    }

    #[tokio::test]
    async fn test_tagging_writes_show_tags() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("marca-de-radio-2016-07-09.mp3");
        tokio::fs::write(&path, silent_mp3(8)).await.unwrap();

        let tags = ShowTags::from_resolved("marca-de-radio", &resolved("La Red"));
        write_tags(&path, &tags).await.unwrap();

        let tagged = lofty::read_from_path(&path).unwrap();
        let tag = tagged.primary_tag().unwrap();
        assert_eq!(tag.tag_type(), TagType::Id3v2);
        assert_eq!(tag.title().as_deref(), Some("marca-de-radio - 2016-07-09"));
        assert_eq!(tag.artist().as_deref(), Some("La Red"));
        assert_eq!(tag.album().as_deref(), Some("Radiocut"));
        assert!(tag
            .items()
            .any(|item| item.value().text().is_some_and(|t| t.starts_with("2016"))));
        assert!(tag.comment().is_some_and(|c| c.contains("Station: lared")));
    }

    #[tokio::test]
    async fn test_tagging_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.mp3");

        let tags = ShowTags::from_resolved("marca-de-radio", &resolved("La Red"));
        assert!(write_tags(&path, &tags).await.is_err());
        assert!(!path.exists());
    }
}
