//! Show page scraping

use scraper::{ElementRef, Html, Selector};

use crate::radiocut_download::error::{Error, Result};
use crate::radiocut_download::AudioInfo;

/// Digits of `audio_seconds` that form the bucket key.
const SEED_DIGITS: usize = 6;

/// Turns a show page into the chunk server description.
pub trait AudioInfoExtractor {
    fn extract(&self, html: &str) -> Result<AudioInfo>;
}

/// Reads the `ul.audio_info` list Radiocut renders on every show page.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlAudioInfo;

impl AudioInfoExtractor for HtmlAudioInfo {
    fn extract(&self, html: &str) -> Result<AudioInfo> {
        parse_audio_info(html)
    }
}

pub fn parse_audio_info(html: &str) -> Result<AudioInfo> {
    let document = Html::parse_document(html);

    let list = Selector::parse("ul.audio_info")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .ok_or(Error::MissingField("audio_info"))?;

    let required = |class: &'static str| -> Result<String> {
        list_field(list, class)
            .filter(|text| !text.is_empty())
            .ok_or(Error::MissingField(class))
    };

    Ok(AudioInfo {
        station: required("audio_station")?,
        seconds: required("audio_seconds")?,
        base_url: required("audio_base_url")?,
        duration: list_field(list, "audio_duration"),
        has_recordings_url: list_field(list, "has_recordings_url"),
        time: list_field(list, "audio_time"),
    })
}

fn list_field(list: ElementRef<'_>, class: &str) -> Option<String> {
    let selector = Selector::parse(&format!("li.{}", class)).ok()?;
    let item = list.select(&selector).next()?;
    Some(item.text().collect::<String>().trim().to_string())
}

/// Initial chunk bucket from the show's `audio_seconds` field.
pub fn bucket_seed(audio_seconds: &str) -> Result<u64> {
    let digits = audio_seconds.trim();
    let head = digits
        .get(..SEED_DIGITS)
        .filter(|head| head.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::InvalidSeed(audio_seconds.to_string()))?;

    head.parse()
        .map_err(|_| Error::InvalidSeed(audio_seconds.to_string()))
}

/// Make a show name safe for use as a directory name
pub fn safe_filename(name: &str) -> String {
    name.replace(['/', '\\', ':'], "-")
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    const SHOW_PAGE: &str = r#"
    <html>
    <body>
        <div class="player">
            <ul class="audio_info" style="display:none">
                <li class="audio_station">lared</li>
                <li class="audio_seconds">1468069200</li>
                <li class="audio_duration">3:00:00</li>
                <li class="audio_base_url"> http://chunkserver.radiocut.fm/ </li>
                <li class="has_recordings_url">/radiostation/lared/has_recordings_at/1468069200</li>
                <li class="audio_time">10:00</li>
            </ul>
        </div>
    </body>
    </html>
    "#;

    #[test]
    fn test_parse_audio_info() {
        let info = parse_audio_info(SHOW_PAGE).unwrap();
        assert_eq!(info.station, "lared");
        assert_eq!(info.seconds, "1468069200");
        assert_eq!(info.base_url, "http://chunkserver.radiocut.fm/");
        assert_eq!(info.duration.as_deref(), Some("3:00:00"));
        assert_eq!(
            info.has_recordings_url.as_deref(),
            Some("/radiostation/lared/has_recordings_at/1468069200")
        );
        assert_eq!(info.time.as_deref(), Some("10:00"));
    }

    #[test]
    fn test_diagnostic_fields_are_optional() {
        let html = r#"<ul class="audio_info">
            <li class="audio_station">lared</li>
            <li class="audio_seconds">1468069200</li>
            <li class="audio_base_url">http://chunkserver.radiocut.fm/</li>
        </ul>"#;
        let info = HtmlAudioInfo.extract(html).unwrap();
        assert_eq!(info.station, "lared");
        assert!(info.duration.is_none());
        assert!(info.time.is_none());
    }

    #[test]
    fn test_missing_required_field() {
        let html = r#"<ul class="audio_info"><li class="audio_station">lared</li></ul>"#;
        let err = parse_audio_info(html).unwrap_err();
        assert!(matches!(err, Error::MissingField("audio_seconds")));
    }

    #[test]
    fn test_page_without_audio_info() {
        let err = parse_audio_info("<html><body><p>gone</p></body></html>").unwrap_err();
        assert!(matches!(err, Error::MissingField("audio_info")));
    }

    #[test]
    fn test_bucket_seed() {
        assert_eq!(bucket_seed("1468069200").unwrap(), 146806);
        assert_eq!(bucket_seed(" 1468069200.5 ").unwrap(), 146806);
        assert!(bucket_seed("14680").is_err());
        assert!(bucket_seed("14a8069200").is_err());
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("marca-de-radio"), "marca-de-radio");
        assert_eq!(safe_filename("a/b:c"), "a-b-c");
    }
}
