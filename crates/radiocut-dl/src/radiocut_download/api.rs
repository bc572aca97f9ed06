//! Radiocut HTTP client

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use futures_util::StreamExt;
use radiocut_proto::config::HttpConfig;
use radiocut_proto::time;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::radiocut_download::error::{Error, Result};
use crate::radiocut_download::{AudioInfo, ShowInfo};

/// Chunk index for one bucket
#[derive(Debug, Clone, Deserialize)]
pub struct BucketPage {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(default)]
    pub chunks: Vec<ChunkEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkEntry {
    #[serde(deserialize_with = "epoch_seconds")]
    pub start: i64,
    pub filename: String,
}

// The index mixes integer and float epochs.
fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    let n = serde_json::Number::deserialize(deserializer)?;
    n.as_i64()
        .or_else(|| {
            n.as_f64()
                .map(f64::trunc)
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .ok_or_else(|| D::Error::custom(format!("invalid chunk start: {}", n)))
}

pub struct RadiocutClient {
    http: reqwest::Client,
    base_url: String,
}

impl RadiocutClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!("Retrieving URL: {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| Error::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            error!("URL not found: {}", url);
            return Err(Error::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }

    /// GET `url` and return the raw body.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let body = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|source| Error::Transport {
                url: url.to_string(),
                source,
            })?;

        debug!("URL retrieved ({} bytes)", body.len());
        Ok(body.to_vec())
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch(url).await?;
        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            url: url.to_string(),
            source,
        })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let body = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Stream the body of `url` into `path`, returning the byte count.
    pub async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<u64> {
        let response = self.get(url).await?;

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(Error::io(path))?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(|source| Error::Transport {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&piece).await.map_err(Error::io(path))?;
            written += piece.len() as u64;
        }

        file.flush().await.map_err(Error::io(path))?;
        Ok(written)
    }

    /// Find an airing of `show_name`: the most recent one, or the one on `date`.
    pub async fn locate_show(&self, show_name: &str, date: Option<NaiveDate>) -> Result<ShowInfo> {
        let mut url = format!(
            "{}/api/radioshows/{}/last_recordings/",
            self.base_url, show_name
        );

        if let Some(date) = date {
            debug!("Include date in URL: {}", date.format(time::DATE_FORMAT));
            if let Some(cutoff) = time::listing_cutoff(date) {
                url.push_str("?now=");
                url.push_str(&cutoff);
            }
        }

        let shows: Vec<ShowInfo> = self.fetch_json(&url).await?;
        select_show(shows, show_name, date)
    }

    pub async fn fetch_show_page(&self, show: &ShowInfo) -> Result<String> {
        debug!("Fetch audio info");
        let url = format!("{}{}", self.base_url, show.url);
        self.fetch_text(&url).await
    }

    /// Fetch the chunk index page for `bucket`. `None` when the response has no entry for it.
    pub async fn fetch_chunk_bucket(
        &self,
        audio: &AudioInfo,
        bucket: u64,
    ) -> Result<Option<BucketPage>> {
        let url = chunk_index_url(audio, bucket);
        let mut pages: HashMap<String, BucketPage> = self.fetch_json(&url).await?;
        Ok(pages.remove(&bucket.to_string()))
    }
}

pub fn chunk_index_url(audio: &AudioInfo, bucket: u64) -> String {
    format!(
        "{}server/get_chunks/{}/{}/",
        audio.base_url, audio.station, bucket
    )
}

/// Pick the airing: first entry without a date, else the first whose `start` mentions it.
pub fn select_show(
    shows: Vec<ShowInfo>,
    show_name: &str,
    date: Option<NaiveDate>,
) -> Result<ShowInfo> {
    match date {
        None => shows.into_iter().next().ok_or_else(|| Error::NoRecordings {
            show: show_name.to_string(),
        }),
        Some(date) => {
            let needle = date.format(time::DATE_FORMAT).to_string();
            shows
                .into_iter()
                .find(|show| show.start.contains(&needle))
                .ok_or_else(|| Error::NoMatchingBroadcast {
                    show: show_name.to_string(),
                    date,
                })
        }
    }
}
