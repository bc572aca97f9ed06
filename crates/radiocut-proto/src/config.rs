use anyhow::Context;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{platform, time};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub concat: ConcatConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Radiocut host; endpoint paths are appended verbatim.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Bounds for the chunk-index pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum number of hour buckets fetched before giving up.
    #[serde(default = "default_max_buckets")]
    pub max_buckets: u32,
    /// Chunks starting less than this many seconds from the show start are kept.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
    /// Offset assumed for show timestamps published without one.
    #[serde(default = "default_utc_offset")]
    pub default_utc_offset: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcatMethod {
    /// Join with the external `mp3wrap` tool.
    Mp3wrap,
    /// Append chunk bytes in order without any external tool.
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatConfig {
    #[serde(default = "default_concat_method")]
    pub method: ConcatMethod,
    /// Explicit mp3wrap binary. Empty means discover it.
    #[serde(default)]
    pub mp3wrap_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Write ID3 tags onto the joined file.
    #[serde(default = "default_tag")]
    pub tag: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_buckets: default_max_buckets(),
            tolerance_secs: default_tolerance_secs(),
            default_utc_offset: default_utc_offset(),
        }
    }
}

impl Default for ConcatConfig {
    fn default() -> Self {
        Self {
            method: default_concat_method(),
            mp3wrap_path: PathBuf::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            tag: default_tag(),
        }
    }
}

fn default_base_url() -> String {
    "http://radiocut.fm".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_max_buckets() -> u32 {
    48
}

fn default_tolerance_secs() -> i64 {
    120
}

fn default_utc_offset() -> String {
    "-03:00".to_string()
}

fn default_concat_method() -> ConcatMethod {
    ConcatMethod::Mp3wrap
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_tag() -> bool {
    true
}

impl ScanConfig {
    /// `default_utc_offset` parsed; `None` when malformed.
    pub fn fallback_offset(&self) -> Option<FixedOffset> {
        time::parse_offset(&self.default_utc_offset)
    }
}

impl ConcatConfig {
    /// Resolve the mp3wrap binary: explicit path, then platform discovery,
    /// then the bare name for the OS to look up.
    pub fn mp3wrap_binary(&self) -> PathBuf {
        if !self.mp3wrap_path.as_os_str().is_empty() {
            return self.mp3wrap_path.clone();
        }
        platform::find_mp3wrap_binary()
            .unwrap_or_else(|| PathBuf::from(platform::mp3wrap_fallback_name()))
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            scan: ScanConfig::default(),
            concat: ConcatConfig::default(),
            output: OutputConfig::default(),
        }
    }
}
