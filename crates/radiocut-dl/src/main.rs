mod radiocut_download;

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use radiocut_proto::config::{Config, ConcatMethod};
use radiocut_proto::time;

use radiocut_download::{DownloadRequest, RadiocutClient};

/// Radiocut.fm downloader
#[derive(Parser, Debug)]
#[command(name = "radiocut-dl", version, about)]
struct Cli {
    /// Radio show name as it appears in radiocut.fm URLs
    #[arg(value_name = "RADIO_SHOW_NAME")]
    show: String,

    /// Airing date (YYYY-MM-DD); defaults to the most recent airing
    #[arg(short, long, value_name = "RADIO_SHOW_DATE", value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Directory for the resulting MP3
    #[arg(short, long, value_name = "OUTPUT_DIRECTORY")]
    output: Option<PathBuf>,

    /// Config file (defaults to ~/.config/radiocut/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Join chunks without mp3wrap
    #[arg(long)]
    native: bool,

    /// Print the resolved chunk list as JSON and exit
    #[arg(long)]
    dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, time::DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    // Allow RUST_LOG override; suppress connection-level DEBUG from HTTP client internals.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!("{},hyper_util=warn,reqwest=warn,hyper=warn", default_level)
    });

    match &cli.log_file {
        Some(path) => {
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(log_file)
                .with_env_filter(log_filter.as_str())
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(log_filter.as_str())
                .init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("Using default config: {:#}", e);
            Config::default()
        }),
    };
    if let Some(dir) = &cli.output {
        config.output.dir = dir.clone();
    }
    if cli.native {
        config.concat.method = ConcatMethod::Native;
    }

    let client = RadiocutClient::new(&config.http).context("Failed to set up HTTP client")?;

    let mut request = DownloadRequest::new(cli.show.clone(), &config);
    request.date = cli.date;

    tracing::info!("radiocut-dl starting for '{}'", request.show);

    if cli.dry_run {
        let resolved = radiocut_download::resolve_show(&client, &config, &request)
            .await
            .with_context(|| format!("Failed to resolve '{}'", request.show))?;
        println!("{}", serde_json::to_string_pretty(&resolved.chunks)?);
        return Ok(());
    }

    let path = radiocut_download::download_show(&client, &config, &request)
        .await
        .with_context(|| format!("Failed to download '{}'", request.show))?;
    println!("{}", path.display());

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_parse_minimal_args() {
        let cli = Cli::try_parse_from(["radiocut-dl", "marca-de-radio"]).unwrap();
        assert_eq!(cli.show, "marca-de-radio");
        assert!(cli.date.is_none());
        assert!(cli.output.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_parse_date_and_output() {
        let cli = Cli::try_parse_from([
            "radiocut-dl",
            "marca-de-radio",
            "-d",
            "2016-07-02",
            "-o",
            "/tmp/shows",
        ])
        .unwrap();
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2016, 7, 2));
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/shows")));
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(Cli::try_parse_from(["radiocut-dl", "x", "--date", "02/07/2016"]).is_err());
    }

    #[test]
    fn test_show_name_is_required() {
        assert!(Cli::try_parse_from(["radiocut-dl"]).is_err());
    }
}
