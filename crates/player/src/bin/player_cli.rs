use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use media_source::MediaSink;
use player::{Player, PlayerConfig};

/// Drives a VOD load/play/shutdown cycle against the streaming engine for
/// manual exercising (spec §4.K's control surface). A demonstration
/// surface, not part of the player's public API.
#[derive(Parser, Debug)]
#[command(name = "player-cli", about = "Load and step a manifest against the streaming engine")]
struct Args {
    /// Manifest URI (DASH MPD or HLS master playlist).
    uri: String,

    /// Manifest MIME type; defaults to DASH.
    #[arg(long, default_value = "application/dash+xml")]
    mime_type: String,

    /// Path to a TOML player configuration file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Seconds of presentation time to advance per tick.
    #[arg(long, default_value_t = 2.0)]
    tick_seconds: f64,

    /// Number of ticks to run before shutting down.
    #[arg(long, default_value_t = 30)]
    ticks: u32,

    #[arg(long)]
    verbose: bool,
}

/// Null sink used when no real platform media element is available: logs
/// what would have been appended and tracks buffered ranges in memory.
struct NullSink {
    ranges: tokio::sync::Mutex<std::collections::HashMap<manifest::ContentType, media_source::BufferedRanges>>,
}

impl NullSink {
    fn new() -> Self {
        Self { ranges: tokio::sync::Mutex::new(std::collections::HashMap::new()) }
    }
}

#[async_trait::async_trait]
impl MediaSink for NullSink {
    async fn init(&self, content_type: manifest::ContentType, mime_codecs: &str) -> Result<(), media_source::MediaError> {
        info!(?content_type, mime_codecs, "sink init");
        Ok(())
    }

    async fn append_init(&self, content_type: manifest::ContentType, bytes: bytes::Bytes) -> Result<(), media_source::MediaError> {
        info!(?content_type, bytes = bytes.len(), "sink append_init");
        Ok(())
    }

    async fn append_buffer(
        &self,
        content_type: manifest::ContentType,
        bytes: bytes::Bytes,
        timestamp_offset: f64,
        append_window: (f64, f64),
    ) -> Result<(), media_source::MediaError> {
        let (start, end) = append_window;
        let clipped_start = (0.0f64).max(start) + timestamp_offset;
        let clipped_end = end.min(clipped_start + bytes.len() as f64 / 1_000_000.0);
        self.ranges.lock().await.entry(content_type).or_default().push((clipped_start, clipped_end));
        Ok(())
    }

    async fn remove(&self, content_type: manifest::ContentType, start: f64, end: f64) -> Result<(), media_source::MediaError> {
        if let Some(ranges) = self.ranges.lock().await.get_mut(&content_type) {
            ranges.retain(|(s, _)| *s < start || *s >= end);
        }
        Ok(())
    }

    async fn set_duration(&self, duration: f64) -> Result<(), media_source::MediaError> {
        info!(duration, "sink set_duration");
        Ok(())
    }

    async fn end_of_stream(&self) -> Result<(), media_source::MediaError> {
        info!("sink end_of_stream");
        Ok(())
    }

    async fn buffered_range(&self, content_type: manifest::ContentType) -> media_source::BufferedRanges {
        self.ranges.lock().await.get(&content_type).cloned().unwrap_or_default()
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(args).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            PlayerConfig::from_toml_str(&raw)?
        }
        None => PlayerConfig::default(),
    };

    let player = Player::new(config)?;
    let sink: Arc<dyn MediaSink> = Arc::new(NullSink::new());
    player.attach(sink).await;

    info!(uri = %args.uri, "loading manifest");
    player.load(&args.uri, &args.mime_type).await?;

    let progress = ProgressBar::new(args.ticks as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ticks ({msg})").unwrap(),
    );

    let mut current_time = 0.0;
    for tick in 0..args.ticks {
        let outcomes = player.tick(current_time).await?;
        let stats = player.get_stats().await?;
        progress.set_message(format!("t={current_time:.1}s bw={:.0}bps buffering={}", stats.estimated_bandwidth, stats.buffering));
        progress.set_position(tick as u64 + 1);
        for (content_type, outcome) in outcomes {
            tracing::debug!(?content_type, ?outcome, "tick outcome");
        }
        current_time += args.tick_seconds;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    progress.finish_with_message("done");

    let (variants, text_tracks) = player.get_tracks().await?;
    info!(variants = variants.len(), text_tracks = text_tracks.len(), "final track set");

    player.unload().await;
    let _ = CancellationToken::new();
    Ok(())
}
