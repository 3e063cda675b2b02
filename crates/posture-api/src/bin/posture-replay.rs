//! Replay a recorded client message log through a posture connection.
//!
//! Input is JSON lines, one client message per line. A line may carry an
//! `"at"` field (seconds) giving its receive time; lines without one are
//! spaced `--interval-ms` apart.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use posture_api::{Connection, ServerMessage, ServiceConfig};
use posture_core::Timestamp;
use posture_session::InMemoryStore;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "posture-replay", about = "Replay a posture message log", version)]
struct Args {
    /// JSON-lines file of client messages
    file: PathBuf,

    /// Configuration file (environment overrides still apply)
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Spacing for lines without an "at" field, in milliseconds
    #[arg(long, default_value = "100")]
    interval_ms: u64,

    /// Pretty-print server messages
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config from {path}"))?,
        None => ServiceConfig::from_env().context("loading config from environment")?,
    };

    let file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("opening {}", args.file.display()))?;
    let mut lines = BufReader::new(file).lines();

    let store = Arc::new(InMemoryStore::new());
    let mut connection = Connection::new(Arc::clone(&store), config);

    let mut clock = ReplayClock::new(Timestamp::now(), args.interval_ms as f64 / 1000.0);
    let mut line_no = 0usize;
    let mut emitted = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let now = clock.advance(recorded_time(line));

        if let Some(ping) = connection.idle_check_at(now) {
            emit(&ping, args.pretty)?;
            emitted += 1;
        }
        for reply in connection.handle_text_at(line, now).await {
            emit(&reply, args.pretty)?;
            emitted += 1;
        }
    }

    if let Some(summary) = connection.close().await? {
        tracing::info!(session_id = %summary.session_id, grade = summary.grade, "open session saved at end of log");
    }

    tracing::info!(
        lines = line_no,
        emitted,
        sessions = store.session_count().await,
        "replay finished"
    );
    Ok(())
}

/// Receive times for replayed messages
struct ReplayClock {
    start: Timestamp,
    step_secs: f64,
    first: bool,
    current: Timestamp,
}

impl ReplayClock {
    fn new(start: Timestamp, step_secs: f64) -> Self {
        Self {
            start,
            step_secs,
            first: true,
            current: start,
        }
    }

    /// Time of the next message: its recorded offset from the start, or one
    /// step after the previous message. The first unstamped message lands on the start.
    fn advance(&mut self, recorded: Option<f64>) -> Timestamp {
        self.current = match recorded {
            Some(secs) => Timestamp::from_secs_f64(self.start.as_secs_f64() + secs),
            None if self.first => self.start,
            None => Timestamp::from_secs_f64(self.current.as_secs_f64() + self.step_secs),
        };
        self.first = false;
        self.current
    }
}

fn recorded_time(line: &str) -> Option<f64> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value.get("at")?.as_f64().filter(|secs| secs.is_finite())
}

fn emit(message: &ServerMessage, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(message)?
    } else {
        serde_json::to_string(message)?
    };
    println!("{json}");
    Ok(())
}
