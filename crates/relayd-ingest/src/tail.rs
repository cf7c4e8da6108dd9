//! Log tail duty: follow the relay access log and feed the aggregate
//! table.
//!
//! Follow semantics: the first open seeks to end-of-file so history is
//! never double-counted; truncation resets to the start; a vanished
//! file is reopened after a bounded delay with throttled warnings.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relayd_core::defaults;

use crate::aggregate::TrafficTable;
use crate::parse::{parse_line, ParsedLine};

pub(crate) struct TailConfig {
    pub path: PathBuf,
    pub poll_interval: Duration,
    pub reopen_delay: Duration,
}

/// Run the tail loop until the shutdown token is cancelled.
pub(crate) async fn run_tail(config: TailConfig, table: TrafficTable, shutdown: CancellationToken) {
    let mut warned_at: Option<Instant> = None;
    // Only the very first open starts at end-of-file; reopens after
    // truncation or rotation read the new content from the start.
    let mut seek_end = true;
    // Carries a partial line across reads until its newline arrives.
    let mut pending = String::new();

    'reopen: loop {
        if shutdown.is_cancelled() {
            return;
        }

        let file = match File::open(&config.path).await {
            Ok(file) => file,
            Err(e) => {
                warn_throttled(&mut warned_at, &config.path, &e);
                if sleep_or_cancelled(config.reopen_delay, &shutdown).await {
                    return;
                }
                continue;
            }
        };
        warned_at = None;

        let mut reader = BufReader::new(file);
        let mut pos = 0u64;
        if seek_end {
            pos = reader.seek(SeekFrom::End(0)).await.unwrap_or(0);
            seek_end = false;
        }
        pending.clear();

        let mut chunk = String::new();
        loop {
            chunk.clear();
            match reader.read_line(&mut chunk).await {
                Ok(0) => {
                    // EOF: wait for more data, watching for truncation
                    // or removal of the file underneath us.
                    if sleep_or_cancelled(config.poll_interval, &shutdown).await {
                        return;
                    }
                    match tokio::fs::metadata(&config.path).await {
                        Ok(meta) if meta.len() < pos => {
                            debug!(path = %config.path.display(), "log truncated, reopening from start");
                            continue 'reopen;
                        }
                        Ok(_) => {}
                        Err(_) => {
                            debug!(path = %config.path.display(), "log vanished, reopening");
                            continue 'reopen;
                        }
                    }
                }
                Ok(n) => {
                    pos += n as u64;
                    pending.push_str(&chunk);
                    if pending.ends_with('\n') {
                        process_line(&table, &pending);
                        pending.clear();
                    }
                }
                Err(e) => {
                    warn!(path = %config.path.display(), error = %e, "log read failed, reopening");
                    if sleep_or_cancelled(config.reopen_delay, &shutdown).await {
                        return;
                    }
                    continue 'reopen;
                }
            }
        }
    }
}

fn process_line(table: &TrafficTable, line: &str) {
    match parse_line(line) {
        ParsedLine::Structured(record) => {
            // correlation_key is always present for a Structured result
            if let Some(key) = record.correlation_key() {
                table.record(key, record.upload, record.download);
            }
        }
        ParsedLine::Correlatable(key) => table.touch(&key),
        ParsedLine::Unrecognized => {}
    }
}

/// Sleep for `duration`, returning true if cancelled first.
async fn sleep_or_cancelled(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

fn warn_throttled(warned_at: &mut Option<Instant>, path: &Path, err: &std::io::Error) {
    let now = Instant::now();
    let due = warned_at.map_or(true, |t| {
        now.duration_since(t) >= Duration::from_secs(defaults::TAIL_WARN_INTERVAL_SECS)
    });
    if due {
        warn!(path = %path.display(), error = %err, "relay access log unavailable, retrying");
        *warned_at = Some(now);
    }
}
