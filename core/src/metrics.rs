//! Cycle metrics sink — one CSV line per processing cycle, consumed
//! by an external dashboard. Never read back by the pipeline, and a
//! write failure must never take the loop down.

use crate::processor::CycleStats;
use chrono::Utc;
use std::io::Write;
use std::path::PathBuf;

const HEADER: &str = "ts_utc,events_per_min,feature_latency_ms,queue_lag\n";

pub struct MetricsSink {
    path: Option<PathBuf>,
}

impl MetricsSink {
    /// A sink writing to `path`, or a no-op sink for None. The header
    /// row is written when the file is first created.
    pub fn new(path: Option<&str>) -> Self {
        let path = path.map(PathBuf::from);
        if let Some(p) = &path {
            if let Err(e) = ensure_header(p) {
                log::warn!("metrics: cannot initialize {}: {e}", p.display());
            }
        }
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Append one cycle's line. Failures are logged and swallowed.
    pub fn record(&self, stats: &CycleStats) {
        let Some(path) = &self.path else { return };
        let line = format!(
            "{},{:.1},{:.1},{}\n",
            Utc::now().to_rfc3339(),
            stats.events_per_min(),
            stats.feature_latency_ms(),
            stats.queue_lag,
        );
        if let Err(e) = append_line(path, &line) {
            log::warn!("metrics: cannot append to {}: {e}", path.display());
        }
    }
}

fn ensure_header(path: &PathBuf) -> std::io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, HEADER)
}

fn append_line(path: &PathBuf, line: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
    file.write_all(line.as_bytes())
}
