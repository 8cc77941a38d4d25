//! JSON-lines telemetry output.
//!
//! Each committed event becomes one JSON object on its own line (handy for
//! log shippers like Promtail), decorated with `level` and `timestamp`.

use anyhow::{Context as _, Result};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::sink::{Sink, SinkEvent};

/// File name used inside a telemetry destination directory
pub const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Sink writing one JSON line per committed event.
pub struct JsonLinesSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Append to `telemetry.jsonl` inside `destination`, creating the
    /// directory if needed.
    pub fn open_dir(destination: &Path) -> Result<Self> {
        if !destination.exists() {
            fs::create_dir_all(destination).with_context(|| {
                format!("Failed to create telemetry directory {:?}", destination)
            })?;
        }
        let path = destination.join(TELEMETRY_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open telemetry file {:?}", path))?;
        Ok(Self::new(file))
    }

    /// Render an event as a single JSON line (without the newline).
    pub fn format_line(event: &SinkEvent) -> Result<String> {
        let mut record = event.to_json();
        if let Value::Object(ref mut map) = record {
            map.insert("level".into(), Value::String(event.level().to_string()));
            map.insert(
                "timestamp".into(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        Ok(serde_json::to_string(&record)?)
    }

    fn write_event(&self, event: &SinkEvent) -> Result<()> {
        let line = Self::format_line(event)?;
        let mut out = self.out.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

impl Sink for JsonLinesSink {
    fn commit(&self, event: SinkEvent) {
        if let Err(e) = self.write_event(&event) {
            warn!("Failed to write telemetry: {}", e);
        }
    }
}

/// Read back every record from a JSON-lines telemetry file. Blank lines are
/// skipped; a malformed line is an error naming its line number.
pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Malformed telemetry record on line {}", idx + 1))?;
        records.push(value);
    }
    Ok(records)
}

/// Default destination directory for file telemetry.
pub fn default_destination() -> PathBuf {
    PathBuf::from(".ruletrail/telemetry")
}
