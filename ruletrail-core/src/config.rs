//! Telemetry configuration.
//!
//! ```yaml
//! enabled: true
//! format: json            # or "tracing" (default)
//! destination: /var/log/ruletrail
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::telemetry::writer::{self, JsonLinesSink};
use crate::telemetry::{NullSink, Sink, TracingSink};

/// Which backend committed telemetry goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryFormat {
    /// Structured `tracing` events on the `telemetry` target
    #[default]
    Tracing,
    /// JSON lines appended to `<destination>/telemetry.jsonl`
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub format: TelemetryFormat,

    /// Directory for the `json` format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
}

fn default_enabled() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: TelemetryFormat::default(),
            destination: None,
        }
    }
}

impl TelemetryConfig {
    /// Load configuration from a YAML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading telemetry config from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read telemetry config file")?;

        Self::from_yaml(&content)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No telemetry config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path).await
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Failed to parse telemetry config YAML")
    }

    pub fn destination(&self) -> PathBuf {
        self.destination
            .clone()
            .unwrap_or_else(writer::default_destination)
    }

    /// Build the sink this configuration selects.
    pub fn build_sink(&self) -> Result<Arc<dyn Sink>> {
        if !self.enabled {
            debug!("Telemetry disabled, events will be dropped");
            return Ok(Arc::new(NullSink));
        }
        match self.format {
            TelemetryFormat::Tracing => Ok(Arc::new(TracingSink)),
            TelemetryFormat::Json => {
                let destination = self.destination();
                let sink = JsonLinesSink::open_dir(&destination)?;
                debug!("Writing telemetry to {:?}", destination);
                Ok(Arc::new(sink))
            }
        }
    }
}
