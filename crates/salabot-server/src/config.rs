//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// Engine configuration.
///
/// All fields have defaults so a missing or partial `config.toml` works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path of the durable reservation image.
    pub data_file: PathBuf,

    /// Seconds between reminder sweeps.
    pub sweep_interval_secs: u64,

    /// Reservations per calendar page.
    pub page_size: usize,

    /// Local times of day for the scheduled export, as `HH:MM`.
    pub export_times: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("reservations.json"),
            sweep_interval_secs: 60,
            page_size: 10,
            export_times: vec!["08:00".to_string(), "13:00".to_string()],
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| EngineError::config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Builder: set the data file path.
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }

    /// Builder: set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = interval.as_secs();
        self
    }

    /// Builder: set the calendar page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// The reminder sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Parsed export times; entries that are not `HH:MM` are skipped
    /// with a warning.
    pub fn export_times(&self) -> Vec<NaiveTime> {
        self.export_times
            .iter()
            .filter_map(|raw| match NaiveTime::parse_from_str(raw, "%H:%M") {
                Ok(t) => Some(t),
                Err(_) => {
                    warn!(time = %raw, "Skipping unparseable export time");
                    None
                }
            })
            .collect()
    }
}
