//! File-based export sink.

use std::path::PathBuf;

use salabot_server::ExportSink;

/// Writes export artifacts as CSV files into a directory.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    dir: PathBuf,
}

impl CsvFileSink {
    /// Creates a sink writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExportSink for CsvFileSink {
    fn deliver(&self, filename: &str, csv: &str) -> std::io::Result<()> {
        std::fs::write(self.dir.join(filename), csv)
    }
}
