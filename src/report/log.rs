// src/report/log.rs
// =============================================================================
// The response log.
//
// Every classified response goes to two places:
// 1. A leveled sink (info/warn/error). In the CLI this is `tracing`, so the
//    lines show up on the console with the usual level filtering.
// 2. A plain text file, one line per response, if logging is enabled.
//    The file is truncated when the run starts.
//
// The sink is a trait so tests can capture what would have been printed.
// =============================================================================

use super::record::{ResponseRecord, Severity};
use crate::error::SetupError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{error, info, warn};

/// Something that accepts leveled messages.
pub trait LogSink: Send {
    fn emit(&mut self, severity: Severity, message: &str);
}

// Forwards messages to the `tracing` macros
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warn => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}

pub struct ResponseLog {
    sink: Box<dyn LogSink>,
    file: Option<BufWriter<File>>,
}

impl ResponseLog {
    // Creates the log. When `logfile` is Some, the file is created (or
    // truncated) right away so a bad path fails before the crawl starts.
    pub fn new(sink: Box<dyn LogSink>, logfile: Option<&Path>) -> Result<Self, SetupError> {
        let file = match logfile {
            Some(path) => {
                let file = File::create(path).map_err(|source| SetupError::LogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
                Some(BufWriter::new(file))
            }
            None => None,
        };

        Ok(Self { sink, file })
    }

    /// Logs a classified response to the sink and, if enabled, the file.
    pub fn record(&mut self, record: &ResponseRecord<'_>) {
        self.sink.emit(record.severity(), &record.leveled_message());

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", record.message()) {
                warn!("Could not write to log file: {}", e);
            }
        }
    }

    /// Sends an error straight to the sink. Not written to the file.
    pub fn error(&mut self, message: &str) {
        self.sink.emit(Severity::Error, message);
    }

    // Flushes and closes the file. Called once at the end of a run.
    pub fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                warn!("Could not flush log file: {}", e);
            }
        }
    }
}

impl Drop for ResponseLog {
    fn drop(&mut self) {
        self.close();
    }
}

// A sink that remembers everything it was given. Test-only.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub lines: std::sync::Arc<std::sync::Mutex<Vec<(Severity, String)>>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn emit(&mut self, severity: Severity, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}
