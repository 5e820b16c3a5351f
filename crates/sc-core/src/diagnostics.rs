//! Injectable diagnostics sinks.
//!
//! Calibration code never logs through a global logger.  Every operation that
//! emits diagnostics takes a `&dyn Diagnostics`, and only the outermost entry
//! point picks a default ([`TracingDiagnostics`]).

use std::fmt;
use std::sync::Mutex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default logger name used by the calibration entry points.
pub const DEFAULT_LOGGER_NAME: &str = "cmdty.storage.calibration.seasonal-three-factor";

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiagnosticLevel {
    /// Fine-grained per-evaluation detail.
    Debug,
    /// Once-per-run information.
    Info,
    /// Something the caller should look at.
    Warn,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticLevel::Debug => "DEBUG",
            DiagnosticLevel::Info => "INFO",
            DiagnosticLevel::Warn => "WARN",
        })
    }
}

/// A logging capability threaded through the calibration call.
pub trait Diagnostics: Send + Sync {
    /// Informational message.
    fn info(&self, message: &str);

    /// Debug message. Callers should check [`Diagnostics::debug_enabled`]
    /// before formatting expensive messages.
    fn debug(&self, message: &str);

    /// Warning message.
    fn warn(&self, message: &str);

    /// Whether debug messages are consumed at all.
    fn debug_enabled(&self) -> bool {
        true
    }
}

/// Forwards diagnostics to the `tracing` ecosystem.
///
/// Every event carries a `logger` field holding the sink's name, so a
/// subscriber can filter calibration output the same way regardless of which
/// crate emitted it.
#[derive(Debug, Clone)]
pub struct TracingDiagnostics {
    name: String,
}

impl TracingDiagnostics {
    /// Create a sink tagged with `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Logger name attached to each event.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for TracingDiagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_LOGGER_NAME)
    }
}

impl Diagnostics for TracingDiagnostics {
    fn info(&self, message: &str) {
        tracing::info!(logger = %self.name, "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(logger = %self.name, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(logger = %self.name, "{message}");
    }

    fn debug_enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::DEBUG)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn info(&self, _message: &str) {}

    fn debug(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}

    fn debug_enabled(&self) -> bool {
        false
    }
}

/// One captured diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiagnosticRecord {
    /// Severity.
    pub level: DiagnosticLevel,
    /// Rendered message.
    pub message: String,
}

/// Keeps every diagnostic in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl RecordingDiagnostics {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured records.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.lock().clone()
    }

    /// Messages captured at `level`, in order.
    pub fn messages(&self, level: DiagnosticLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    /// Drop everything captured so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn push(&self, level: DiagnosticLevel, message: &str) {
        self.lock().push(DiagnosticRecord {
            level,
            message: message.to_owned(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DiagnosticRecord>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn info(&self, message: &str) {
        self.push(DiagnosticLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.push(DiagnosticLevel::Debug, message);
    }

    fn warn(&self, message: &str) {
        self.push(DiagnosticLevel::Warn, message);
    }
}
