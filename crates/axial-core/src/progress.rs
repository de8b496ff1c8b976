//! Progress reporting, cancellation polling and log dispatch.
//!
//! Analyses never talk to callers directly; they report through a
//! [`ProgressSink`] handed in by the boundary layer. The kernel polls the
//! sink at bounded intervals (every ~1024 queue pops) and unwinds with
//! `EngineError::Cancelled` when the sink asks for a stop. Log messages are
//! severity tagged and mirrored as `tracing` events so native consumers see
//! them even without a registered callback.

use crate::error::{EngineError, EngineResult};

/// Severity for dispatched log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum LogLevel {
    Verbose = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

/// Receiver for progress, cancellation and log traffic.
///
/// Implementations must be cheap: `report` is called from hot loops. The
/// default implementation ignores everything and never cancels.
pub trait ProgressSink: Sync {
    /// Report progress in [0, 1] with an optional status text. Returns
    /// `true` when the caller wants the computation cancelled.
    fn report(&self, status: Option<&str>, progress: f32) -> bool {
        let _ = (status, progress);
        false
    }

    /// Dispatch a severity-tagged log message.
    fn log(&self, level: LogLevel, domain: Option<&str>, message: &str) {
        match level {
            LogLevel::Verbose => tracing::debug!(domain, "{message}"),
            LogLevel::Info => tracing::info!(domain, "{message}"),
            LogLevel::Warning => tracing::warn!(domain, "{message}"),
            LogLevel::Error => tracing::error!(domain, "{message}"),
        }
    }
}

/// Sink that ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// Poll helper: turns a cancel request into the error the kernel unwinds
/// with.
pub fn check_cancel(sink: &dyn ProgressSink, status: Option<&str>, progress: f32) -> EngineResult<()> {
    if sink.report(status, progress) {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}

/// Sub-range view over a parent sink, used when an analysis runs several
/// phases and wants each to fill a share of the progress bar.
pub struct SubProgress<'a> {
    parent: &'a dyn ProgressSink,
    offset: f32,
    scale: f32,
}

impl<'a> SubProgress<'a> {
    pub fn new(parent: &'a dyn ProgressSink, offset: f32, scale: f32) -> Self {
        Self {
            parent,
            offset,
            scale,
        }
    }
}

impl ProgressSink for SubProgress<'_> {
    fn report(&self, status: Option<&str>, progress: f32) -> bool {
        self.parent
            .report(status, self.offset + progress.clamp(0.0, 1.0) * self.scale)
    }

    fn log(&self, level: LogLevel, domain: Option<&str>, message: &str) {
        self.parent.log(level, domain, message);
    }
}
