//! Unified error type for the engine.
//!
//! Every analysis and builder reports failures through [`EngineError`], so the
//! FFI boundary can map any failure to a log line plus a `false` return. Local
//! recovery (dropping a degenerate line, emitting a sentinel for an
//! unreachable destination) never surfaces here.

use thiserror::Error;

/// Unified error type for graph building, traversal and analyses.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Shape/size/enum violation in caller-supplied input.
    #[error("bad input: {0}")]
    BadInput(String),

    /// A scratch allocation exceeded the internal cap, or an entity count
    /// would overflow the 32-bit index space.
    #[error("memory limit exceeded: {0}")]
    MemoryLimit(String),

    /// The progress callback requested cancellation.
    #[error("cancelled")]
    Cancelled,

    /// A descriptor carried an unknown version.
    #[error("unsupported descriptor version {0}")]
    VersionMismatch(u32),

    /// Numeric degeneracy that could not be recovered locally.
    #[error("numeric degeneracy: {0}")]
    Numeric(String),

    /// Generic wrapper for context chains out of internal helpers.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the workspace.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Other(err.to_string())
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

impl EngineError {
    /// True when the failure was an explicit cancellation rather than an
    /// input or resource problem. Cancellations are logged at verbose level
    /// only.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::BadInput("line count is zero".into());
        assert!(err.to_string().contains("bad input"));
        assert!(err.to_string().contains("line count is zero"));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> EngineResult<()> {
            Err(EngineError::VersionMismatch(7))
        }

        fn outer() -> EngineResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(EngineError::VersionMismatch(7))));
    }

    #[test]
    fn test_cancelled_flag() {
        assert!(EngineError::Cancelled.is_cancelled());
        assert!(!EngineError::BadInput("x".into()).is_cancelled());
    }
}
