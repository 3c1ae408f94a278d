//! Error types for the activity logging crate

use thiserror::Error;

/// Result type for activity logging operations
pub type Result<T> = std::result::Result<T, ActivityLogError>;

/// Errors surfaced by activity logging operations
#[derive(Debug, Error)]
pub enum ActivityLogError {
    /// The logger needs a tokio runtime to pump events and none was active
    #[error("no tokio runtime available: {0}")]
    Runtime(String),

    /// An output sink rejected an entry
    #[error("sink write failed: {0}")]
    Sink(#[from] SinkError),

    /// A formatter failed to render an event
    #[error("formatting failed: {0}")]
    Format(#[from] FormatError),
}

/// Errors produced by output sinks
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying I/O failure while writing an entry
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink can no longer accept entries
    #[error("sink closed: {0}")]
    Closed(String),
}

/// Errors produced by formatters
#[derive(Debug, Error)]
pub enum FormatError {
    /// Serializing a structured record failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The formatter could not render the event
    #[error("render error: {0}")]
    Render(String),
}

/// Format an error together with its cause chain
pub fn error_chain(error: &dyn std::error::Error) -> String {
    chain_recursive(error, 0)
}

fn chain_recursive(error: &dyn std::error::Error, depth: usize) -> String {
    const MAX_DEPTH: usize = 10;

    if depth >= MAX_DEPTH {
        return error.to_string();
    }

    let base = error.to_string();

    match error.source() {
        Some(source) => format!("{}: caused by: {}", base, chain_recursive(source, depth + 1)),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_chain_single_error() {
        let error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        assert_eq!(error_chain(&error), "file not found");
    }

    #[test]
    fn test_error_chain_nested() {
        #[derive(Debug, Error)]
        #[error("outer failed")]
        struct Outer {
            #[source]
            inner: io::Error,
        }

        let error = Outer {
            inner: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        };

        assert_eq!(
            error_chain(&error),
            "outer failed: caused by: connection refused"
        );
    }

    #[test]
    fn test_sink_error_from_io() {
        let error: SinkError = io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe").into();
        assert!(matches!(error, SinkError::Io(_)));
        assert!(error.to_string().contains("broken pipe"));
    }
}
