//! CLI subcommands.

pub mod distance;
pub mod replay;

use std::fmt;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CommandError {
    /// Failed to read an input file.
    Io(std::io::Error),

    /// A trace line did not parse.
    Trace { line: usize, source: serde_json::Error },

    /// A coordinate argument was out of range.
    Coordinate(tollwatch::coord::CoordError),

    /// Failed to create the Tokio runtime.
    RuntimeCreation(std::io::Error),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Io(e) => write!(f, "failed to read input: {}", e),
            CommandError::Trace { line, source } => {
                write!(f, "invalid trace record on line {}: {}", line, source)
            }
            CommandError::Coordinate(e) => write!(f, "invalid coordinate: {}", e),
            CommandError::RuntimeCreation(e) => {
                write!(f, "failed to create Tokio runtime: {}", e)
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Io(e) => Some(e),
            CommandError::Trace { source, .. } => Some(source),
            CommandError::Coordinate(e) => Some(e),
            CommandError::RuntimeCreation(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError::Io(e)
    }
}
