//! Error types for meshpress

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for meshpress operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse mesh {}{}: {message}", path.display(), line_suffix(*line))]
    Parse {
        path: PathBuf,
        /// 1-based source line, when the failure is tied to one
        line: Option<usize>,
        message: String,
    },

    #[error("unsupported face {face} with {arity} vertices (only triangles and quads are supported)")]
    UnsupportedTopology { face: usize, arity: usize },

    #[error(
        "decimation factor {factor} on {triangle_count} triangles gives target {target}; \
         the factor must lie in (0, 1] and the target must be at least 1 triangle"
    )]
    InvalidDecimation {
        factor: f64,
        triangle_count: usize,
        target: usize,
    },

    #[error("failed to write mesh {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {}: {message}", path.display())]
    ImageDecode { path: PathBuf, message: String },

    #[error("failed to write image {}: {message}", path.display())]
    ImageWrite { path: PathBuf, message: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn line_suffix(line: Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

/// Stable classification of [`Error`] for callers mapping failures onto
/// their own transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ParseError,
    UnsupportedTopologyError,
    InvalidDecimationError,
    WriteError,
    ImageDecodeError,
    ImageWriteError,
    InvalidData,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "ParseError",
            ErrorKind::UnsupportedTopologyError => "UnsupportedTopologyError",
            ErrorKind::InvalidDecimationError => "InvalidDecimationError",
            ErrorKind::WriteError => "WriteError",
            ErrorKind::ImageDecodeError => "ImageDecodeError",
            ErrorKind::ImageWriteError => "ImageWriteError",
            ErrorKind::InvalidData => "InvalidData",
            ErrorKind::Io => "Io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Build a parse error tied to a source line
    pub fn parse_at(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            line: Some(line),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse { .. } => ErrorKind::ParseError,
            Error::UnsupportedTopology { .. } => ErrorKind::UnsupportedTopologyError,
            Error::InvalidDecimation { .. } => ErrorKind::InvalidDecimationError,
            Error::Write { .. } => ErrorKind::WriteError,
            Error::ImageDecode { .. } => ErrorKind::ImageDecodeError,
            Error::ImageWrite { .. } => ErrorKind::ImageWriteError,
            Error::InvalidData(_) => ErrorKind::InvalidData,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias for meshpress operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_includes_line() {
        let err = Error::parse_at("model.obj", 7, "invalid vertex coordinate 'abc'");
        let msg = err.to_string();
        assert!(msg.contains("model.obj"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("abc"));
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_unsupported_topology_names_arity() {
        let err = Error::UnsupportedTopology { face: 2, arity: 5 };
        assert!(err.to_string().contains("5 vertices"));
        assert_eq!(err.kind().as_str(), "UnsupportedTopologyError");
    }

    #[test]
    fn test_write_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::Write {
            path: PathBuf::from("out.obj"),
            source: io,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.kind(), ErrorKind::WriteError);
    }
}
