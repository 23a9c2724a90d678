//! Error taxonomy shared by collectors, route sources and the emitter.

use std::fmt;
use std::io;

/// Error raised while gathering facts or writing records.
///
/// Everything except [`ProbeError::SinkWrite`] is downgraded into a collector
/// outcome by the engine and never aborts a run.
#[derive(Debug)]
pub enum ProbeError {
    /// Insufficient privilege to read a fact source.
    AccessDenied(String),
    /// Target path, application or resource is absent.
    NotFound(String),
    /// Application spec cannot be loaded or introspected.
    ResolutionError(String),
    /// Collector exceeded its time budget.
    Timeout(String),
    /// Output destination unwritable or unavailable. Fatal to the run.
    SinkWrite(String),
    /// Any other I/O error.
    Io(io::Error),
    /// Malformed content in a fact source.
    Parse(String),
}

impl ProbeError {
    /// Classifies an I/O error, prefixing the message with `context`
    /// (usually the path being read).
    pub fn from_io(context: impl fmt::Display, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => {
                ProbeError::AccessDenied(format!("{}: {}", context, err))
            }
            io::ErrorKind::NotFound => ProbeError::NotFound(format!("{}: {}", context, err)),
            _ => ProbeError::Io(io::Error::new(err.kind(), format!("{}: {}", context, err))),
        }
    }

    /// Short taxonomy label, used as a prefix in outcome error strings.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeError::AccessDenied(_) => "AccessDenied",
            ProbeError::NotFound(_) => "NotFound",
            ProbeError::ResolutionError(_) => "ResolutionError",
            ProbeError::Timeout(_) => "Timeout",
            ProbeError::SinkWrite(_) => "SinkWriteError",
            ProbeError::Io(_) => "Io",
            ProbeError::Parse(_) => "Parse",
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::AccessDenied(msg) => write!(f, "access denied: {}", msg),
            ProbeError::NotFound(msg) => write!(f, "not found: {}", msg),
            ProbeError::ResolutionError(msg) => write!(f, "resolution error: {}", msg),
            ProbeError::Timeout(msg) => write!(f, "timeout: {}", msg),
            ProbeError::SinkWrite(msg) => write!(f, "sink write error: {}", msg),
            ProbeError::Io(e) => write!(f, "I/O error: {}", e),
            ProbeError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        ProbeError::from_io("I/O", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classifies_kinds() {
        let denied = ProbeError::from_io(
            "/root/secret",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(denied, ProbeError::AccessDenied(_)));
        assert_eq!(denied.label(), "AccessDenied");

        let missing =
            ProbeError::from_io("/nope", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(missing, ProbeError::NotFound(ref m) if m.contains("/nope")));

        let other = ProbeError::from_io("/x", io::Error::other("boom"));
        assert!(matches!(other, ProbeError::Io(_)));
    }

    #[test]
    fn test_display_includes_message() {
        let err = ProbeError::Timeout("Network exceeded 30s".to_string());
        assert_eq!(err.to_string(), "timeout: Network exceeded 30s");
    }
}
