use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything the launcher core can fail with
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("{file_name}: no main() method found to run")]
    NoEntryPoint { file_name: String },

    #[error("{file_name}: invalid script: {reason}")]
    InvalidScript { file_name: String, reason: String },

    #[error("{file_name}: failed to load: {message}")]
    ScriptLoad { file_name: String, message: String },

    #[error("{file_name}: main() raised: {message}")]
    ScriptFailed { file_name: String, message: String },

    #[error("no script matches '{0}'")]
    UnknownScript(String),

    #[error("'{selection}' is ambiguous, candidates: {}", .candidates.join(", "))]
    AmbiguousScript {
        selection: String,
        candidates: Vec<String>,
    },

    #[error("settings file {} is corrupt: {source}", .path.display())]
    CorruptSettings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read scripts directory {}: {source}", .path.display())]
    ScriptsDirUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("python: {0}")]
    Python(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<pyo3::PyErr> for LauncherError {
    fn from(err: pyo3::PyErr) -> Self {
        Self::Python(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;

impl LauncherError {
    /// File name of the script the error is about, if any
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::NoEntryPoint { file_name }
            | Self::InvalidScript { file_name, .. }
            | Self::ScriptLoad { file_name, .. }
            | Self::ScriptFailed { file_name, .. } => Some(file_name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entry_point_message() {
        let err = LauncherError::NoEntryPoint {
            file_name: "hello.py".into(),
        };
        assert_eq!(err.to_string(), "hello.py: no main() method found to run");
        assert_eq!(err.file_name(), Some("hello.py"));
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = LauncherError::AmbiguousScript {
            selection: "Backup".into(),
            candidates: vec!["a.py".into(), "b.py".into()],
        };
        assert_eq!(
            err.to_string(),
            "'Backup' is ambiguous, candidates: a.py, b.py"
        );
        assert_eq!(err.file_name(), None);
    }
}
