use std::path::PathBuf;

/// Crate-wide result type for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),

    /// One or more error-level diagnostics, joined for display.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Error {
    pub(crate) fn parse(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}
