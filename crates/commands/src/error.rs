use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("commands directory not found: {}", path.display())]
    MissingDir { path: PathBuf },

    #[error("no command files found in {}", path.display())]
    NoCommands { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid command file {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A descriptor names a command no handler kind implements.
    #[error("command '{name}' has no handler")]
    NoHandler { name: String },

    /// A descriptor names a handler kind outside the configured set.
    #[error("command '{name}' is not enabled in the {set} handler set")]
    NotEnabled { name: String, set: &'static str },

    #[error("command '{name}' is defined more than once")]
    Duplicate { name: String },

    #[error(transparent)]
    Storage(#[from] courier_storage::Error),

    #[error(transparent)]
    Broker(#[from] courier_broker::Error),
}
