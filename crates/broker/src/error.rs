use std::error::Error as StdError;

/// Crate-wide result type for broker operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The queue's receiving side is gone.
    #[error("queue closed: {queue}")]
    Closed { queue: String },

    /// A queue can only have one consumer per broker handle.
    #[error("queue already has a consumer: {queue}")]
    AlreadyConsumed { queue: String },

    /// Wrapped error from the broker client.
    #[error("broker operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn external_boxed(
        context: impl Into<String>,
        source: Box<dyn StdError + Send + Sync>,
    ) -> Self {
        Self::External {
            context: context.into(),
            source,
        }
    }
}
