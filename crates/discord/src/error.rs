use std::error::Error as StdError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid snowflake: {0}")]
    InvalidId(String),

    #[error("discord request failed: {context}: {source}")]
    Discord {
        context: String,
        #[source]
        source: Box<serenity::Error>,
    },

    #[error(transparent)]
    Broker(#[from] courier_broker::Error),

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn discord(context: impl Into<String>, source: serenity::Error) -> Self {
        Self::Discord {
            context: context.into(),
            source: Box::new(source),
        }
    }

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
}
