use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("node {0} is already registered")]
    AlreadyRegistered(String),

    #[error("store unavailable: {0}")]
    Store(#[from] cronagent_store::Error),

    #[error(transparent)]
    Core(#[from] cronagent_core::Error),

    #[error("invalid cron expression: {0}")]
    Cron(#[from] cronagent_cron::Error),

    #[error("malformed event at {key}: {source}")]
    MalformedEvent {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
