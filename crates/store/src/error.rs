use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("lease expired or unknown: {0}")]
    LeaseExpired(i64),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("malformed value at {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
