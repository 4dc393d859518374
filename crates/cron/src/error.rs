use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid cron expression {expr:?}: {source}")]
    InvalidExpression {
        expr: String,
        #[source]
        source: cron::error::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse a cron expression into a `cron::Schedule`, the canonical string
/// form of which (`schedule.to_string()` round-tripped through the parser)
/// is used throughout the agent as the `Timer` change-detection token.
pub fn parse(expr: &str) -> Result<cron::Schedule> {
    expr.parse::<cron::Schedule>()
        .map_err(|source| Error::InvalidExpression {
            expr: expr.to_string(),
            source,
        })
}
