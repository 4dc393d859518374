pub mod error;
pub mod wheel;

pub use cron::Schedule;
pub use error::{parse, Error, Result};
pub use wheel::{BoxFuture, MemWheel, RunFn, TokioWheel, Wheel};
