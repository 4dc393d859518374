pub mod error;
pub mod etcd;
pub mod memory;
pub mod types;

pub use error::{Error, Result};
pub use memory::InMemoryStore;
pub use types::{KvEntry, LeaseId, WatchEvent, WatchKind};

use futures::Stream;
use std::pin::Pin;

pub type WatchStream = Pin<Box<dyn Stream<Item = WatchEvent> + Send>>;

/// The coordination-store capabilities the agent needs (spec §6): leases
/// with grant/keep-alive, key put/delete/get, and prefix-watch. Deliberately
/// the only trait in this workspace that performs network I/O, so the
/// reconciler can be driven against `InMemoryStore` in tests.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn lease_grant(&self, ttl_secs: i64) -> Result<LeaseId>;
    async fn lease_keep_alive(&self, id: LeaseId) -> Result<()>;
    async fn lease_revoke(&self, id: LeaseId) -> Result<()>;

    async fn put(&self, key: &str, value: Vec<u8>, lease: Option<LeaseId>) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<KvEntry>>;
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KvEntry>>;
    async fn delete(&self, key: &str) -> Result<()>;

    /// Long-lived watch over every key under `prefix`. Reconnection on
    /// transient failure is this trait's responsibility, not the caller's.
    fn watch_prefix(&self, prefix: &str) -> WatchStream;

    /// Closes the client (spec §4.1 shutdown step, spec §5 "watch streams
    /// are closed by closing the store client"). Called once, after the
    /// presence key is deleted and before the cron wheel stops.
    async fn close(&self);
}
