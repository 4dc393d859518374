//! Registration, keep-alive, and shutdown (spec §4.1). Independent of the
//! reconciler: liveness advertisement and job execution are decoupled, so
//! this runs as its own loop against the shutdown broadcast channel, the
//! same pattern as the teacher's `GhostService::run_loop`.

use std::sync::Arc;
use std::time::Duration;

use cronagent_store::{LeaseId, Store};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::keys;

#[derive(Clone)]
pub struct Lifecycle {
    store: Arc<dyn Store>,
    namespace: String,
    node_id: NodeId,
    ttl_secs: i64,
}

impl Lifecycle {
    pub fn new(store: Arc<dyn Store>, namespace: impl Into<String>, node_id: NodeId, ttl_secs: i64) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            node_id,
            ttl_secs,
        }
    }

    /// **Register** (spec §4.1): fails fast if a live presence record
    /// exists for this `NodeID`. The lease TTL carries `+2` seconds of
    /// slack to absorb a single missed renewal.
    pub async fn register(&self) -> Result<LeaseId> {
        let key = keys::node_key(&self.namespace, &self.node_id);
        if self.store.get(&key).await?.is_some() {
            return Err(Error::AlreadyRegistered(self.node_id.to_string()));
        }
        let lease = self.store.lease_grant(self.ttl_secs + 2).await?;
        self.write_presence(lease).await?;
        info!(node_id = %self.node_id, lease = lease.0, "registered");
        Ok(lease)
    }

    async fn write_presence(&self, lease: LeaseId) -> Result<()> {
        let key = keys::node_key(&self.namespace, &self.node_id);
        let pid = std::process::id().to_string();
        self.store.put(&key, pid.into_bytes(), Some(lease)).await?;
        Ok(())
    }

    async fn reacquire(&self) -> Result<LeaseId> {
        let lease = self.store.lease_grant(self.ttl_secs + 2).await?;
        self.write_presence(lease).await?;
        Ok(lease)
    }

    /// **Keep-alive loop** (spec §4.1): one attempt every `ttl` seconds.
    /// On failure, drop the old lease handle and try a fresh grant +
    /// presence write; on failure of that, log and retry next tick. Exits
    /// only when the shutdown channel closes.
    pub async fn run_keep_alive(&self, initial_lease: LeaseId, mut shutdown: broadcast::Receiver<()>) {
        let mut lease = initial_lease;
        let mut ticker = tokio::time::interval(Duration::from_secs(self.ttl_secs.max(1) as u64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // the first tick fires immediately; register() just ran.

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("keep-alive loop exiting on shutdown");
                    return;
                }
                _ = ticker.tick() => {
                    match self.store.lease_keep_alive(lease).await {
                        Ok(()) => debug!(lease = lease.0, "lease renewed"),
                        Err(e) => {
                            warn!(error = %e, lease = lease.0, "keep-alive failed, reacquiring lease");
                            match self.reacquire().await {
                                Ok(new_lease) => {
                                    info!(lease = new_lease.0, "lease reacquired");
                                    lease = new_lease;
                                }
                                Err(e) => {
                                    error!(error = %e, "lease reacquisition failed, retrying next tick");
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// First step of **Shutdown** (spec §4.1): write the down-marker key.
    /// Split from `delete_presence` so `Agent::stop` can close the
    /// shutdown channel (stopping keep-alive) in between, matching the
    /// specified ordering.
    pub async fn mark_down(&self) -> Result<()> {
        let down_key = keys::node_down_key(&self.namespace, &self.node_id);
        self.store.put(&down_key, Vec::new(), None).await?;
        Ok(())
    }

    /// Second step of **Shutdown**: delete the presence key.
    pub async fn delete_presence(&self) -> Result<()> {
        let key = keys::node_key(&self.namespace, &self.node_id);
        self.store.delete(&key).await?;
        Ok(())
    }

    /// Convenience wrapper running both steps back to back, for callers
    /// that don't need to interleave the shutdown-channel close.
    pub async fn shutdown(&self) -> Result<()> {
        self.mark_down().await?;
        self.delete_presence().await
    }
}
