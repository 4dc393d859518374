use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;

use crate::{Error, KvEntry, LeaseId, Result, Store, WatchEvent, WatchKind, WatchStream};

struct Entry {
    value: Vec<u8>,
    lease: Option<LeaseId>,
}

/// In-process fake of the coordination store, generalising the teacher's
/// `RwLock<Vec<CronJob>>` (`crates/scheduler/src/cron_service.rs`) to a
/// keyed store with prefix-watch, so the reconciler can be exercised in
/// tests without a live etcd.
pub struct InMemoryStore {
    kv: RwLock<HashMap<String, Entry>>,
    leases: RwLock<HashMap<i64, ()>>,
    next_lease: AtomicI64,
    events: broadcast::Sender<WatchEvent>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            kv: RwLock::new(HashMap::new()),
            leases: RwLock::new(HashMap::new()),
            next_lease: AtomicI64::new(1),
            events,
        }
    }

    async fn revoke_locked(&self, id: LeaseId) -> Result<()> {
        let mut leases = self.leases.write().await;
        if leases.remove(&id.0).is_none() {
            return Ok(());
        }
        drop(leases);

        let mut kv = self.kv.write().await;
        let dead: Vec<String> = kv
            .iter()
            .filter(|(_, e)| e.lease == Some(id))
            .map(|(k, _)| k.clone())
            .collect();
        for key in dead {
            kv.remove(&key);
            let _ = self.events.send(WatchEvent {
                kind: WatchKind::Delete,
                key,
                value: Vec::new(),
            });
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn lease_grant(&self, _ttl_secs: i64) -> Result<LeaseId> {
        let id = self.next_lease.fetch_add(1, Ordering::SeqCst);
        self.leases.write().await.insert(id, ());
        Ok(LeaseId(id))
    }

    async fn lease_keep_alive(&self, id: LeaseId) -> Result<()> {
        if self.leases.read().await.contains_key(&id.0) {
            Ok(())
        } else {
            Err(Error::LeaseExpired(id.0))
        }
    }

    async fn lease_revoke(&self, id: LeaseId) -> Result<()> {
        self.revoke_locked(id).await
    }

    async fn put(&self, key: &str, value: Vec<u8>, lease: Option<LeaseId>) -> Result<()> {
        if let Some(id) = lease {
            if !self.leases.read().await.contains_key(&id.0) {
                return Err(Error::LeaseExpired(id.0));
            }
        }
        self.kv.write().await.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                lease,
            },
        );
        let _ = self.events.send(WatchEvent {
            kind: WatchKind::Put,
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        Ok(self.kv.read().await.get(key).map(|e| KvEntry {
            key: key.to_string(),
            value: e.value.clone(),
        }))
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KvEntry>> {
        Ok(self
            .kv
            .read()
            .await
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, e)| KvEntry {
                key: k.clone(),
                value: e.value.clone(),
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.kv.write().await.remove(key).is_some() {
            let _ = self.events.send(WatchEvent {
                kind: WatchKind::Delete,
                key: key.to_string(),
                value: Vec::new(),
            });
        }
        Ok(())
    }

    fn watch_prefix(&self, prefix: &str) -> WatchStream {
        let prefix = prefix.to_string();
        let rx = self.events.subscribe();
        let stream = BroadcastStream::new(rx)
            .filter_map(|item| async { item.ok() })
            .filter(move |ev| {
                let matches = ev.key.starts_with(&prefix);
                async move { matches }
            });
        Box::pin(stream)
    }

    async fn close(&self) {}
}

pub type SharedStore = Arc<dyn Store>;
