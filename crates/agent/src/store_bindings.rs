//! The `Store bindings` collaborator interface from spec §6: `GetJobs`,
//! `GetJob`, `GetGroups`, `GetJobFromKv`, `GetGroupFromKv`,
//! `GetIDFromKey`, `WatchJobs`, `WatchGroups`, `WatchOnce`, implemented on
//! top of the generic `cronagent_store::Store` trait plus the key layout
//! in `keys.rs`.

use std::sync::Arc;

use cronagent_store::{KvEntry, Store, WatchStream};

use crate::error::{Error, Result};
use crate::group::Group;
use crate::ids::{GroupName, JobId};
use crate::job::Job;
use crate::keys;

pub fn job_from_kv(entry: &KvEntry) -> Result<Job> {
    serde_json::from_slice(&entry.value).map_err(|source| Error::MalformedEvent {
        key: entry.key.clone(),
        source,
    })
}

pub fn group_from_kv(entry: &KvEntry) -> Result<Group> {
    serde_json::from_slice(&entry.value).map_err(|source| Error::MalformedEvent {
        key: entry.key.clone(),
        source,
    })
}

pub fn id_from_key(key: &str) -> &str {
    keys::id_from_key(key)
}

pub struct StoreBindings {
    pub store: Arc<dyn Store>,
    pub namespace: String,
}

impl StoreBindings {
    pub fn new(store: Arc<dyn Store>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub async fn get_jobs(&self) -> Result<Vec<Job>> {
        let entries = self.store.get_prefix(&keys::job_prefix(&self.namespace)).await?;
        entries.iter().map(job_from_kv).collect()
    }

    pub async fn get_job(&self, group: &GroupName, id: &JobId) -> Result<Option<Job>> {
        let key = keys::job_key(&self.namespace, group, id);
        match self.store.get(&key).await? {
            Some(entry) => Ok(Some(job_from_kv(&entry)?)),
            None => Ok(None),
        }
    }

    pub async fn get_groups(&self) -> Result<Vec<Group>> {
        let entries = self
            .store
            .get_prefix(&keys::group_prefix(&self.namespace))
            .await?;
        entries.iter().map(group_from_kv).collect()
    }

    pub fn watch_jobs(&self) -> WatchStream {
        self.store.watch_prefix(&keys::job_prefix(&self.namespace))
    }

    pub fn watch_groups(&self) -> WatchStream {
        self.store.watch_prefix(&keys::group_prefix(&self.namespace))
    }

    pub fn watch_once(&self) -> WatchStream {
        self.store.watch_prefix(&keys::once_prefix(&self.namespace))
    }
}
