//! The three change-stream watchers plus the one-shot watcher (spec §4.5,
//! §5): each consumes its stream sequentially and decodes events into
//! `ReconcilerMsg`s for the single reconciler task. Per-stream order is
//! preserved; there is no ordering guarantee across streams.
//!
//! Each watcher also observes the shutdown broadcast channel (spec §9
//! "Shutdown races": watcher loops must observe the same `done` signal as
//! the rest of the agent), so closing it terminates the watcher promptly
//! instead of leaving it running against a store client that may itself
//! take a while to tear down.

use std::sync::Arc;

use cronagent_store::{KvEntry, WatchKind};
use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ids::{GroupId, JobId, NodeId};
use crate::keys;
use crate::messages::ReconcilerMsg;
use crate::store_bindings::{group_from_kv, job_from_kv, StoreBindings};

pub fn spawn_job_watcher(
    bindings: Arc<StoreBindings>,
    tx: mpsc::Sender<ReconcilerMsg>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = bindings.watch_jobs();
        loop {
            let ev = tokio::select! {
                _ = shutdown.recv() => {
                    debug!("job watcher exiting on shutdown");
                    return;
                }
                ev = stream.next() => ev,
            };
            let Some(ev) = ev else {
                debug!("job watch stream closed");
                return;
            };
            let msg = match ev.kind {
                WatchKind::Put => {
                    let entry = KvEntry {
                        key: ev.key.clone(),
                        value: ev.value,
                    };
                    match job_from_kv(&entry) {
                        Ok(job) => ReconcilerMsg::JobPut(job),
                        Err(e) => {
                            warn!(error = %e, key = %ev.key, "malformed job event, skipping");
                            continue;
                        }
                    }
                }
                WatchKind::Delete => ReconcilerMsg::JobDelete(JobId::new(keys::id_from_key(&ev.key))),
            };
            if tx.send(msg).await.is_err() {
                return;
            }
        }
    })
}

pub fn spawn_group_watcher(
    bindings: Arc<StoreBindings>,
    tx: mpsc::Sender<ReconcilerMsg>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = bindings.watch_groups();
        loop {
            let ev = tokio::select! {
                _ = shutdown.recv() => {
                    debug!("group watcher exiting on shutdown");
                    return;
                }
                ev = stream.next() => ev,
            };
            let Some(ev) = ev else {
                debug!("group watch stream closed");
                return;
            };
            let msg = match ev.kind {
                WatchKind::Put => {
                    let entry = KvEntry {
                        key: ev.key.clone(),
                        value: ev.value,
                    };
                    match group_from_kv(&entry) {
                        Ok(group) => ReconcilerMsg::GroupPut(group),
                        Err(e) => {
                            warn!(error = %e, key = %ev.key, "malformed group event, skipping");
                            continue;
                        }
                    }
                }
                WatchKind::Delete => {
                    ReconcilerMsg::GroupDelete(GroupId::new(keys::id_from_key(&ev.key)))
                }
            };
            if tx.send(msg).await.is_err() {
                return;
            }
        }
    })
}

/// Ad-hoc run requests keyed by `JobID`, value either empty or a target
/// `NodeID` (spec §4.5). Deletes of the trigger key carry no meaning and
/// are ignored.
pub fn spawn_once_watcher(
    bindings: Arc<StoreBindings>,
    tx: mpsc::Sender<ReconcilerMsg>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = bindings.watch_once();
        loop {
            let ev = tokio::select! {
                _ = shutdown.recv() => {
                    debug!("one-shot watcher exiting on shutdown");
                    return;
                }
                ev = stream.next() => ev,
            };
            let Some(ev) = ev else {
                debug!("one-shot watch stream closed");
                return;
            };
            if !matches!(ev.kind, WatchKind::Put) {
                continue;
            }
            let job_id = JobId::new(keys::id_from_key(&ev.key));
            let target = if ev.value.is_empty() {
                None
            } else {
                match ev.value_str() {
                    Ok(s) => Some(NodeId::new(s)),
                    Err(e) => {
                        warn!(error = %e, key = %ev.key, "malformed one-shot target, skipping");
                        continue;
                    }
                }
            };
            if tx.send(ReconcilerMsg::OneShot { job_id, target }).await.is_err() {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Group;
    use crate::job::{CommandSpec, Job, JobRule, Targets};
    use cronagent_store::{InMemoryStore, Store};
    use std::time::Duration;

    fn no_shutdown() -> broadcast::Receiver<()> {
        let (_tx, rx) = broadcast::channel(1);
        rx
    }

    #[tokio::test]
    async fn job_watcher_decodes_put_and_delete() {
        let store = Arc::new(InMemoryStore::new());
        let bindings = Arc::new(StoreBindings::new(store.clone(), "/cronagent"));
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn_job_watcher(bindings, tx, no_shutdown());

        let job = Job::new("j1", "owning", CommandSpec::new("true")).with_rule(JobRule::new(
            "r1",
            "* * * * * *",
            Targets::All,
        ));
        store
            .put(
                "/cronagent/job/owning/j1",
                serde_json::to_vec(&job).unwrap(),
                None,
            )
            .await
            .unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg, ReconcilerMsg::JobPut(j) if j.id == JobId::new("j1")));

        store.delete("/cronagent/job/owning/j1").await.unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg, ReconcilerMsg::JobDelete(id) if id == JobId::new("j1")));
    }

    #[tokio::test]
    async fn group_watcher_decodes_put() {
        let store = Arc::new(InMemoryStore::new());
        let bindings = Arc::new(StoreBindings::new(store.clone(), "/cronagent"));
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn_group_watcher(bindings, tx, no_shutdown());

        let group = Group::new("g1", "workers");
        store
            .put(
                "/cronagent/group/g1",
                serde_json::to_vec(&group).unwrap(),
                None,
            )
            .await
            .unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg, ReconcilerMsg::GroupPut(g) if g.id == GroupId::new("g1")));
    }

    #[tokio::test]
    async fn once_watcher_treats_empty_value_as_broadcast() {
        let store = Arc::new(InMemoryStore::new());
        let bindings = Arc::new(StoreBindings::new(store.clone(), "/cronagent"));
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn_once_watcher(bindings, tx, no_shutdown());

        store.put("/cronagent/once/j1", Vec::new(), None).await.unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match msg {
            ReconcilerMsg::OneShot { job_id, target } => {
                assert_eq!(job_id, JobId::new("j1"));
                assert!(target.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn once_watcher_decodes_targeted_node() {
        let store = Arc::new(InMemoryStore::new());
        let bindings = Arc::new(StoreBindings::new(store.clone(), "/cronagent"));
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn_once_watcher(bindings, tx, no_shutdown());

        store
            .put("/cronagent/once/j1", b"10.0.0.1".to_vec(), None)
            .await
            .unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match msg {
            ReconcilerMsg::OneShot { target, .. } => {
                assert_eq!(target, Some(NodeId::new("10.0.0.1")));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn job_watcher_exits_promptly_on_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        let bindings = Arc::new(StoreBindings::new(store, "/cronagent"));
        let (tx, _rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn_job_watcher(bindings, tx, shutdown_rx);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher should exit once shutdown fires")
            .unwrap();
    }
}
