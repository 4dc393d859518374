//! Top-level wiring (spec §4.6, §5): `loadJobs` at startup, then the
//! watchers, reconciler, and lifecycle keep-alive loop run as independent
//! background tasks until `stop` is called.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cronagent_cron::{TokioWheel, Wheel};
use cronagent_store::Store;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::exec::Executor;
use crate::ids::{CmdId, NodeId};
use crate::job::Job;
use crate::lifecycle::Lifecycle;
use crate::reconciler::Reconciler;
use crate::store_bindings::StoreBindings;
use crate::watchers;
use cronagent_core::AgentConfig;

pub struct Agent {
    node_id: NodeId,
    bindings: Arc<StoreBindings>,
    wheel: Arc<TokioWheel<CmdId>>,
    executor: Arc<dyn Executor>,
    lifecycle: Lifecycle,
    shutdown_tx: broadcast::Sender<()>,
    stopped: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Agent {
    pub fn new(config: &AgentConfig, store: Arc<dyn Store>, executor: Arc<dyn Executor>) -> Result<Self> {
        let node_id = match &config.node_id {
            Some(id) => NodeId::new(id.clone()),
            None => NodeId::discover()?,
        };
        let bindings = Arc::new(StoreBindings::new(store.clone(), config.namespace.clone()));
        let lifecycle = Lifecycle::new(store.clone(), config.namespace.clone(), node_id.clone(), config.ttl_secs);
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            node_id,
            bindings,
            wheel: Arc::new(TokioWheel::new()),
            executor,
            lifecycle,
            shutdown_tx,
            stopped: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Registers, runs `loadJobs`, and spawns the watchers, reconciler, and
    /// keep-alive loop. Returns once startup completes; per spec §7, a
    /// startup failure here propagates out and the caller should `stop`.
    pub async fn run(&self) -> Result<()> {
        let lease = self.lifecycle.register().await?;

        let (msg_tx, msg_rx) = mpsc::channel(256);
        let mut reconciler = Reconciler::new(
            self.node_id.clone(),
            self.wheel.clone(),
            self.executor.clone(),
            self.bindings.clone(),
            msg_tx.clone(),
        );

        self.load_jobs(&mut reconciler).await?;

        let mut handles = Vec::new();
        handles.push(watchers::spawn_job_watcher(
            self.bindings.clone(),
            msg_tx.clone(),
            self.shutdown_tx.subscribe(),
        ));
        handles.push(watchers::spawn_group_watcher(
            self.bindings.clone(),
            msg_tx.clone(),
            self.shutdown_tx.subscribe(),
        ));
        handles.push(watchers::spawn_once_watcher(
            self.bindings.clone(),
            msg_tx,
            self.shutdown_tx.subscribe(),
        ));
        handles.push(tokio::spawn(reconciler.run(msg_rx, self.shutdown_tx.subscribe())));

        let keep_alive_lifecycle = self.lifecycle.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            keep_alive_lifecycle.run_keep_alive(lease, shutdown_rx).await;
        }));

        self.wheel.start();
        *self.handles.lock().expect("agent handles mutex poisoned") = handles;
        info!(node_id = %self.node_id, "agent running");
        Ok(())
    }

    /// **loadJobs** (spec §4.6): populate `groups` first, then fetch every
    /// known job and run it through `addJob(notice=false)` so the startup
    /// catch-up doesn't log each assignment as a change.
    async fn load_jobs(&self, reconciler: &mut Reconciler<TokioWheel<CmdId>>) -> Result<()> {
        let groups = self.bindings.get_groups().await?;
        debug!(count = groups.len(), "loadJobs: fetched groups");
        for g in groups {
            reconciler.add_group(g);
        }

        let jobs = self.bindings.get_jobs().await?;
        debug!(count = jobs.len(), "loadJobs: fetched jobs");
        for job in jobs {
            self.mark_running(&job);
            reconciler.add_job(job, false);
        }
        Ok(())
    }

    /// `Job.RunOn(nodeID)` (spec §6): records, for observers, that this
    /// job is being picked up by this node. No dedicated store key is
    /// specified for this beyond the presence record itself, so this is
    /// an observability log line rather than a write.
    fn mark_running(&self, job: &Job) {
        debug!(job_id = %job.id, node_id = %self.node_id, "job marked running on this node");
    }

    /// **Shutdown** (spec §4.1): mark down, close the shutdown channel
    /// (stopping keep-alive, the watchers, and the reconciler — spec §9
    /// "Shutdown races"), delete the presence key, close the store client
    /// (spec §5: watch streams are closed by closing the store client),
    /// stop the cron wheel. Idempotent — the spec calls out double-close of
    /// the shutdown channel as a bug to avoid.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("stop called again, ignoring");
            return;
        }
        if let Err(e) = self.lifecycle.mark_down().await {
            error!(error = %e, "failed to write down-marker");
        }
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.lifecycle.delete_presence().await {
            error!(error = %e, "failed to delete presence key");
        }
        self.bindings.store.close().await;
        self.wheel.stop();
        info!(node_id = %self.node_id, "agent stopped");
    }
}
