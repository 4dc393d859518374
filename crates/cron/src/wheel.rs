use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type RunFn = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

/// The cron wheel collaborator (spec §6): `Schedule`, `DelJob`, `Start`,
/// `Stop`, keyed by whatever id type the caller's command set uses.
pub trait Wheel<Id>: Send + Sync
where
    Id: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Install `run` under `schedule` for `id`. Installing again for an id
    /// already on the wheel replaces the prior entry (invariant 2, §3).
    fn schedule(&self, id: Id, schedule: cron::Schedule, run: RunFn);
    fn del_job(&self, id: &Id);
    fn start(&self);
    fn stop(&self);
}

struct TimedJob<Id> {
    id: Id,
    schedule: cron::Schedule,
    run: RunFn,
}

/// Real wheel: one `tokio` task per installed command, sleeping to its own
/// next firing time and re-arming itself from the cron expression's
/// `upcoming` iterator. Matches the teacher's per-service
/// `tokio::select!`-driven loop (`crates/scheduler/src/cron_service.rs`,
/// `crates/scheduler/src/ghost.rs`), generalised from one fixed interval per
/// service to one arbitrary cron expression per installed command.
pub struct TokioWheel<Id: Eq + Hash + Clone + Send + Sync + 'static> {
    jobs: Mutex<HashMap<Id, JoinHandle<()>>>,
}

impl<Id: Eq + Hash + Clone + Send + Sync + 'static> TokioWheel<Id> {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn spawn_task(job: TimedJob<Id>) -> JoinHandle<()>
    where
        Id: std::fmt::Debug,
    {
        tokio::spawn(async move {
            loop {
                let next = match job.schedule.upcoming(chrono::Utc).next() {
                    Some(t) => t,
                    None => {
                        debug!(id = ?job.id, "cron schedule has no further firings");
                        return;
                    }
                };
                let now = chrono::Utc::now();
                let sleep_for = (next - now)
                    .to_std()
                    .unwrap_or(std::time::Duration::from_secs(0));
                tokio::time::sleep(sleep_for).await;
                (job.run)().await;
            }
        })
    }
}

impl<Id: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static> Default for TokioWheel<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static> Wheel<Id>
    for TokioWheel<Id>
{
    fn schedule(&self, id: Id, schedule: cron::Schedule, run: RunFn) {
        let mut jobs = self.jobs.lock().expect("cron wheel mutex poisoned");
        if let Some(old) = jobs.remove(&id) {
            old.abort();
        }
        let handle = Self::spawn_task(TimedJob {
            id: id.clone(),
            schedule,
            run,
        });
        jobs.insert(id, handle);
    }

    fn del_job(&self, id: &Id) {
        let mut jobs = self.jobs.lock().expect("cron wheel mutex poisoned");
        if let Some(handle) = jobs.remove(id) {
            handle.abort();
        } else {
            warn!(id = ?id, "del_job called for id not on the wheel");
        }
    }

    fn start(&self) {
        // Installed jobs start ticking the moment they are scheduled; `start`
        // exists to mirror the spec's external interface and as the hook a
        // future rate-limited/startup-staggered wheel would use.
    }

    fn stop(&self) {
        let mut jobs = self.jobs.lock().expect("cron wheel mutex poisoned");
        for (_, handle) in jobs.drain() {
            handle.abort();
        }
    }
}

/// In-memory wheel used by reconciler tests: records installs/removals
/// instead of actually ticking, so properties like P1/P2 can be asserted
/// against the wheel's key set without waiting on real time.
#[derive(Default)]
pub struct MemWheel<Id: Eq + Hash + Clone + Send + Sync + 'static> {
    installed: Mutex<HashMap<Id, (String, RunFn)>>,
}

impl<Id: Eq + Hash + Clone + Send + Sync + 'static> MemWheel<Id> {
    pub fn new() -> Self {
        Self {
            installed: Mutex::new(HashMap::new()),
        }
    }

    pub fn installed_ids(&self) -> Vec<Id> {
        self.installed.lock().unwrap().keys().cloned().collect()
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.installed.lock().unwrap().contains_key(id)
    }

    /// The `run` closure installed for `id`, so a test can fire it directly
    /// instead of waiting on real time.
    pub fn run_fn(&self, id: &Id) -> Option<RunFn> {
        self.installed.lock().unwrap().get(id).map(|(_, run)| run.clone())
    }
}

impl<Id: Eq + Hash + Clone + Send + Sync + 'static> Wheel<Id> for MemWheel<Id> {
    fn schedule(&self, id: Id, schedule: cron::Schedule, run: RunFn) {
        self.installed
            .lock()
            .unwrap()
            .insert(id, (schedule.to_string(), run));
    }

    fn del_job(&self, id: &Id) {
        self.installed.lock().unwrap().remove(id);
    }

    fn start(&self) {}
    fn stop(&self) {
        self.installed.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_wheel_schedule_and_del() {
        let wheel: MemWheel<u32> = MemWheel::new();
        let sched: cron::Schedule = "*/5 * * * * *".parse().unwrap();
        wheel.schedule(1, sched.clone(), Arc::new(|| Box::pin(async {})));
        assert!(wheel.contains(&1));
        wheel.del_job(&1);
        assert!(!wheel.contains(&1));
    }

    #[tokio::test]
    async fn tokio_wheel_replaces_existing_entry_on_reschedule() {
        let wheel: TokioWheel<u32> = TokioWheel::new();
        let sched: cron::Schedule = "*/5 * * * * *".parse().unwrap();
        wheel.schedule(1, sched.clone(), Arc::new(|| Box::pin(async {})));
        // Re-scheduling the same id must not panic or leak the old task.
        wheel.schedule(1, sched, Arc::new(|| Box::pin(async {})));
        wheel.stop();
    }
}
