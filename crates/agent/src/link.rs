use std::collections::{HashMap, HashSet};

use crate::ids::{GroupId, GroupName, JobId};
use crate::job::Job;

/// Back-reference recorded for one `(group, job)` pair: the job's *owning*
/// group name, carried so `groupAddNode` can re-fetch the job from the
/// store by `(gname, jid)` without holding the job in memory (spec §3/§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub gname: GroupName,
}

/// `GroupID → (JobID → LinkEntry)` (spec §3/§9): for every group referenced
/// by any known job's rule, the jobs that reference it. Populated for
/// every known job regardless of whether that job currently runs on this
/// node — membership recomputation needs to see jobs this node isn't
/// running yet.
#[derive(Debug, Default)]
pub struct Link {
    inner: HashMap<GroupId, HashMap<JobId, LinkEntry>>,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record back-references for every group `job`'s rules target.
    pub fn add_job(&mut self, job: &Job) {
        for gid in job.referenced_groups() {
            self.inner.entry(gid).or_default().insert(
                job.id.clone(),
                LinkEntry {
                    gname: job.group.clone(),
                },
            );
        }
    }

    /// Clear every back-reference `job_id` holds under `groups`.
    pub fn del_job(&mut self, job_id: &JobId, groups: impl IntoIterator<Item = GroupId>) {
        for gid in groups {
            self.remove_one(&gid, job_id);
        }
    }

    /// Drop the single `(group, job)` entry, pruning the group's map if it
    /// becomes empty.
    pub fn remove_one(&mut self, gid: &GroupId, job_id: &JobId) {
        if let Some(jobs) = self.inner.get_mut(gid) {
            jobs.remove(job_id);
            if jobs.is_empty() {
                self.inner.remove(gid);
            }
        }
    }

    /// Remove a group entirely from the index (spec §4.3 `delGroup`).
    pub fn del_group(&mut self, gid: &GroupId) -> Option<HashMap<JobId, LinkEntry>> {
        self.inner.remove(gid)
    }

    /// The jobs currently linked under `gid`, as a snapshot (the caller
    /// mutates `self` while processing these, so holding a live borrow
    /// across that isn't an option).
    pub fn jobs_for_group(&self, gid: &GroupId) -> Vec<(JobId, LinkEntry)> {
        self.inner
            .get(gid)
            .map(|m| m.iter().map(|(j, e)| (j.clone(), e.clone())).collect())
            .unwrap_or_default()
    }

    /// Whether any group still links to `job_id` — used to garbage-collect
    /// `delIds` tombstones once nothing can re-hydrate them any more
    /// (spec §9: `delIds` is otherwise never garbage-collected).
    pub fn references_job(&self, job_id: &JobId) -> bool {
        self.inner.values().any(|jobs| jobs.contains_key(job_id))
    }

    pub fn groups_referencing(&self, job_id: &JobId) -> HashSet<GroupId> {
        self.inner
            .iter()
            .filter(|(_, jobs)| jobs.contains_key(job_id))
            .map(|(gid, _)| gid.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn group_is_empty(&self, gid: &GroupId) -> bool {
        !self.inner.contains_key(gid)
    }
}
