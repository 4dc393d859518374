use crate::group::Group;
use crate::ids::{GroupId, JobId, NodeId};
use crate::job::Job;

/// Decoded events the four watchers (§4.5/§5) funnel into the single
/// reconciler task. Keeping this as one enum is what makes the
/// single-writer design in spec §9 possible without locks.
#[derive(Debug)]
pub enum ReconcilerMsg {
    JobPut(Job),
    JobDelete(JobId),
    GroupPut(Group),
    GroupDelete(GroupId),
    /// One-shot ad-hoc run trigger (spec §4.5), routed through the
    /// reconciler rather than reading `jobs`/`groups` directly — the fix
    /// spec §9 calls for.
    OneShot {
        job_id: JobId,
        target: Option<NodeId>,
    },
    /// The result of the store fetch `groupAddNode` needs, hoisted out of
    /// the reconciler task itself (spec §9 "consider hoisting it out").
    JobFetched {
        gid: GroupId,
        job_id: JobId,
        job: Option<Job>,
    },
}
