use crate::ids::{CmdId, JobId};
use crate::job::{CommandSpec, JobRule};

/// A concrete scheduled entry `(JobID, RuleID)` on this node's cron wheel
/// (spec §3/glossary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: CmdId,
    pub job_id: JobId,
    pub rule: JobRule,
    pub spec: CommandSpec,
}

impl Command {
    /// The change-detection token: `addCmd` treats two commands with the
    /// same `CmdId` and the same `timer` as unchanged (spec §4.4, invariant
    /// 4).
    pub fn timer(&self) -> &str {
        &self.rule.timer
    }
}
