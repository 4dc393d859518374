use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::group::Group;
use crate::ids::{CmdId, GroupId, GroupName, JobId, NodeId, RuleId};

/// The predicate a rule's `Targets` evaluates against `(NodeID, Groups)`
/// (spec §3). `All` is a supplemental variant this expansion adds: the
/// original's group-membership model has no way to express "every known
/// node" without declaring a universal group, and a real fleet config
/// needs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Targets {
    Nodes(HashSet<NodeId>),
    Groups(HashSet<GroupId>),
    All,
}

impl Targets {
    /// Deterministic in `(node, groups)`, per the invariant in spec §3.
    pub fn matches(&self, node: &NodeId, groups: &HashMap<GroupId, Group>) -> bool {
        match self {
            Targets::All => true,
            Targets::Nodes(set) => set.contains(node),
            Targets::Groups(ids) => ids
                .iter()
                .any(|gid| groups.get(gid).is_some_and(|g| g.included(node))),
        }
    }

    /// Group ids this rule references, used to populate the back-reference
    /// index (spec §3 invariant 3, §9 "arena+index").
    pub fn referenced_groups(&self) -> HashSet<GroupId> {
        match self {
            Targets::Groups(ids) => ids.clone(),
            Targets::Nodes(_) | Targets::All => HashSet::new(),
        }
    }
}

/// `(RuleID, Timer, Targets)` (spec §3/glossary). `timer` is the canonical
/// string form of `schedule`, used as the change-detection token (spec
/// §4.4, invariant 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRule {
    pub rule_id: RuleId,
    pub timer: String,
    pub targets: Targets,
}

impl JobRule {
    pub fn new(rule_id: impl Into<RuleId>, timer: impl Into<String>, targets: Targets) -> Self {
        Self {
            rule_id: rule_id.into(),
            timer: timer.into(),
            targets,
        }
    }

    pub fn schedule(&self) -> cronagent_cron::Result<cron::Schedule> {
        cronagent_cron::parse(&self.timer)
    }
}

/// The unit of work a matching node actually runs, opaque to the
/// reconciler beyond being cloneable (spec §6: the execution subsystem is
/// an external collaborator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }
}

/// Identified by `JobID`, owned by exactly one group, carries a list of
/// rules (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub group: GroupName,
    pub rules: Vec<JobRule>,
    pub command: CommandSpec,
}

impl Job {
    pub fn new(id: impl Into<JobId>, group: impl Into<GroupName>, command: CommandSpec) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
            rules: Vec::new(),
            command,
        }
    }

    pub fn with_rule(mut self, rule: JobRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// `IsRunOn`: does any rule of this job target `node` under the
    /// current group membership. Deterministic in its inputs (spec §3).
    pub fn is_run_on(&self, node: &NodeId, groups: &HashMap<GroupId, Group>) -> bool {
        self.rules.iter().any(|r| r.targets.matches(node, groups))
    }

    /// `Cmds`: the commands this job produces for `node` under the
    /// current group membership, one per matching rule.
    pub fn cmds(&self, node: &NodeId, groups: &HashMap<GroupId, Group>) -> HashMap<CmdId, Command> {
        self.rules
            .iter()
            .filter(|r| r.targets.matches(node, groups))
            .map(|r| {
                let id = CmdId::new(self.id.clone(), r.rule_id.clone());
                (
                    id.clone(),
                    Command {
                        id,
                        job_id: self.id.clone(),
                        rule: r.clone(),
                        spec: self.command.clone(),
                    },
                )
            })
            .collect()
    }

    /// All group ids any rule of this job targets, used to build/tear down
    /// back-references (spec §3 invariant 3).
    pub fn referenced_groups(&self) -> HashSet<GroupId> {
        self.rules
            .iter()
            .flat_map(|r| r.targets.referenced_groups())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups_with(node: &NodeId, gid: &str) -> HashMap<GroupId, Group> {
        let mut groups = HashMap::new();
        groups.insert(
            GroupId::new(gid),
            Group::new(gid, "g").with_nodes([node.clone()]),
        );
        groups
    }

    #[test]
    fn is_run_on_respects_group_targeting() {
        let n1 = NodeId::new("10.0.0.1");
        let n2 = NodeId::new("10.0.0.2");
        let job = Job::new("j1", "owning", CommandSpec::new("true")).with_rule(JobRule::new(
            "r1",
            "*/5 * * * * *",
            Targets::Groups([GroupId::new("g1")].into()),
        ));
        let groups = groups_with(&n1, "g1");
        assert!(job.is_run_on(&n1, &groups));
        assert!(!job.is_run_on(&n2, &groups));
    }

    #[test]
    fn cmds_produces_one_entry_per_matching_rule() {
        let n1 = NodeId::new("10.0.0.1");
        let job = Job::new("j1", "owning", CommandSpec::new("true"))
            .with_rule(JobRule::new(
                "r1",
                "*/5 * * * * *",
                Targets::Nodes([n1.clone()].into()),
            ))
            .with_rule(JobRule::new("r2", "0 0 * * * *", Targets::All));
        let groups = HashMap::new();
        let cmds = job.cmds(&n1, &groups);
        assert_eq!(cmds.len(), 2);
        assert!(cmds.contains_key(&CmdId::new(JobId::new("j1"), RuleId::new("r1"))));
        assert!(cmds.contains_key(&CmdId::new(JobId::new("j1"), RuleId::new("r2"))));
    }

    #[test]
    fn referenced_groups_ignores_node_and_all_targets() {
        let job = Job::new("j1", "owning", CommandSpec::new("true"))
            .with_rule(JobRule::new("r1", "* * * * * *", Targets::All))
            .with_rule(JobRule::new(
                "r2",
                "* * * * * *",
                Targets::Groups([GroupId::new("g1")].into()),
            ));
        assert_eq!(job.referenced_groups(), [GroupId::new("g1")].into());
    }
}
