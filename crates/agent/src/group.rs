use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, GroupName, NodeId};

/// A named set of node ids (spec §3). `Included` is the predicate jobs'
/// `Targets::Groups` consult to decide node membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: GroupName,
    #[serde(default)]
    pub nodes: HashSet<NodeId>,
}

impl Group {
    pub fn new(id: impl Into<GroupId>, name: impl Into<GroupName>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: HashSet::new(),
        }
    }

    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.nodes = nodes.into_iter().collect();
        self
    }

    pub fn included(&self, node: &NodeId) -> bool {
        self.nodes.contains(node)
    }
}
