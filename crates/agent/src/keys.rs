//! Key layout (spec §6), rooted under a configurable namespace so one store
//! can host more than one fleet.

use crate::ids::{GroupName, JobId, NodeId};

pub fn node_prefix(ns: &str) -> String {
    format!("{ns}/node/")
}

pub fn node_key(ns: &str, node: &NodeId) -> String {
    format!("{ns}/node/{node}")
}

pub fn node_down_key(ns: &str, node: &NodeId) -> String {
    format!("{ns}/node/{node}/down")
}

pub fn job_prefix(ns: &str) -> String {
    format!("{ns}/job/")
}

pub fn job_key(ns: &str, group: &GroupName, id: &JobId) -> String {
    format!("{ns}/job/{group}/{id}")
}

pub fn group_prefix(ns: &str) -> String {
    format!("{ns}/group/")
}

pub fn once_prefix(ns: &str) -> String {
    format!("{ns}/once/")
}

pub fn once_key(ns: &str, id: &JobId) -> String {
    format!("{ns}/once/{id}")
}

/// `GetIDFromKey`: the trailing path segment of a key, used by watchers to
/// recover a job/group id from a raw watch event key.
pub fn id_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_key_takes_last_segment() {
        assert_eq!(id_from_key("/cronagent/job/owning/j1"), "j1");
        assert_eq!(id_from_key("j1"), "j1");
    }

    #[test]
    fn job_key_nests_under_group_name() {
        let key = job_key("/cronagent", &GroupName::new("owning"), &JobId::new("j1"));
        assert_eq!(key, "/cronagent/job/owning/j1");
    }
}
