use serde::{Deserialize, Serialize};
use std::fmt;

pub use cronagent_core::NodeId;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(JobId);
string_id!(RuleId);
string_id!(GroupId);
string_id!(GroupName);

/// `(JobID, RuleID)`, written `CmdID` in the spec: identifies one installed
/// command on the local cron wheel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CmdId {
    pub job_id: JobId,
    pub rule_id: RuleId,
}

impl CmdId {
    pub fn new(job_id: JobId, rule_id: RuleId) -> Self {
        Self { job_id, rule_id }
    }
}

impl fmt::Display for CmdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.job_id, self.rule_id)
    }
}
