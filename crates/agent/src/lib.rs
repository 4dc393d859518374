pub mod agent;
pub mod command;
pub mod error;
pub mod exec;
pub mod group;
pub mod ids;
pub mod job;
pub mod keys;
pub mod lifecycle;
pub mod link;
pub mod messages;
pub mod reconciler;
pub mod store_bindings;
pub mod watchers;

pub use agent::Agent;
pub use command::Command;
pub use error::{Error, Result};
pub use exec::{Executor, ProcessExecutor};
pub use group::Group;
pub use ids::{CmdId, GroupId, GroupName, JobId, NodeId, RuleId};
pub use job::{CommandSpec, Job, JobRule, Targets};
pub use lifecycle::Lifecycle;
pub use link::Link;
pub use messages::ReconcilerMsg;
pub use reconciler::Reconciler;
pub use store_bindings::StoreBindings;
