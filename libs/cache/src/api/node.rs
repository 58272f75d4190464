use std::collections::HashMap;
use std::fmt;

use batchd_events::Node;
use batchd_id::{NodeName, TaskId};
use serde::{Deserialize, Serialize};

use super::{Resource, TaskInfo};

/// A scheduling target and the tasks bound to it.
///
/// `idle` is always `allocatable - used`, and `used` is the sum of the
/// requests of the tasks in `tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: NodeName,

    /// The node descriptor; `None` while only known from bound tasks.
    pub node: Option<Node>,

    pub allocatable: Resource,
    pub used: Resource,
    pub idle: Resource,

    pub tasks: HashMap<TaskId, TaskInfo>,
}

impl NodeInfo {
    /// Returns true while no node notification has been seen for this node.
    pub fn is_placeholder(&self) -> bool {
        self.node.is_none()
    }

    /// Returns true if bound tasks request more than the node can allocate.
    pub fn is_overcommitted(&self) -> bool {
        self.idle.is_negative()
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: idle({}) used({}) allocatable({}) pods({})",
            self.name,
            self.idle,
            self.used,
            self.allocatable,
            self.tasks.len()
        )
    }
}
