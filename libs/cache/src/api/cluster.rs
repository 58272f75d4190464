use batchd_id::{JobId, NodeName, TaskId};
use serde::{Deserialize, Serialize};

use super::{JobInfo, NodeInfo, TaskInfo};

/// A point-in-time copy of every node and job in the cache.
///
/// The snapshot owns its data; changing it never affects the cache, and
/// later cache mutations never show up in it. Order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub nodes: Vec<NodeInfo>,
    pub jobs: Vec<JobInfo>,
}

impl ClusterInfo {
    pub fn node(&self, name: &NodeName) -> Option<&NodeInfo> {
        self.nodes.iter().find(|n| &n.name == name)
    }

    pub fn job(&self, id: &JobId) -> Option<&JobInfo> {
        self.jobs.iter().find(|j| &j.uid == id)
    }

    /// Finds a task through its job.
    pub fn task(&self, id: &TaskId) -> Option<&TaskInfo> {
        self.jobs.iter().find_map(|j| j.task(id))
    }

    pub fn task_count(&self) -> usize {
        self.jobs.iter().map(JobInfo::task_count).sum()
    }
}
