use std::collections::{BTreeMap, HashMap};
use std::fmt;

use batchd_id::{JobId, TaskId};
use serde::{Deserialize, Serialize};

use super::{TaskInfo, TaskStatus};

/// A group of tasks sharing a minimum-available contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub uid: JobId,
    pub name: String,
    pub namespace: String,

    /// Tasks that must be ready before the job can run; `None` until the
    /// job's scheduling specification has been seen.
    pub min_available: Option<u32>,

    /// Tasks grouped by status. Empty buckets are not kept.
    pub tasks: BTreeMap<TaskStatus, HashMap<TaskId, TaskInfo>>,
}

impl JobInfo {
    /// Returns true while the job's specification has not arrived.
    pub fn is_placeholder(&self) -> bool {
        self.min_available.is_none()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.values().map(HashMap::len).sum()
    }

    /// Tasks currently in `status`.
    pub fn tasks_in(&self, status: TaskStatus) -> impl Iterator<Item = &TaskInfo> {
        self.tasks.get(&status).into_iter().flat_map(HashMap::values)
    }

    /// Finds a task of this job in any bucket.
    pub fn task(&self, id: &TaskId) -> Option<&TaskInfo> {
        self.tasks.values().find_map(|bucket| bucket.get(id))
    }

    /// Number of tasks that count towards the minimum-available contract.
    pub fn ready_task_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|(status, _)| status.is_ready())
            .map(|(_, bucket)| bucket.len())
            .sum()
    }

    /// Returns true once enough tasks are ready. A placeholder job is never ready.
    pub fn is_ready(&self) -> bool {
        self.min_available
            .is_some_and(|min| self.ready_task_count() >= min as usize)
    }
}

impl fmt::Display for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({}) name({}) minAvailable(", self.uid, self.name)?;
        match self.min_available {
            Some(min) => write!(f, "{min})"),
            None => f.write_str("<pending>)"),
        }
    }
}
