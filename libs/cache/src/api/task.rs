use std::fmt;

use batchd_events::{EventError, Pod, PodPhase};
use batchd_id::{JobId, NodeName, TaskId};
use serde::{Deserialize, Serialize};

use super::Resource;

/// Scheduling status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for placement.
    Pending,
    /// A node has been chosen but the bind has not started.
    Allocated,
    /// The bind request is in flight.
    Binding,
    /// Bound to a node, not yet running.
    Bound,
    Running,
    /// Asked to terminate; still holds its node's capacity.
    Releasing,
    Succeeded,
    Failed,
    Unknown,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 9] = [
        TaskStatus::Pending,
        TaskStatus::Allocated,
        TaskStatus::Binding,
        TaskStatus::Bound,
        TaskStatus::Running,
        TaskStatus::Releasing,
        TaskStatus::Succeeded,
        TaskStatus::Failed,
        TaskStatus::Unknown,
    ];

    /// Derives the status the control plane reports for a pod.
    pub fn from_pod(pod: &Pod) -> Self {
        let terminating = pod.is_terminating();
        match pod.status.phase {
            PodPhase::Running if terminating => TaskStatus::Releasing,
            PodPhase::Running => TaskStatus::Running,
            PodPhase::Pending if terminating => TaskStatus::Releasing,
            PodPhase::Pending => match pod.spec.node_name.as_deref() {
                None | Some("") => TaskStatus::Pending,
                Some(_) => TaskStatus::Bound,
            },
            PodPhase::Succeeded => TaskStatus::Succeeded,
            PodPhase::Failed => TaskStatus::Failed,
            PodPhase::Unknown => TaskStatus::Unknown,
        }
    }

    /// Statuses that count towards a job's minimum-available contract.
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            TaskStatus::Allocated | TaskStatus::Binding | TaskStatus::Bound | TaskStatus::Running
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Allocated => "allocated",
            TaskStatus::Binding => "binding",
            TaskStatus::Bound => "bound",
            TaskStatus::Running => "running",
            TaskStatus::Releasing => "releasing",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schedulable unit of work, built from a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub uid: TaskId,
    pub job: JobId,
    pub name: String,
    pub namespace: String,

    /// Node the task is bound to; `None` until bound.
    pub node_name: Option<NodeName>,

    pub status: TaskStatus,
    pub resreq: Resource,

    /// The descriptor this task was built from.
    pub pod: Pod,
}

impl TaskInfo {
    /// Builds a task from a pod, deriving its identifiers, status and request.
    pub fn from_pod(pod: Pod) -> Result<Self, EventError> {
        Ok(Self {
            uid: pod.task_id()?,
            job: pod.job_id()?,
            name: pod.metadata.name.clone(),
            namespace: pod.metadata.namespace.clone(),
            node_name: pod.node_name()?,
            status: TaskStatus::from_pod(&pod),
            resreq: Resource::from_pod_requests(&pod)?,
            pod,
        })
    }
}

impl fmt::Display for TaskInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task ({}:{}/{}): job {}, status {}, node {}, resreq {}",
            self.uid,
            self.namespace,
            self.name,
            self.job,
            self.status,
            self.node_name.as_ref().map_or("<unbound>", |n| n.as_str()),
            self.resreq,
        )
    }
}
