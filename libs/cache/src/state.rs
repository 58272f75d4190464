//! The synchronized state store.
//!
//! [`SchedulerState`] owns the three keyed maps (tasks, jobs, nodes) behind
//! one mutex and exposes only whole operations on them. Jobs and nodes
//! refer to their tasks by id; the task map is the only place a
//! [`TaskInfo`] lives, and snapshots materialize full copies from it.
//!
//! # Invariants
//!
//! Between operations:
//!
//! - Every task is in exactly one bucket of its job, the bucket for its status
//! - A task with a node name is in that node's task set, and no other
//! - A node's `used` is the sum of the requests of the tasks in its set
//! - Placeholder jobs and placeholder nodes are never empty
//!
//! Each operation validates what it needs before it writes, so a failed
//! operation leaves the maps untouched.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use batchd_events::Node;
use batchd_id::{JobId, NodeName, TaskId};
use tracing::{debug, warn};

use crate::api::{ClusterInfo, JobInfo, NodeInfo, Resource, TaskInfo, TaskStatus};
use crate::error::{CacheError, CacheResult};
use crate::validation::TransitionPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeRecord {
    /// `None` until the node notification arrives.
    node: Option<Node>,
    allocatable: Resource,
    used: Resource,
    tasks: HashSet<TaskId>,
}

impl NodeRecord {
    fn placeholder() -> Self {
        Self {
            node: None,
            allocatable: Resource::EMPTY,
            used: Resource::EMPTY,
            tasks: HashSet::new(),
        }
    }

    fn idle(&self) -> Resource {
        self.allocatable - self.used
    }

    fn is_placeholder(&self) -> bool {
        self.node.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct JobRecord {
    name: String,
    namespace: String,
    /// `None` until the scheduling specification arrives.
    min_available: Option<u32>,
    buckets: BTreeMap<TaskStatus, HashSet<TaskId>>,
}

impl JobRecord {
    fn placeholder(id: &JobId) -> Self {
        Self {
            name: id.name().to_string(),
            namespace: id.namespace().unwrap_or_default().to_string(),
            min_available: None,
            buckets: BTreeMap::new(),
        }
    }

    fn is_placeholder(&self) -> bool {
        self.min_available.is_none()
    }

    fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn insert(&mut self, status: TaskStatus, id: TaskId) {
        self.buckets.entry(status).or_default().insert(id);
    }

    fn remove(&mut self, status: TaskStatus, id: &TaskId) {
        if let Some(bucket) = self.buckets.get_mut(&status) {
            bucket.remove(id);
            if bucket.is_empty() {
                self.buckets.remove(&status);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    tasks: HashMap<TaskId, TaskInfo>,
    jobs: HashMap<JobId, JobRecord>,
    nodes: HashMap<NodeName, NodeRecord>,
}

impl Inner {
    /// Links a task into its job and node, creating placeholders as needed.
    fn attach(&mut self, task: TaskInfo) {
        let job = self.jobs.entry(task.job.clone()).or_insert_with(|| {
            debug!(job_id = %task.job, "Creating placeholder job");
            JobRecord::placeholder(&task.job)
        });
        job.insert(task.status, task.uid.clone());

        if let Some(name) = &task.node_name {
            let node = self.nodes.entry(name.clone()).or_insert_with(|| {
                debug!(node = %name, "Creating placeholder node");
                NodeRecord::placeholder()
            });
            node.tasks.insert(task.uid.clone());
            node.used += task.resreq;

            if !node.is_placeholder() && node.idle().is_negative() {
                warn!(node = %name, idle = %node.idle(), "Node is overcommitted");
            }
        }

        self.tasks.insert(task.uid.clone(), task);
    }

    /// Unlinks a task from its job and node. The task map is not touched.
    fn detach(&mut self, task: &TaskInfo) {
        self.detach_from_job(task);
        self.detach_from_node(task);
    }

    fn detach_from_job(&mut self, task: &TaskInfo) {
        let collect = match self.jobs.get_mut(&task.job) {
            Some(job) => {
                job.remove(task.status, &task.uid);
                job.is_placeholder() && job.is_empty()
            }
            None => false,
        };
        if collect {
            debug!(job_id = %task.job, "Removing empty placeholder job");
            self.jobs.remove(&task.job);
        }
    }

    fn detach_from_node(&mut self, task: &TaskInfo) {
        let Some(name) = &task.node_name else {
            return;
        };
        let collect = match self.nodes.get_mut(name) {
            Some(node) => {
                if node.tasks.remove(&task.uid) {
                    node.used -= task.resreq;
                }
                node.is_placeholder() && node.tasks.is_empty()
            }
            None => false,
        };
        if collect {
            debug!(node = %name, "Removing empty placeholder node");
            self.nodes.remove(name);
        }
    }

    fn materialize(&self, ids: &HashSet<TaskId>) -> HashMap<TaskId, TaskInfo> {
        ids.iter()
            .filter_map(|id| self.tasks.get(id).map(|task| (id.clone(), task.clone())))
            .collect()
    }
}

/// The cache's mutable source of truth.
///
/// Every method takes the lock for its whole duration and never across an
/// await point. A poisoned lock is recovered: operations validate before
/// they write, so a panic cannot leave a half-applied mutation behind.
#[derive(Debug, Default)]
pub struct SchedulerState {
    inner: Mutex<Inner>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    /// Inserts or replaces a task.
    ///
    /// The previous version (if any) is unlinked from its job bucket and node
    /// before the new version is linked, so a task that changed node, status
    /// or request moves in one step.
    pub fn upsert_task(&self, task: TaskInfo) {
        let mut inner = self.lock();
        if let Some(old) = inner.tasks.remove(&task.uid) {
            inner.detach(&old);
        }
        inner.attach(task);
    }

    /// Removes a task, returning it if it was present.
    pub fn delete_task(&self, id: &TaskId) -> Option<TaskInfo> {
        let mut inner = self.lock();
        let task = inner.tasks.remove(id)?;
        inner.detach(&task);
        Some(task)
    }

    /// Moves a task to `to` if `policy` allows it. Returns the previous status.
    ///
    /// On rejection neither the task nor its job's buckets are modified.
    pub fn update_task_status(
        &self,
        id: &TaskId,
        to: TaskStatus,
        policy: &dyn TransitionPolicy,
    ) -> CacheResult<TaskStatus> {
        let mut guard = self.lock();
        let Inner { tasks, jobs, .. } = &mut *guard;

        let task = tasks
            .get_mut(id)
            .ok_or_else(|| CacheError::TaskNotFound(id.clone()))?;
        let from = task.status;

        if !policy.allows(from, to) {
            return Err(CacheError::InvalidTransition {
                task: id.clone(),
                from,
                to,
            });
        }

        if from != to {
            if let Some(job) = jobs.get_mut(&task.job) {
                job.remove(from, id);
                job.insert(to, id.clone());
            }
            task.status = to;
        }

        Ok(from)
    }

    /// Returns a copy of one task.
    pub fn task(&self, id: &TaskId) -> Option<TaskInfo> {
        self.lock().tasks.get(id).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    /// Inserts or replaces a node's descriptor and allocatable capacity.
    ///
    /// Tasks already bound to the node stay bound; if they now exceed the
    /// capacity, idle goes negative.
    pub fn upsert_node(&self, name: NodeName, node: Node, allocatable: Resource) {
        let mut inner = self.lock();
        let record = inner.nodes.entry(name.clone()).or_insert_with(NodeRecord::placeholder);
        record.node = Some(node);
        record.allocatable = allocatable;

        if record.idle().is_negative() {
            warn!(node = %name, idle = %record.idle(), "Node is overcommitted");
        }
    }

    /// Removes a node. Its tasks stay in the cache, unbound and pending.
    ///
    /// Returns the number of tasks that were unbound.
    pub fn delete_node(&self, name: &NodeName) -> usize {
        let mut guard = self.lock();
        let Some(record) = guard.nodes.remove(name) else {
            return 0;
        };

        let Inner { tasks, jobs, .. } = &mut *guard;
        for id in &record.tasks {
            let Some(task) = tasks.get_mut(id) else {
                continue;
            };
            if let Some(job) = jobs.get_mut(&task.job) {
                job.remove(task.status, id);
                job.insert(TaskStatus::Pending, id.clone());
            }
            task.node_name = None;
            task.status = TaskStatus::Pending;
        }

        record.tasks.len()
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    // -------------------------------------------------------------------------
    // Jobs
    // -------------------------------------------------------------------------

    /// Inserts or completes a job from its scheduling specification.
    ///
    /// Tasks attached to a placeholder of the same id stay attached.
    pub fn upsert_job_spec(&self, id: JobId, name: String, namespace: String, min_available: u32) {
        let mut inner = self.lock();
        let job = inner
            .jobs
            .entry(id.clone())
            .or_insert_with(|| JobRecord::placeholder(&id));
        job.name = name;
        job.namespace = namespace;
        job.min_available = Some(min_available);
    }

    /// Removes a job and every task attached to it, releasing their nodes.
    ///
    /// Returns the ids of the removed tasks.
    pub fn delete_job(&self, id: &JobId) -> Vec<TaskId> {
        let mut inner = self.lock();
        let Some(job) = inner.jobs.remove(id) else {
            return Vec::new();
        };

        let removed: Vec<TaskId> = job.buckets.into_values().flatten().collect();
        for task_id in &removed {
            if let Some(task) = inner.tasks.remove(task_id) {
                inner.detach_from_node(&task);
            }
        }
        removed
    }

    pub fn job_count(&self) -> usize {
        self.lock().jobs.len()
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Deep-copies every node and job.
    ///
    /// The lock is held only while copying.
    pub fn snapshot(&self) -> ClusterInfo {
        let inner = self.lock();

        let nodes = inner
            .nodes
            .iter()
            .map(|(name, record)| NodeInfo {
                name: name.clone(),
                node: record.node.clone(),
                allocatable: record.allocatable,
                used: record.used,
                idle: record.idle(),
                tasks: inner.materialize(&record.tasks),
            })
            .collect();

        let jobs = inner
            .jobs
            .iter()
            .map(|(id, record)| JobInfo {
                uid: id.clone(),
                name: record.name.clone(),
                namespace: record.namespace.clone(),
                min_available: record.min_available,
                tasks: record
                    .buckets
                    .iter()
                    .map(|(status, ids)| (*status, inner.materialize(ids)))
                    .collect(),
            })
            .collect();

        ClusterInfo { nodes, jobs }
    }
}

/// Human-readable dump of the whole cache, sorted by key.
impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut snapshot = self.snapshot();
        snapshot.nodes.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot.jobs.sort_by(|a, b| a.uid.cmp(&b.uid));

        writeln!(f, "Cache:")?;

        if !snapshot.nodes.is_empty() {
            writeln!(f, "Nodes:")?;
            for node in &snapshot.nodes {
                writeln!(f, "\t {node}")?;
                let mut tasks: Vec<_> = node.tasks.values().collect();
                tasks.sort_by(|a, b| a.uid.cmp(&b.uid));
                for (i, task) in tasks.iter().enumerate() {
                    writeln!(f, "\t\t {i}: {task}")?;
                }
            }
        }

        if !snapshot.jobs.is_empty() {
            writeln!(f, "Jobs:")?;
            for job in &snapshot.jobs {
                writeln!(f, "\t {job}")?;
                let mut tasks: Vec<_> = job.tasks.values().flat_map(|b| b.values()).collect();
                tasks.sort_by(|a, b| a.uid.cmp(&b.uid));
                for (i, task) in tasks.iter().enumerate() {
                    writeln!(f, "\t\t {i}: {task}")?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{AllowAllTransitions, DefaultTransitionPolicy};
    use batchd_events::{ObjectMeta, Pod, PodSpec, PodStatus};

    fn task(uid: &str, job: &str, node: Option<&str>, status: TaskStatus, cpu: i64) -> TaskInfo {
        TaskInfo {
            uid: TaskId::parse(uid).unwrap(),
            job: JobId::namespaced("ns", job).unwrap(),
            name: uid.to_string(),
            namespace: "ns".to_string(),
            node_name: node.map(|n| NodeName::parse(n).unwrap()),
            status,
            resreq: Resource::new(cpu, 0),
            pod: Pod {
                metadata: ObjectMeta {
                    name: uid.to_string(),
                    ..Default::default()
                },
                spec: PodSpec::default(),
                status: PodStatus::default(),
            },
        }
    }

    fn node_desc(name: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: name.to_string(),
                ..Default::default()
            },
            status: Default::default(),
        }
    }

    fn node(name: &str) -> NodeName {
        NodeName::parse(name).unwrap()
    }

    fn job(name: &str) -> JobId {
        JobId::namespaced("ns", name).unwrap()
    }

    fn tid(id: &str) -> TaskId {
        TaskId::parse(id).unwrap()
    }

    #[test]
    fn test_task_creates_placeholder_job() {
        let state = SchedulerState::new();
        state.upsert_task(task("t1", "j1", None, TaskStatus::Pending, 100));

        let snapshot = state.snapshot();
        let j1 = snapshot.job(&job("j1")).unwrap();
        assert!(j1.is_placeholder());
        assert_eq!(j1.name, "j1");
        assert_eq!(j1.namespace, "ns");
        assert_eq!(j1.tasks_in(TaskStatus::Pending).count(), 1);
        assert!(snapshot.nodes.is_empty());
    }

    #[test]
    fn test_job_spec_completes_placeholder() {
        let state = SchedulerState::new();
        state.upsert_task(task("t1", "j1", None, TaskStatus::Pending, 100));
        state.upsert_job_spec(job("j1"), "j1".into(), "ns".into(), 3);

        let snapshot = state.snapshot();
        let j1 = snapshot.job(&job("j1")).unwrap();
        assert_eq!(j1.min_available, Some(3));
        assert_eq!(j1.task_count(), 1);
    }

    #[test]
    fn test_task_moves_between_nodes() {
        let state = SchedulerState::new();
        state.upsert_node(node("n1"), node_desc("n1"), Resource::new(4_000, 0));
        state.upsert_node(node("n2"), node_desc("n2"), Resource::new(4_000, 0));

        state.upsert_task(task("t1", "j1", Some("n1"), TaskStatus::Bound, 1_000));
        state.upsert_task(task("t1", "j1", Some("n2"), TaskStatus::Running, 1_500));

        let snapshot = state.snapshot();
        let n1 = snapshot.node(&node("n1")).unwrap();
        let n2 = snapshot.node(&node("n2")).unwrap();
        assert_eq!(n1.used, Resource::EMPTY);
        assert!(n1.tasks.is_empty());
        assert_eq!(n2.used, Resource::new(1_500, 0));
        assert_eq!(n2.idle, Resource::new(2_500, 0));

        let j1 = snapshot.job(&job("j1")).unwrap();
        assert_eq!(j1.tasks_in(TaskStatus::Bound).count(), 0);
        assert_eq!(j1.tasks_in(TaskStatus::Running).count(), 1);
    }

    #[test]
    fn test_placeholder_node_collected() {
        let state = SchedulerState::new();
        state.upsert_task(task("t1", "j1", Some("ghost"), TaskStatus::Running, 500));

        let snapshot = state.snapshot();
        let ghost = snapshot.node(&node("ghost")).unwrap();
        assert!(ghost.is_placeholder());
        assert_eq!(ghost.idle, Resource::new(-500, 0));

        state.delete_task(&tid("t1"));
        assert_eq!(state.node_count(), 0);
        assert_eq!(state.job_count(), 0);
    }

    #[test]
    fn test_placeholder_node_completed_by_node_event() {
        let state = SchedulerState::new();
        state.upsert_task(task("t1", "j1", Some("n1"), TaskStatus::Running, 500));
        state.upsert_node(node("n1"), node_desc("n1"), Resource::new(2_000, 0));
        state.delete_task(&tid("t1"));

        let snapshot = state.snapshot();
        let n1 = snapshot.node(&node("n1")).unwrap();
        assert!(!n1.is_placeholder());
        assert_eq!(n1.idle, Resource::new(2_000, 0));
    }

    #[test]
    fn test_overcommit_tolerated() {
        let state = SchedulerState::new();
        state.upsert_node(node("n1"), node_desc("n1"), Resource::new(1_000, 0));
        state.upsert_task(task("t1", "j1", Some("n1"), TaskStatus::Running, 800));
        state.upsert_task(task("t2", "j1", Some("n1"), TaskStatus::Running, 800));

        let snapshot = state.snapshot();
        let n1 = snapshot.node(&node("n1")).unwrap();
        assert_eq!(n1.idle, Resource::new(-600, 0));
        assert!(n1.is_overcommitted());
    }

    #[test]
    fn test_delete_node_unbinds_tasks() {
        let state = SchedulerState::new();
        state.upsert_node(node("n1"), node_desc("n1"), Resource::new(4_000, 0));
        state.upsert_task(task("t1", "j1", Some("n1"), TaskStatus::Running, 1_000));
        state.upsert_task(task("t2", "j1", None, TaskStatus::Pending, 1_000));

        assert_eq!(state.delete_node(&node("n1")), 1);
        assert_eq!(state.delete_node(&node("n1")), 0);

        let t1 = state.task(&tid("t1")).unwrap();
        assert_eq!(t1.node_name, None);
        assert_eq!(t1.status, TaskStatus::Pending);

        let snapshot = state.snapshot();
        assert!(snapshot.nodes.is_empty());
        assert_eq!(
            snapshot.job(&job("j1")).unwrap().tasks_in(TaskStatus::Pending).count(),
            2
        );
    }

    #[test]
    fn test_delete_job_cascades() {
        let state = SchedulerState::new();
        state.upsert_node(node("n1"), node_desc("n1"), Resource::new(4_000, 0));
        state.upsert_job_spec(job("j1"), "j1".into(), "ns".into(), 1);
        state.upsert_task(task("t1", "j1", Some("n1"), TaskStatus::Running, 1_000));
        state.upsert_task(task("t2", "j1", None, TaskStatus::Pending, 1_000));
        state.upsert_task(task("t3", "j2", Some("n1"), TaskStatus::Running, 500));

        let mut removed = state.delete_job(&job("j1"));
        removed.sort();
        assert_eq!(removed, vec![tid("t1"), tid("t2")]);
        assert!(state.delete_job(&job("j1")).is_empty());

        assert_eq!(state.task_count(), 1);
        let snapshot = state.snapshot();
        let n1 = snapshot.node(&node("n1")).unwrap();
        assert_eq!(n1.used, Resource::new(500, 0));
        assert_eq!(n1.idle, Resource::new(3_500, 0));
    }

    #[test]
    fn test_update_status_moves_bucket() {
        let state = SchedulerState::new();
        state.upsert_task(task("t1", "j1", None, TaskStatus::Pending, 0));

        let from = state
            .update_task_status(&tid("t1"), TaskStatus::Allocated, &DefaultTransitionPolicy)
            .unwrap();
        assert_eq!(from, TaskStatus::Pending);

        let snapshot = state.snapshot();
        let j1 = snapshot.job(&job("j1")).unwrap();
        assert_eq!(j1.tasks_in(TaskStatus::Pending).count(), 0);
        assert_eq!(j1.tasks_in(TaskStatus::Allocated).count(), 1);
        assert_eq!(j1.ready_task_count(), 1);
    }

    #[test]
    fn test_rejected_status_update_changes_nothing() {
        let state = SchedulerState::new();
        state.upsert_task(task("t1", "j1", None, TaskStatus::Pending, 0));
        let before = state.snapshot();

        let err = state
            .update_task_status(&tid("t1"), TaskStatus::Succeeded, &DefaultTransitionPolicy)
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::InvalidTransition {
                from: TaskStatus::Pending,
                to: TaskStatus::Succeeded,
                ..
            }
        ));
        assert_eq!(state.snapshot(), before);

        let err = state
            .update_task_status(&tid("missing"), TaskStatus::Pending, &AllowAllTransitions)
            .unwrap_err();
        assert!(matches!(err, CacheError::TaskNotFound(_)));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let state = SchedulerState::new();
        state.upsert_node(node("n1"), node_desc("n1"), Resource::new(4_000, 0));
        state.upsert_task(task("t1", "j1", Some("n1"), TaskStatus::Running, 1_000));

        let mut snapshot = state.snapshot();
        snapshot.nodes[0].used = Resource::new(9_999, 9_999);
        snapshot.nodes[0].tasks.clear();
        snapshot.jobs[0].tasks.clear();

        let fresh = state.snapshot();
        assert_eq!(fresh.nodes[0].used, Resource::new(1_000, 0));
        assert_eq!(fresh.jobs[0].task_count(), 1);

        let taken = state.snapshot();
        state.delete_task(&tid("t1"));
        assert_eq!(taken.nodes[0].tasks.len(), 1);
    }

    #[test]
    fn test_dump() {
        let state = SchedulerState::new();
        assert_eq!(state.to_string(), "Cache:\n");

        state.upsert_node(node("n1"), node_desc("n1"), Resource::new(4_000, 0));
        state.upsert_job_spec(job("j1"), "j1".into(), "ns".into(), 2);
        state.upsert_task(task("t1", "j1", Some("n1"), TaskStatus::Bound, 1_000));

        let dump = state.to_string();
        assert!(dump.starts_with("Cache:\nNodes:\n"));
        assert!(dump.contains(
            "\t n1: idle(cpu 3000m, memory 0) used(cpu 1000m, memory 0) allocatable(cpu 4000m, memory 0) pods(1)\n"
        ));
        assert!(dump.contains("Jobs:\n\t Job(ns/j1) name(j1) minAvailable(2)\n"));
        assert!(dump.contains("\t\t 0: Task (t1:ns/t1): job ns/j1, status bound, node n1"));
    }

    #[test]
    fn test_poisoned_lock_recovered() {
        let state = std::sync::Arc::new(SchedulerState::new());
        state.upsert_task(task("t1", "j1", None, TaskStatus::Pending, 0));

        let poisoner = std::sync::Arc::clone(&state);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(state.task_count(), 1);
        state.delete_task(&tid("t1"));
        assert_eq!(state.task_count(), 0);
    }
}
