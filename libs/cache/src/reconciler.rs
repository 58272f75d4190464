//! Translates change notifications into state mutations.
//!
//! One add/update entry point and one delete entry point per resource kind.
//! Every entry point is idempotent: applying the same notification twice
//! leaves the state as applying it once. Payloads that cannot be turned
//! into cache entries (bad identifiers, unparsable quantities) are dropped
//! with a debug log.

use std::sync::Arc;

use batchd_events::{ClusterObject, Node, Pod, SchedulingSpec, WatchEvent};
use batchd_watch::{dispatch, ResourceHandler};
use tracing::{debug, info, instrument};

use crate::api::{Resource, TaskInfo};
use crate::state::SchedulerState;

/// A change notification with its payload kind resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    Node(WatchEvent<Node>),
    Task(WatchEvent<Pod>),
    JobSpec(WatchEvent<SchedulingSpec>),
}

impl ResourceEvent {
    /// Splits a decoded notification by kind.
    ///
    /// Returns `None` for `SyncComplete` and for updates whose two sides
    /// are of different kinds.
    pub fn classify(event: WatchEvent<ClusterObject>) -> Option<Self> {
        match event {
            WatchEvent::Added(obj) => Some(match obj {
                ClusterObject::Node(node) => ResourceEvent::Node(WatchEvent::Added(node)),
                ClusterObject::Pod(pod) => ResourceEvent::Task(WatchEvent::Added(pod)),
                ClusterObject::SchedulingSpec(spec) => {
                    ResourceEvent::JobSpec(WatchEvent::Added(spec))
                }
            }),
            WatchEvent::Updated { old, new } => match (old, new) {
                (ClusterObject::Node(old), ClusterObject::Node(new)) => {
                    Some(ResourceEvent::Node(WatchEvent::Updated { old, new }))
                }
                (ClusterObject::Pod(old), ClusterObject::Pod(new)) => {
                    Some(ResourceEvent::Task(WatchEvent::Updated { old, new }))
                }
                (ClusterObject::SchedulingSpec(old), ClusterObject::SchedulingSpec(new)) => {
                    Some(ResourceEvent::JobSpec(WatchEvent::Updated { old, new }))
                }
                _ => None,
            },
            WatchEvent::Deleted(obj) => Some(match obj {
                ClusterObject::Node(node) => ResourceEvent::Node(WatchEvent::Deleted(node)),
                ClusterObject::Pod(pod) => ResourceEvent::Task(WatchEvent::Deleted(pod)),
                ClusterObject::SchedulingSpec(spec) => {
                    ResourceEvent::JobSpec(WatchEvent::Deleted(spec))
                }
            }),
            WatchEvent::SyncComplete => None,
        }
    }
}

/// Applies notifications to a [`SchedulerState`].
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct Reconciler {
    state: Arc<SchedulerState>,
}

impl Reconciler {
    pub fn new(state: Arc<SchedulerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<SchedulerState> {
        &self.state
    }

    /// Applies one notification without filtering.
    ///
    /// Task notifications reaching this point are assumed to have passed
    /// the admission filter.
    pub fn apply(&self, event: ResourceEvent) {
        match event {
            ResourceEvent::Node(event) => dispatch(self, event),
            ResourceEvent::Task(event) => dispatch(self, event),
            ResourceEvent::JobSpec(event) => dispatch(self, event),
        }
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    #[instrument(skip(self, node), fields(node = %node.metadata.name))]
    pub fn upsert_node(&self, node: Node) {
        let name = match node.node_name() {
            Ok(name) => name,
            Err(e) => {
                debug!(error = %e, "Dropping node notification");
                return;
            }
        };
        let allocatable = match Resource::from_list(&node.status.allocatable) {
            Ok(allocatable) => allocatable,
            Err(e) => {
                debug!(error = %e, "Dropping node with unparsable capacity");
                return;
            }
        };

        self.state.upsert_node(name, node, allocatable);
        debug!(%allocatable, "Node upserted");
    }

    #[instrument(skip(self, node), fields(node = %node.metadata.name))]
    pub fn delete_node(&self, node: Node) {
        let name = match node.node_name() {
            Ok(name) => name,
            Err(e) => {
                debug!(error = %e, "Dropping node notification");
                return;
            }
        };

        let unbound = self.state.delete_node(&name);
        info!(unbound, "Node removed");
    }

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    #[instrument(skip(self, pod), fields(task_id = %pod.metadata.uid, pod = %pod.metadata.name))]
    pub fn upsert_task(&self, pod: Pod) {
        let task = match TaskInfo::from_pod(pod) {
            Ok(task) => task,
            Err(e) => {
                debug!(error = %e, "Dropping pod notification");
                return;
            }
        };

        debug!(job_id = %task.job, status = %task.status, "Task upserted");
        self.state.upsert_task(task);
    }

    #[instrument(skip(self, pod), fields(task_id = %pod.metadata.uid, pod = %pod.metadata.name))]
    pub fn delete_task(&self, pod: Pod) {
        let id = match pod.task_id() {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "Dropping pod notification");
                return;
            }
        };

        match self.state.delete_task(&id) {
            Some(task) => debug!(job_id = %task.job, "Task removed"),
            None => debug!("Task already absent"),
        }
    }

    // -------------------------------------------------------------------------
    // Job specifications
    // -------------------------------------------------------------------------

    #[instrument(skip(self, spec), fields(spec = %spec.metadata.name, namespace = %spec.metadata.namespace))]
    pub fn upsert_job_spec(&self, spec: SchedulingSpec) {
        let id = match spec.job_id() {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "Dropping scheduling spec notification");
                return;
            }
        };

        let min_available = spec.spec.min_available;
        let SchedulingSpec { metadata, .. } = spec;
        self.state
            .upsert_job_spec(id.clone(), metadata.name, metadata.namespace, min_available);
        debug!(job_id = %id, min_available, "Job upserted");
    }

    #[instrument(skip(self, spec), fields(spec = %spec.metadata.name, namespace = %spec.metadata.namespace))]
    pub fn delete_job_spec(&self, spec: SchedulingSpec) {
        let id = match spec.job_id() {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "Dropping scheduling spec notification");
                return;
            }
        };

        let removed = self.state.delete_job(&id);
        info!(job_id = %id, removed_tasks = removed.len(), "Job removed");
    }
}

impl ResourceHandler<Node> for Reconciler {
    fn on_add(&self, node: Node) {
        self.upsert_node(node);
    }

    fn on_update(&self, _old: Node, new: Node) {
        self.upsert_node(new);
    }

    fn on_delete(&self, node: Node) {
        self.delete_node(node);
    }
}

impl ResourceHandler<Pod> for Reconciler {
    fn on_add(&self, pod: Pod) {
        self.upsert_task(pod);
    }

    fn on_update(&self, old: Pod, new: Pod) {
        // A recreated pod keeps its name but gets a new uid.
        if old.metadata.uid != new.metadata.uid {
            self.delete_task(old);
        }
        self.upsert_task(new);
    }

    fn on_delete(&self, pod: Pod) {
        self.delete_task(pod);
    }
}

impl ResourceHandler<SchedulingSpec> for Reconciler {
    fn on_add(&self, spec: SchedulingSpec) {
        self.upsert_job_spec(spec);
    }

    fn on_update(&self, _old: SchedulingSpec, new: SchedulingSpec) {
        self.upsert_job_spec(new);
    }

    fn on_delete(&self, spec: SchedulingSpec) {
        self.delete_job_spec(spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TaskStatus;
    use batchd_id::{JobId, NodeName, TaskId};
    use batchd_testing::fixtures::{node, pod, scheduling_spec};

    fn reconciler() -> Reconciler {
        Reconciler::new(Arc::new(SchedulerState::new()))
    }

    #[test]
    fn test_classify() {
        let event = WatchEvent::Added(ClusterObject::Node(node("n1", "4", "8Gi")));
        assert!(matches!(
            ResourceEvent::classify(event),
            Some(ResourceEvent::Node(WatchEvent::Added(_)))
        ));

        let mixed = WatchEvent::Updated {
            old: ClusterObject::Node(node("n1", "4", "8Gi")),
            new: ClusterObject::SchedulingSpec(scheduling_spec("ns", "j1", 1)),
        };
        assert_eq!(ResourceEvent::classify(mixed), None);
        assert_eq!(ResourceEvent::classify(WatchEvent::SyncComplete), None);
    }

    #[test]
    fn test_apply_routes_by_kind() {
        let r = reconciler();
        r.apply(ResourceEvent::Node(WatchEvent::Added(node("n1", "4", "8Gi"))));
        r.apply(ResourceEvent::JobSpec(WatchEvent::Added(scheduling_spec("ns", "j1", 2))));
        r.apply(ResourceEvent::Task(WatchEvent::Added(
            pod("ns", "t1").group("j1").cpu("1").build(),
        )));

        let snapshot = r.state().snapshot();
        assert_eq!(snapshot.nodes.len(), 1);
        let job = snapshot.job(&JobId::parse("ns/j1").unwrap()).unwrap();
        assert_eq!(job.min_available, Some(2));
        assert_eq!(job.tasks_in(TaskStatus::Pending).count(), 1);
    }

    #[test]
    fn test_invalid_payloads_dropped() {
        let r = reconciler();
        r.upsert_node(node("n1", "lots", "8Gi"));
        r.upsert_task(pod("ns", "t1").uid("").build());
        r.upsert_task(pod("ns", "t2").cpu("??").build());
        r.upsert_job_spec(scheduling_spec("ns", "bad name", 1));

        assert_eq!(r.state().node_count(), 0);
        assert_eq!(r.state().task_count(), 0);
        assert_eq!(r.state().job_count(), 0);
    }

    #[test]
    fn test_pod_recreated_under_same_name() {
        let r = reconciler();
        let old = pod("ns", "t1").uid("uid-a").node("n1").running().build();
        let new = pod("ns", "t1").uid("uid-b").node("n1").running().build();

        ResourceHandler::<Pod>::on_add(&r, old.clone());
        ResourceHandler::<Pod>::on_update(&r, old, new);

        assert!(r.state().task(&TaskId::parse("uid-a").unwrap()).is_none());
        assert!(r.state().task(&TaskId::parse("uid-b").unwrap()).is_some());
        let snapshot = r.state().snapshot();
        let n1 = snapshot.node(&NodeName::parse("n1").unwrap()).unwrap();
        assert_eq!(n1.tasks.len(), 1);
    }

    #[test]
    fn test_container_requests_add_up_on_node() {
        let r = reconciler();
        r.upsert_node(node("n1", "4", "8Gi"));
        r.upsert_task(
            pod("ns", "t1")
                .node("n1")
                .running()
                .cpu("500m")
                .memory("1Gi")
                .sidecar("proxy", "250m")
                .build(),
        );

        let snapshot = r.state().snapshot();
        let n1 = snapshot.node(&NodeName::parse("n1").unwrap()).unwrap();
        assert_eq!(n1.used.milli_cpu, 750);
        assert_eq!(n1.used.memory, 1024 * 1024 * 1024);
        assert_eq!(n1.idle.milli_cpu, 3_250);
    }

    #[test]
    fn test_status_buckets_follow_pod_state() {
        let r = reconciler();
        r.upsert_task(pod("ns", "t1").group("j1").node("n1").running().terminating().build());
        r.upsert_task(pod("ns", "t2").group("j1").node("n1").failed().build());
        r.upsert_task(pod("ns", "t3").group("j1").build());

        let snapshot = r.state().snapshot();
        let job = snapshot.job(&JobId::parse("ns/j1").unwrap()).unwrap();
        assert_eq!(job.tasks_in(TaskStatus::Releasing).count(), 1);
        assert_eq!(job.tasks_in(TaskStatus::Failed).count(), 1);
        assert_eq!(job.tasks_in(TaskStatus::Pending).count(), 1);
        assert!(job.is_placeholder());
    }

    #[test]
    fn test_controller_owner_names_job() {
        let r = reconciler();
        r.upsert_task(pod("ns", "w-0").owner("ReplicaSet", "rs-1").build());
        r.upsert_task(pod("ns", "w-1").owner("ReplicaSet", "rs-1").build());
        r.upsert_task(
            pod("ns", "w-2")
                .owner("ReplicaSet", "rs-1")
                .group("explicit")
                .build(),
        );

        let snapshot = r.state().snapshot();
        let owned = snapshot.job(&JobId::parse("ns/rs-1").unwrap()).unwrap();
        assert_eq!(owned.task_count(), 2);
        let grouped = snapshot.job(&JobId::parse("ns/explicit").unwrap()).unwrap();
        assert_eq!(grouped.task_count(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let r = reconciler();
        let p = pod("ns", "t1").build();
        r.upsert_task(p.clone());
        r.delete_task(p.clone());
        r.delete_task(p);
        assert_eq!(r.state().task_count(), 0);
        assert_eq!(r.state().job_count(), 0);

        let spec = scheduling_spec("ns", "j1", 1);
        r.upsert_job_spec(spec.clone());
        r.delete_job_spec(spec.clone());
        r.delete_job_spec(spec);
        assert_eq!(r.state().job_count(), 0);
    }
}
