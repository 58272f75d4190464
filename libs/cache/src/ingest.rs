//! Routes decoded notifications through the admission filter to the reconciler.

use batchd_events::{ClusterObject, Pod, WatchEvent};
use batchd_watch::{dispatch, FilteringHandler};
use tracing::debug;

use crate::filter::AdmissionFilter;
use crate::reconciler::{Reconciler, ResourceEvent};

type PodPredicate = Box<dyn Fn(&Pod) -> bool + Send + Sync>;

/// Entry point for every ingestion loop.
///
/// Pod notifications pass through the admission filter with add/delete
/// conversion on filter transitions; node and scheduling-spec
/// notifications go straight to the reconciler.
pub struct EventRouter {
    reconciler: Reconciler,
    tasks: FilteringHandler<PodPredicate, Reconciler>,
}

impl EventRouter {
    pub fn new(reconciler: Reconciler, filter: AdmissionFilter) -> Self {
        let admits: PodPredicate = Box::new(move |pod| filter.admits(pod));
        Self {
            tasks: FilteringHandler::new(admits, reconciler.clone()),
            reconciler,
        }
    }

    pub fn route(&self, event: WatchEvent<ClusterObject>) {
        let label = event.label();
        match ResourceEvent::classify(event) {
            Some(ResourceEvent::Task(event)) => dispatch(&self.tasks, event),
            Some(other) => self.reconciler.apply(other),
            None => debug!(event = label, "Ignoring notification"),
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SchedulerState;
    use batchd_id::{JobId, NodeName, TaskId};
    use batchd_testing::fixtures::{node, pod, scheduling_spec};
    use std::sync::Arc;

    fn router() -> (EventRouter, Arc<SchedulerState>) {
        let state = Arc::new(SchedulerState::new());
        let router = EventRouter::new(Reconciler::new(Arc::clone(&state)), AdmissionFilter::new("s1"));
        (router, state)
    }

    #[test]
    fn test_filtered_pods_never_reach_state() {
        let (router, state) = router();
        router.route(WatchEvent::Added(pod("ns", "mine").scheduler("s1").build().into()));
        router.route(WatchEvent::Added(pod("ns", "theirs").scheduler("s2").build().into()));
        router.route(WatchEvent::Added(
            pod("ns", "placed").scheduler("s2").node("n1").running().build().into(),
        ));
        router.route(WatchEvent::Added(node("n1", "4", "8Gi").into()));

        assert_eq!(state.task_count(), 2);
        assert!(state.task(&TaskId::parse("theirs").unwrap()).is_none());
        assert_eq!(state.node_count(), 1);
    }

    #[test]
    fn test_finished_pod_removed() {
        let (router, state) = router();
        let running = pod("ns", "t1").scheduler("s1").node("n1").running().build();
        let done = pod("ns", "t1").scheduler("s1").node("n1").succeeded().build();

        router.route(WatchEvent::Added(running.clone().into()));
        assert_eq!(state.task_count(), 1);

        router.route(WatchEvent::Updated {
            old: running.into(),
            new: done.into(),
        });
        assert_eq!(state.task_count(), 0);
        assert_eq!(state.node_count(), 0);
    }

    #[test]
    fn test_pod_becoming_relevant_added() {
        let (router, state) = router();
        let elsewhere = pod("ns", "t1").scheduler("s2").build();
        let placed = pod("ns", "t1").scheduler("s2").node("n1").running().build();

        router.route(WatchEvent::Added(elsewhere.clone().into()));
        router.route(WatchEvent::Updated {
            old: elsewhere.into(),
            new: placed.into(),
        });
        assert_eq!(state.task_count(), 1);
    }

    #[test]
    fn test_longest_names_still_tracked() {
        let (router, state) = router();
        let ns = "a".repeat(batchd_id::MAX_NAMESPACE_LEN);
        let name = "p".repeat(batchd_id::MAX_ID_LEN);

        router.route(WatchEvent::Added(node("n1", "4", "8Gi").into()));
        router.route(WatchEvent::Added(
            pod(&ns, &name)
                .scheduler("other")
                .node("n1")
                .running()
                .cpu("1")
                .build()
                .into(),
        ));
        router.route(WatchEvent::Added(scheduling_spec(&ns, &name, 1).into()));

        assert_eq!(state.task_count(), 1);
        assert_eq!(state.job_count(), 1);

        let snapshot = state.snapshot();
        let n1 = snapshot.node(&NodeName::parse("n1").unwrap()).unwrap();
        assert_eq!(n1.used.milli_cpu, 1_000);
        assert_eq!(n1.idle.milli_cpu, 3_000);

        let job = snapshot.job(&JobId::namespaced(&ns, &name).unwrap()).unwrap();
        assert_eq!(job.min_available, Some(1));
        assert_eq!(job.task_count(), 1);
    }

    #[test]
    fn test_sync_complete_ignored() {
        let (router, state) = router();
        router.route(WatchEvent::SyncComplete);
        assert_eq!(state.task_count(), 0);
    }
}
