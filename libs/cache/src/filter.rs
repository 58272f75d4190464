//! Admission filter for pod notifications.

use batchd_events::{Pod, PodPhase};

/// Decides which pods this scheduler instance tracks.
///
/// A pod is admitted if it is pending and names this scheduler, or if it
/// is running under any scheduler (its request still occupies node
/// capacity). Everything else is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionFilter {
    scheduler_name: String,
}

impl AdmissionFilter {
    pub fn new(scheduler_name: impl Into<String>) -> Self {
        Self {
            scheduler_name: scheduler_name.into(),
        }
    }

    pub fn scheduler_name(&self) -> &str {
        &self.scheduler_name
    }

    pub fn admits(&self, pod: &Pod) -> bool {
        match pod.status.phase {
            PodPhase::Pending => pod.spec.scheduler_name == self.scheduler_name,
            PodPhase::Running => true,
            PodPhase::Succeeded | PodPhase::Failed | PodPhase::Unknown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchd_events::{ObjectMeta, PodSpec, PodStatus};
    use rstest::rstest;

    fn pod(scheduler: &str, phase: PodPhase) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: "p".to_string(),
                uid: "u".to_string(),
                ..Default::default()
            },
            spec: PodSpec {
                scheduler_name: scheduler.to_string(),
                ..Default::default()
            },
            status: PodStatus { phase },
        }
    }

    #[rstest]
    #[case("foo", PodPhase::Pending, true)]
    #[case("bar", PodPhase::Pending, false)]
    #[case("bar", PodPhase::Running, true)]
    #[case("foo", PodPhase::Running, true)]
    #[case("foo", PodPhase::Succeeded, false)]
    #[case("bar", PodPhase::Succeeded, false)]
    #[case("foo", PodPhase::Failed, false)]
    #[case("foo", PodPhase::Unknown, false)]
    fn test_admits(#[case] scheduler: &str, #[case] phase: PodPhase, #[case] admitted: bool) {
        let filter = AdmissionFilter::new("foo");
        assert_eq!(filter.admits(&pod(scheduler, phase)), admitted);
    }
}
