//! Task status transition policies.

use crate::api::TaskStatus;

/// Decides whether a task may move from one status to another.
pub trait TransitionPolicy: Send + Sync {
    fn allows(&self, from: TaskStatus, to: TaskStatus) -> bool;
}

/// The standard transition table. Identity transitions are always allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransitionPolicy;

impl TransitionPolicy for DefaultTransitionPolicy {
    fn allows(&self, from: TaskStatus, to: TaskStatus) -> bool {
        use TaskStatus::*;

        if from == to {
            return true;
        }

        match from {
            Pending => matches!(to, Allocated | Binding | Bound),
            Allocated => matches!(to, Pending | Binding | Bound),
            Binding => matches!(to, Pending | Bound),
            Bound => matches!(to, Pending | Running | Releasing | Failed),
            Running => matches!(to, Releasing | Succeeded | Failed),
            Releasing => matches!(to, Pending | Succeeded | Failed),
            Unknown => matches!(to, Pending | Running | Succeeded | Failed),
            Succeeded | Failed => false,
        }
    }
}

/// Allows every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllTransitions;

impl TransitionPolicy for AllowAllTransitions {
    fn allows(&self, _from: TaskStatus, _to: TaskStatus) -> bool {
        true
    }
}

impl<F> TransitionPolicy for F
where
    F: Fn(TaskStatus, TaskStatus) -> bool + Send + Sync,
{
    fn allows(&self, from: TaskStatus, to: TaskStatus) -> bool {
        self(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use crate::api::TaskStatus::*;

    #[rstest]
    #[case(Pending, Allocated, true)]
    #[case(Pending, Bound, true)]
    #[case(Pending, Running, false)]
    #[case(Allocated, Pending, true)]
    #[case(Binding, Bound, true)]
    #[case(Binding, Running, false)]
    #[case(Bound, Running, true)]
    #[case(Bound, Succeeded, false)]
    #[case(Running, Succeeded, true)]
    #[case(Running, Pending, false)]
    #[case(Releasing, Pending, true)]
    #[case(Unknown, Running, true)]
    #[case(Succeeded, Pending, false)]
    #[case(Failed, Running, false)]
    fn test_default_table(#[case] from: TaskStatus, #[case] to: TaskStatus, #[case] allowed: bool) {
        assert_eq!(DefaultTransitionPolicy.allows(from, to), allowed);
    }

    #[test]
    fn test_identity_always_allowed() {
        for status in TaskStatus::ALL {
            assert!(DefaultTransitionPolicy.allows(status, status));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        for to in TaskStatus::ALL {
            if to != Succeeded {
                assert!(!DefaultTransitionPolicy.allows(Succeeded, to));
            }
            if to != Failed {
                assert!(!DefaultTransitionPolicy.allows(Failed, to));
            }
        }
    }

    #[test]
    fn test_closure_policy() {
        let never_back_to_pending = |_: TaskStatus, to: TaskStatus| to != Pending;
        assert!(never_back_to_pending.allows(Pending, Running));
        assert!(!never_back_to_pending.allows(Bound, Pending));
        assert!(AllowAllTransitions.allows(Succeeded, Pending));
    }
}
