//! Typed identifier definitions for cluster objects.

use crate::{define_id, IdError, MAX_ID_LEN, MAX_JOB_ID_LEN, MAX_NAMESPACE_LEN};

// =============================================================================
// Workload
// =============================================================================

define_id!(TaskId, "task");
define_id!(JobId, "job", MAX_JOB_ID_LEN);

// =============================================================================
// Capacity
// =============================================================================

define_id!(NodeName, "node");

impl TaskId {
    /// Generates a fresh random identifier in the control plane's UID format.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl JobId {
    /// Separator between namespace and group name in a job key.
    pub const SEPARATOR: char = '/';

    /// Builds the canonical `namespace/name` job key.
    ///
    /// Each part is held to its own limit; an empty namespace is allowed
    /// for cluster-scoped groups.
    pub fn namespaced(namespace: &str, name: &str) -> Result<Self, IdError> {
        if namespace.len() > MAX_NAMESPACE_LEN {
            return Err(IdError::TooLong {
                max: MAX_NAMESPACE_LEN,
                actual: namespace.len(),
            });
        }
        if name.len() > MAX_ID_LEN {
            return Err(IdError::TooLong {
                max: MAX_ID_LEN,
                actual: name.len(),
            });
        }
        Self::parse(format!("{namespace}{}{name}", Self::SEPARATOR))
    }

    /// Returns the namespace portion, if the key is namespaced.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(Self::SEPARATOR).map(|(ns, _)| ns)
    }

    /// Returns the group name portion (the whole key if not namespaced).
    #[must_use]
    pub fn name(&self) -> &str {
        self.0
            .split_once(Self::SEPARATOR)
            .map_or(self.0.as_str(), |(_, name)| name)
    }
}

// =============================================================================
// Tests
// =============================================================================
