use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use batchd_events::{resource_quantity, EventError, Pod, ResourceList, RESOURCE_CPU, RESOURCE_MEMORY};
use serde::{Deserialize, Serialize};

/// A CPU and memory amount.
///
/// CPU is in millicores and memory in bytes. Both are signed so that idle
/// capacity on an overcommitted node can go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resource {
    pub milli_cpu: i64,
    pub memory: i64,
}

impl Resource {
    pub const EMPTY: Resource = Resource {
        milli_cpu: 0,
        memory: 0,
    };

    pub fn new(milli_cpu: i64, memory: i64) -> Self {
        Self { milli_cpu, memory }
    }

    /// Reads `cpu` and `memory` from a resource list; other entries are ignored.
    pub fn from_list(list: &ResourceList) -> Result<Self, EventError> {
        Ok(Self {
            milli_cpu: resource_quantity(list, RESOURCE_CPU)?.milli_value(),
            memory: resource_quantity(list, RESOURCE_MEMORY)?.value(),
        })
    }

    /// Total request of a pod across its containers.
    pub fn from_pod_requests(pod: &Pod) -> Result<Self, EventError> {
        Ok(Self {
            milli_cpu: pod.total_request(RESOURCE_CPU)?.milli_value(),
            memory: pod.total_request(RESOURCE_MEMORY)?.value(),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Returns true if either dimension is below zero.
    pub fn is_negative(&self) -> bool {
        self.milli_cpu < 0 || self.memory < 0
    }
}

impl Add for Resource {
    type Output = Resource;

    fn add(self, rhs: Resource) -> Resource {
        Resource {
            milli_cpu: self.milli_cpu.saturating_add(rhs.milli_cpu),
            memory: self.memory.saturating_add(rhs.memory),
        }
    }
}

impl AddAssign for Resource {
    fn add_assign(&mut self, rhs: Resource) {
        *self = *self + rhs;
    }
}

impl Sub for Resource {
    type Output = Resource;

    fn sub(self, rhs: Resource) -> Resource {
        Resource {
            milli_cpu: self.milli_cpu.saturating_sub(rhs.milli_cpu),
            memory: self.memory.saturating_sub(rhs.memory),
        }
    }
}

impl SubAssign for Resource {
    fn sub_assign(&mut self, rhs: Resource) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for Resource {
    fn sum<I: Iterator<Item = Resource>>(iter: I) -> Self {
        iter.fold(Resource::EMPTY, Add::add)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu {}m, memory {}", self.milli_cpu, self.memory)
    }
}
