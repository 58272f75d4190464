//! Descriptor fixtures.

use std::collections::BTreeMap;

use batchd_events::{
    Container, Node, NodeStatus, ObjectMeta, OwnerReference, Pod, PodPhase, PodSpec, PodStatus,
    ResourceRequirements, SchedulingSpec, SchedulingSpecTemplate, GROUP_NAME_ANNOTATION,
    RESOURCE_CPU, RESOURCE_MEMORY,
};
use chrono::Utc;

/// Scheduler name given to fixture pods unless overridden.
pub const SCHEDULER_NAME: &str = "batchd";

/// A node with the given allocatable CPU and memory quantities.
pub fn node(name: &str, cpu: &str, memory: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: name.to_string(),
            uid: format!("node-{name}"),
            ..Default::default()
        },
        status: NodeStatus {
            allocatable: BTreeMap::from([
                (RESOURCE_CPU.to_string(), cpu.to_string()),
                (RESOURCE_MEMORY.to_string(), memory.to_string()),
            ]),
        },
    }
}

/// A scheduling specification for job `namespace/name`.
pub fn scheduling_spec(namespace: &str, name: &str, min_available: u32) -> SchedulingSpec {
    SchedulingSpec {
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: namespace.to_string(),
            uid: format!("spec-{namespace}-{name}"),
            ..Default::default()
        },
        spec: SchedulingSpecTemplate { min_available },
    }
}

/// Starts a pending pod named `name`, with uid `name`, owned by no job.
pub fn pod(namespace: &str, name: &str) -> PodBuilder {
    PodBuilder {
        pod: Pod {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
                uid: name.to_string(),
                ..Default::default()
            },
            spec: PodSpec {
                scheduler_name: SCHEDULER_NAME.to_string(),
                node_name: None,
                containers: vec![Container {
                    name: "main".to_string(),
                    resources: ResourceRequirements::default(),
                }],
            },
            status: PodStatus {
                phase: PodPhase::Pending,
            },
        },
    }
}

/// Builder for fixture pods.
#[derive(Debug, Clone)]
pub struct PodBuilder {
    pod: Pod,
}

impl PodBuilder {
    pub fn uid(mut self, uid: &str) -> Self {
        self.pod.metadata.uid = uid.to_string();
        self
    }

    /// Assigns the pod to job `<namespace>/<group>` through the group annotation.
    pub fn group(mut self, group: &str) -> Self {
        self.pod
            .metadata
            .annotations
            .insert(GROUP_NAME_ANNOTATION.to_string(), group.to_string());
        self
    }

    /// Adds a controlling owner reference.
    pub fn owner(mut self, kind: &str, uid: &str) -> Self {
        self.pod.metadata.owner_references.push(OwnerReference {
            kind: kind.to_string(),
            name: uid.to_string(),
            uid: uid.to_string(),
            controller: true,
        });
        self
    }

    pub fn scheduler(mut self, name: &str) -> Self {
        self.pod.spec.scheduler_name = name.to_string();
        self
    }

    pub fn node(mut self, name: &str) -> Self {
        self.pod.spec.node_name = Some(name.to_string());
        self
    }

    /// Sets the CPU request of the main container.
    pub fn cpu(self, quantity: &str) -> Self {
        self.request(RESOURCE_CPU, quantity)
    }

    /// Sets the memory request of the main container.
    pub fn memory(self, quantity: &str) -> Self {
        self.request(RESOURCE_MEMORY, quantity)
    }

    /// Adds a container with its own CPU request.
    pub fn sidecar(mut self, name: &str, cpu: &str) -> Self {
        let mut resources = ResourceRequirements::default();
        resources
            .requests
            .insert(RESOURCE_CPU.to_string(), cpu.to_string());
        self.pod.spec.containers.push(Container {
            name: name.to_string(),
            resources,
        });
        self
    }

    pub fn phase(mut self, phase: PodPhase) -> Self {
        self.pod.status.phase = phase;
        self
    }

    pub fn running(self) -> Self {
        self.phase(PodPhase::Running)
    }

    pub fn succeeded(self) -> Self {
        self.phase(PodPhase::Succeeded)
    }

    pub fn failed(self) -> Self {
        self.phase(PodPhase::Failed)
    }

    /// Marks the pod as asked to terminate.
    pub fn terminating(mut self) -> Self {
        self.pod.metadata.deletion_timestamp = Some(Utc::now());
        self
    }

    pub fn build(self) -> Pod {
        self.pod
    }

    fn request(mut self, resource: &str, quantity: &str) -> Self {
        if let Some(main) = self.pod.spec.containers.first_mut() {
            main.resources
                .requests
                .insert(resource.to_string(), quantity.to_string());
        }
        self
    }
}
