//! Workload descriptors delivered by the change source.
//!
//! Field names follow the control plane's JSON schema. Only the fields the
//! cache reads are modelled; unknown fields are ignored on decode.

use std::collections::BTreeMap;

use batchd_id::{JobId, NodeName, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventError, Quantity};

/// Annotation naming the job a pod belongs to.
pub const GROUP_NAME_ANNOTATION: &str = "scheduling.batchd.io/group-name";

/// Scheduler name the control plane assigns when a pod does not choose one.
pub const DEFAULT_SCHEDULER_NAME: &str = "default-scheduler";

/// Resource name for CPU in a [`ResourceList`].
pub const RESOURCE_CPU: &str = "cpu";

/// Resource name for memory in a [`ResourceList`].
pub const RESOURCE_MEMORY: &str = "memory";

/// Resource name to quantity string, e.g. `{"cpu": "500m", "memory": "1Gi"}`.
pub type ResourceList = BTreeMap<String, String>;

/// Parses one entry of a resource list, treating a missing entry as zero.
pub fn resource_quantity(list: &ResourceList, name: &str) -> Result<Quantity, EventError> {
    list.get(name)
        .map_or(Ok(Quantity::ZERO), |raw| Quantity::parse(raw))
}

// =============================================================================
// Metadata
// =============================================================================

/// Metadata common to every object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub uid: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,

    /// Set once the object has been asked to terminate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

/// Reference from an object to the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,

    #[serde(default)]
    pub controller: bool,
}

// =============================================================================
// Pod
// =============================================================================

/// Lifecycle phase reported for a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PodPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PodPhase::Pending => "pending",
            PodPhase::Running => "running",
            PodPhase::Succeeded => "succeeded",
            PodPhase::Failed => "failed",
            PodPhase::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A workload unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: PodSpec,

    #[serde(default)]
    pub status: PodStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default = "default_scheduler_name")]
    pub scheduler_name: String,

    /// Node the pod is bound to; absent until binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Default for PodSpec {
    fn default() -> Self {
        Self {
            scheduler_name: default_scheduler_name(),
            node_name: None,
            containers: Vec::new(),
        }
    }
}

fn default_scheduler_name() -> String {
    DEFAULT_SCHEDULER_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Container {
    pub name: String,

    #[serde(default)]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub requests: ResourceList,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PodStatus {
    #[serde(default)]
    pub phase: PodPhase,
}

impl Pod {
    /// Task identifier: the pod's UID.
    pub fn task_id(&self) -> Result<TaskId, EventError> {
        TaskId::parse(self.metadata.uid.as_str()).map_err(|source| EventError::InvalidIdentifier {
            field: "metadata.uid",
            source,
        })
    }

    /// Owning job identifier.
    ///
    /// Precedence: the group-name annotation, then the controller owner's
    /// UID, then the pod's own name (a single-task job). All forms are
    /// scoped by the pod's namespace.
    pub fn job_id(&self) -> Result<JobId, EventError> {
        let meta = &self.metadata;
        let group = meta
            .annotations
            .get(GROUP_NAME_ANNOTATION)
            .map(String::as_str)
            .or_else(|| {
                meta.owner_references
                    .iter()
                    .find(|owner| owner.controller)
                    .map(|owner| owner.uid.as_str())
            })
            .unwrap_or(meta.name.as_str());

        JobId::namespaced(&meta.namespace, group).map_err(|source| {
            EventError::InvalidIdentifier {
                field: "job id",
                source,
            }
        })
    }

    /// Node the pod is bound to, if any.
    pub fn node_name(&self) -> Result<Option<NodeName>, EventError> {
        match self.spec.node_name.as_deref() {
            None | Some("") => Ok(None),
            Some(name) => NodeName::parse(name).map(Some).map_err(|source| {
                EventError::InvalidIdentifier {
                    field: "spec.nodeName",
                    source,
                }
            }),
        }
    }

    /// Returns true once the pod has been asked to terminate.
    pub fn is_terminating(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Sums one resource across all containers' requests.
    pub fn total_request(&self, resource: &str) -> Result<Quantity, EventError> {
        self.spec.containers.iter().try_fold(Quantity::ZERO, |acc, c| {
            let q = resource_quantity(&c.resources.requests, resource)?;
            Ok(Quantity::from_millis(acc.milli_value().saturating_add(q.milli_value())))
        })
    }
}

// =============================================================================
// Node
// =============================================================================

/// A scheduling target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub allocatable: ResourceList,
}

impl Node {
    /// Node identifier: the node's registered name.
    pub fn node_name(&self) -> Result<NodeName, EventError> {
        NodeName::parse(self.metadata.name.as_str()).map_err(|source| {
            EventError::InvalidIdentifier {
                field: "metadata.name",
                source,
            }
        })
    }
}

// =============================================================================
// SchedulingSpec
// =============================================================================

/// A job-grouping specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingSpec {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: SchedulingSpecTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingSpecTemplate {
    /// Tasks that must be running before the job counts as scheduled.
    #[serde(default)]
    pub min_available: u32,
}

impl SchedulingSpec {
    /// Job identifier: `namespace/name` of the specification.
    pub fn job_id(&self) -> Result<JobId, EventError> {
        JobId::namespaced(&self.metadata.namespace, &self.metadata.name).map_err(|source| {
            EventError::InvalidIdentifier {
                field: "metadata.name",
                source,
            }
        })
    }
}

// =============================================================================
// Tagged payload
// =============================================================================

/// The resource kinds the cache ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    Node,
    SchedulingSpec,
}

impl ResourceKind {
    /// All kinds, in the order their ingestion loops are started.
    pub const ALL: [ResourceKind; 3] = [Self::Pod, Self::Node, Self::SchedulingSpec];

    /// The `kind` tag carried by raw payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Node => "Node",
            ResourceKind::SchedulingSpec => "SchedulingSpec",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded object, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ClusterObject {
    Pod(Pod),
    Node(Node),
    SchedulingSpec(SchedulingSpec),
}

impl ClusterObject {
    /// Decodes a raw JSON payload.
    ///
    /// The `kind` tag is checked first so an unrecognised kind is reported
    /// as such rather than as a schema mismatch.
    pub fn decode(raw: &serde_json::Value) -> Result<Self, EventError> {
        let kind = raw
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| EventError::UnknownKind("<missing>".to_string()))?;

        if !ResourceKind::ALL.iter().any(|k| k.as_str() == kind) {
            return Err(EventError::UnknownKind(kind.to_string()));
        }

        Ok(Self::deserialize(raw)?)
    }

    /// The kind of this object.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ClusterObject::Pod(_) => ResourceKind::Pod,
            ClusterObject::Node(_) => ResourceKind::Node,
            ClusterObject::SchedulingSpec(_) => ResourceKind::SchedulingSpec,
        }
    }

    /// The object's metadata.
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ClusterObject::Pod(p) => &p.metadata,
            ClusterObject::Node(n) => &n.metadata,
            ClusterObject::SchedulingSpec(s) => &s.metadata,
        }
    }
}

impl From<Pod> for ClusterObject {
    fn from(pod: Pod) -> Self {
        ClusterObject::Pod(pod)
    }
}

impl From<Node> for ClusterObject {
    fn from(node: Node) -> Self {
        ClusterObject::Node(node)
    }
}

impl From<SchedulingSpec> for ClusterObject {
    fn from(spec: SchedulingSpec) -> Self {
        ClusterObject::SchedulingSpec(spec)
    }
}

// =============================================================================
// Tests
// =============================================================================
