//! Entity model: tasks, jobs, nodes and the cluster snapshot.
//!
//! These are plain data records. The cache hands out owned copies of them;
//! nothing here holds a reference into live cache state.

mod cluster;
mod job;
mod node;
mod resource;
mod task;

pub use cluster::ClusterInfo;
pub use job::JobInfo;
pub use node::NodeInfo;
pub use resource::Resource;
pub use task::{TaskInfo, TaskStatus};
