//! # batchd-events
//!
//! Workload descriptors and change notifications for the batchd scheduler cache.
//!
//! ## Design Principles
//!
//! - Descriptors mirror the control plane's wire shape (camelCase JSON)
//! - Every notification carries one strongly-typed object, tagged by `kind`
//! - Malformed payloads surface as typed errors; the caller decides to drop them
//!
//! ## Object Kinds
//!
//! - `Pod`: a workload unit; becomes a task in the cache
//! - `Node`: a capacity-bearing scheduling target
//! - `SchedulingSpec`: a job-grouping specification (min-available contract)
//!
//! ## Identity Contract
//!
//! - Task identifier: the pod's `metadata.uid`
//! - Job identifier: `namespace/<group-name annotation>`, else
//!   `namespace/<controller owner uid>`, else `namespace/<pod name>`
//! - Job-specification identifier: `namespace/<spec name>`

mod error;
mod objects;
mod quantity;
mod watch;

pub use error::EventError;
pub use objects::*;
pub use quantity::Quantity;
pub use watch::*;
