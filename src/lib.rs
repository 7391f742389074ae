//! Capability-based job routing for clustered instances.
//!
//! Instances announce the job topics they consume; a [`scheduler::ResolverSnapshot`]
//! built from one [`topology::TopologyView`] picks the instance that should run a
//! job, preferring the creator's cluster-group. [`scheduler::TopologyTracker`]
//! rebuilds snapshots as topology events arrive and maps topics to queues.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod shutdown;
pub mod topology;

pub use error::{Result, RouterError};
