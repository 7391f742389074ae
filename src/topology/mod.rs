//! Cluster membership as consumed by the router.
//!
//! The discovery layer owns membership; this module only models what it
//! hands over:
//! - [`Instance`]: one member, its cluster-group, leadership and properties
//! - [`TopologyView`]: an immutable membership snapshot ([`ClusterView`] is the
//!   in-memory implementation)
//! - [`InstanceComparator`]: the deterministic candidate order
//! - [`TopologyEvent`]: change notifications driving snapshot rebuilds

pub mod comparator;
pub mod event;
pub mod instance;
pub mod view;

pub use comparator::InstanceComparator;
pub use event::{event_channel, TopologyEvent, TopologyEventSender};
pub use instance::{Instance, PROPERTY_TOPICS};
pub use view::{ClusterView, TopologyView, ViewDescription};
