pub mod capabilities;
pub mod job;
pub mod pattern;
pub mod queue;
pub mod resolver;
pub mod tracker;

pub use capabilities::{instances_summary, CapabilityIndex};
pub use job::JobProperties;
pub use pattern::TopicPattern;
pub use queue::{QueueInfo, QueuePolicy, QueueRegistry, QueueType};
pub use resolver::{build_snapshot, ResolverSnapshot};
pub use tracker::{Routing, TopologyTracker, TopologyUpdate};
