use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{Result, RouterError};
use crate::topology::view::TopologyView;

/// Membership change notification from the discovery layer.
#[derive(Debug, Clone)]
pub enum TopologyEvent {
    /// First view after startup.
    Init(Arc<dyn TopologyView>),
    /// Membership is in flux; no view is trustworthy until the next change.
    Changing,
    /// Membership changed.
    Changed(Arc<dyn TopologyView>),
    /// Same members, different announced properties.
    PropertiesChanged(Arc<dyn TopologyView>),
}

impl fmt::Display for TopologyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyEvent::Init(_) => write!(f, "init"),
            TopologyEvent::Changing => write!(f, "changing"),
            TopologyEvent::Changed(_) => write!(f, "changed"),
            TopologyEvent::PropertiesChanged(_) => write!(f, "properties_changed"),
        }
    }
}

/// Sending half of a topology event channel.
#[derive(Debug, Clone)]
pub struct TopologyEventSender {
    tx: mpsc::Sender<TopologyEvent>,
}

impl TopologyEventSender {
    pub async fn send(&self, event: TopologyEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RouterError::ChannelClosed)
    }
}

/// Bounded channel feeding a [`TopologyTracker`](crate::scheduler::tracker::TopologyTracker).
pub fn event_channel(capacity: usize) -> (TopologyEventSender, mpsc::Receiver<TopologyEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (TopologyEventSender { tx }, rx)
}
