use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{JobManagerConfiguration, JobManagerState, RouterConfig};
use crate::scheduler::capabilities::instances_summary;
use crate::scheduler::job::{JobProperties, PROPERTY_QUEUE_NAME, PROPERTY_TARGET_INSTANCE};
use crate::scheduler::queue::{QueueRegistry, QueueType};
use crate::scheduler::resolver::ResolverSnapshot;
use crate::topology::event::TopologyEvent;
use crate::topology::view::TopologyView;

/// Outcome of applying a topology event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyUpdate {
    /// Processing stopped; no snapshot is current.
    Stopped,
    /// A new snapshot is current.
    Started {
        /// First view since startup.
        initial: bool,
        /// False when only properties irrelevant to routing changed.
        capabilities_changed: bool,
    },
}

/// Routing decision for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Routing {
    pub queue_name: String,
    pub queue_type: QueueType,
    /// Instance that should run the job, if any.
    pub target: Option<String>,
    /// The queue discards jobs for this topic.
    pub drop: bool,
}

impl Routing {
    /// Store the queue name and, if any, the target instance in `properties`.
    pub fn record(&self, properties: &mut JobProperties) {
        properties.insert(PROPERTY_QUEUE_NAME, self.queue_name.clone());
        if let Some(target) = &self.target {
            properties.insert(PROPERTY_TARGET_INSTANCE, target.clone());
        }
    }
}

/// Keeps the current resolver snapshot in step with topology events.
///
/// A new snapshot replaces (and retires) the previous one on every view
/// change; while membership is changing no snapshot is current.
#[derive(Debug)]
pub struct TopologyTracker {
    configuration: Arc<dyn JobManagerConfiguration>,
    queues: QueueRegistry,
    current: RwLock<Option<Arc<ResolverSnapshot>>>,
    first_event: AtomicBool,
}

impl TopologyTracker {
    pub fn new(configuration: Arc<dyn JobManagerConfiguration>, queues: QueueRegistry) -> Self {
        Self {
            configuration,
            queues,
            current: RwLock::new(None),
            first_event: AtomicBool::new(true),
        }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(
            Arc::new(JobManagerState::new(&config.job_manager)),
            QueueRegistry::new(config.queues.clone()),
        )
    }

    pub fn queues(&self) -> &QueueRegistry {
        &self.queues
    }

    /// The current snapshot, active or not.
    pub fn current(&self) -> Option<Arc<ResolverSnapshot>> {
        self.current.read().clone()
    }

    /// The current snapshot if it is still active.
    pub fn active_snapshot(&self) -> Option<Arc<ResolverSnapshot>> {
        self.current().filter(|s| s.is_active())
    }

    pub fn handle_event(&self, event: TopologyEvent) -> TopologyUpdate {
        let first = self.first_event.swap(false, Ordering::AcqRel);
        tracing::debug!(event = %event, first, "Topology event received");

        match event {
            TopologyEvent::Changing => {
                self.stop_processing();
                TopologyUpdate::Stopped
            }
            TopologyEvent::Init(view) => self.start_processing(view, true, true),
            TopologyEvent::Changed(view) => self.start_processing(view, first, true),
            TopologyEvent::PropertiesChanged(view) => {
                let summary = instances_summary(view.as_ref());
                let changed = self.current().map_or(true, |s| !s.is_same(&summary));
                if !changed {
                    tracing::debug!("No changes in capabilities");
                }
                self.start_processing(view, false, changed)
            }
        }
    }

    /// Push the configuration's current "disable distribution" flag into the
    /// current snapshot.
    pub fn refresh_configuration(&self) {
        if let Some(snapshot) = self.current() {
            snapshot.update(self.configuration.disable_distribution());
        }
    }

    /// Route a job: find its queue, then its target on the active snapshot.
    pub fn route(&self, topic: &str, properties: &JobProperties) -> Routing {
        let info = self.queues.queue_for(topic);
        let queue_type = info.policy.queue_type;
        let mut routing = Routing {
            queue_name: info.queue_name,
            queue_type,
            target: None,
            drop: false,
        };

        match queue_type {
            QueueType::Drop => routing.drop = true,
            QueueType::Ignore => {}
            _ => {
                routing.target = self
                    .active_snapshot()
                    .and_then(|s| s.detect_target(topic, properties, &info.policy));
            }
        }

        tracing::debug!(
            topic,
            queue = %routing.queue_name,
            target = ?routing.target,
            drop = routing.drop,
            "Job routed"
        );
        routing
    }

    /// Route a new job and record the decision in its properties.
    ///
    /// Dropped jobs are left untouched.
    pub fn assign(&self, topic: &str, properties: &mut JobProperties) -> Routing {
        let routing = self.route(topic, properties);
        if !routing.drop {
            routing.record(properties);
        }
        routing
    }

    /// Apply events until the channel closes or `shutdown` is cancelled.
    /// The current snapshot is retired on exit.
    pub async fn run(&self, mut events: mpsc::Receiver<TopologyEvent>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Topology tracker shutting down");
                    break;
                }
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            self.handle_event(event);
                        }
                        None => {
                            tracing::debug!("Topology event channel closed");
                            break;
                        }
                    }
                }
            }
        }
        self.stop_processing();
    }

    fn stop_processing(&self) {
        if let Some(previous) = self.current.write().take() {
            previous.deactivate();
            tracing::info!("Job routing stopped");
        }
    }

    fn start_processing(
        &self,
        view: Arc<dyn TopologyView>,
        initial: bool,
        capabilities_changed: bool,
    ) -> TopologyUpdate {
        let snapshot = Arc::new(ResolverSnapshot::build(view, self.configuration.clone()));
        let previous = self.current.write().replace(snapshot);
        if let Some(previous) = previous {
            previous.deactivate();
        }

        tracing::info!(initial, capabilities_changed, "Job routing started");
        TopologyUpdate::Started {
            initial,
            capabilities_changed,
        }
    }
}
