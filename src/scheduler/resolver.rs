use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::JobManagerConfiguration;
use crate::scheduler::capabilities::{instances_summary, CapabilityIndex};
use crate::scheduler::job::JobProperties;
use crate::scheduler::queue::QueuePolicy;
use crate::topology::instance::Instance;
use crate::topology::view::TopologyView;

/// Target resolution against one topology view.
///
/// Built once per membership change. The capability index is immutable; the
/// only mutable state is the per-topic round-robin cursor map. A snapshot
/// stays usable until it is deactivated, its job manager configuration goes
/// inactive, or its view stops being current. Results obtained from an
/// inactive snapshot may name instances that already left the cluster.
#[derive(Debug)]
pub struct ResolverSnapshot {
    view: Arc<dyn TopologyView>,
    configuration: Arc<dyn JobManagerConfiguration>,
    index: CapabilityIndex,
    summary: BTreeMap<String, String>,
    local_id: String,
    is_leader: bool,
    active: AtomicBool,
    disable_distribution: AtomicBool,
    round_robin: Mutex<HashMap<String, usize>>,
}

impl ResolverSnapshot {
    pub fn build(
        view: Arc<dyn TopologyView>,
        configuration: Arc<dyn JobManagerConfiguration>,
    ) -> Self {
        let index = CapabilityIndex::build(view.as_ref());
        let summary = instances_summary(view.as_ref());
        let local = view.local_instance();
        let local_id = local.id.clone();
        let is_leader = local.leader;
        let disable_distribution = configuration.disable_distribution();

        tracing::info!(
            local_id = %local_id,
            leader = is_leader,
            instances = index.instance_count(),
            patterns = index.pattern_count(),
            disable_distribution,
            "Topology snapshot built"
        );

        Self {
            view,
            configuration,
            index,
            summary,
            local_id,
            is_leader,
            active: AtomicBool::new(true),
            disable_distribution: AtomicBool::new(disable_distribution),
            round_robin: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
            && self.configuration.is_active()
            && self.view.is_current()
    }

    /// Retire this snapshot. Idempotent and irreversible.
    pub fn deactivate(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            tracing::info!(local_id = %self.local_id, "Topology snapshot retired");
        }
    }

    /// Refresh the captured "disable distribution" flag.
    pub fn update(&self, disable_distribution: bool) {
        self.disable_distribution
            .store(disable_distribution, Ordering::Release);
    }

    /// Whether the local instance leads its cluster-group.
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    pub fn local_instance_id(&self) -> &str {
        &self.local_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.view.created_at()
    }

    /// True when `summary` announces the same capabilities for the same instances.
    pub fn is_same(&self, summary: &BTreeMap<String, String>) -> bool {
        &self.summary == summary
    }

    pub fn instance_capabilities(&self) -> BTreeMap<String, Vec<String>> {
        self.index.patterns()
    }

    /// Ids of all instances able to consume `topic`, in comparator order.
    pub fn potential_targets(&self, topic: &str) -> Vec<String> {
        self.index
            .potential_targets(topic)
            .iter()
            .map(|i| i.id.clone())
            .collect()
    }

    /// Pick the instance that should run a job for `topic`.
    ///
    /// Returns `None` when no instance announces a matching pattern.
    pub fn detect_target(
        &self,
        topic: &str,
        properties: &JobProperties,
        policy: &QueuePolicy,
    ) -> Option<String> {
        if !self.is_active() {
            tracing::debug!(topic, "Resolving target against an inactive topology snapshot");
        }

        let mut targets = self.index.potential_targets(topic);
        if targets.is_empty() {
            tracing::debug!(topic, "No instance announces a matching topic");
            return None;
        }

        let created_on = properties.created_instance().unwrap_or(&self.local_id);
        match self.index.instance(created_on) {
            Some(origin) => {
                let same_group = self.same_group_targets(&targets, origin);
                if !same_group.is_empty() {
                    targets = same_group;
                }
            }
            None => {
                tracing::debug!(
                    topic,
                    created_on,
                    "Creation instance not in topology, skipping affinity"
                );
            }
        }

        if policy.prefer_run_on_creation_instance {
            if let Some(origin) = targets.iter().find(|t| t.id == created_on).cloned() {
                targets = vec![origin];
            }
        }

        let target = if policy.is_ordered() {
            // Every resolver must agree on the target without talking to each other
            targets.first()?
        } else {
            let index = self.next_round_robin_index(topic, targets.len());
            targets.get(index)?
        };

        tracing::debug!(
            topic,
            target = %target.id,
            queue_type = %policy.queue_type,
            candidates = targets.len(),
            "Target detected"
        );
        Some(target.id.clone())
    }

    /// Candidates in the origin's cluster-group; only leaders when distribution is disabled.
    fn same_group_targets(
        &self,
        targets: &[Arc<Instance>],
        origin: &Instance,
    ) -> Vec<Arc<Instance>> {
        let disable_distribution = self.disable_distribution.load(Ordering::Acquire);
        targets
            .iter()
            .filter(|t| t.cluster_id == origin.cluster_id)
            .filter(|t| !disable_distribution || t.leader)
            .cloned()
            .collect()
    }

    fn next_round_robin_index(&self, topic: &str, len: usize) -> usize {
        let mut cursors = self.round_robin.lock();
        let cursor = cursors.entry(topic.to_string()).or_insert(0);
        if *cursor >= len {
            *cursor = 0;
        }
        let index = *cursor;
        *cursor = index + 1;
        index
    }
}

/// Build a resolver snapshot for a freshly observed topology view.
pub fn build_snapshot(
    view: Arc<dyn TopologyView>,
    configuration: Arc<dyn JobManagerConfiguration>,
) -> ResolverSnapshot {
    ResolverSnapshot::build(view, configuration)
}
