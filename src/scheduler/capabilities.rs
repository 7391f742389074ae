use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::scheduler::pattern::lookup_keys;
use crate::topology::comparator::InstanceComparator;
use crate::topology::instance::Instance;
use crate::topology::view::TopologyView;

/// Topic pattern -> instances announcing it, built once per topology view.
///
/// Every candidate list is kept in [`InstanceComparator`] order and holds an
/// instance at most once. Immutable after construction.
#[derive(Debug, Clone)]
pub struct CapabilityIndex {
    comparator: InstanceComparator,
    by_pattern: BTreeMap<String, Vec<Arc<Instance>>>,
    by_id: HashMap<String, Arc<Instance>>,
}

impl CapabilityIndex {
    pub fn build(view: &dyn TopologyView) -> Self {
        let comparator = InstanceComparator::for_view(view);
        let mut by_pattern: BTreeMap<String, Vec<Arc<Instance>>> = BTreeMap::new();
        let mut by_id = HashMap::with_capacity(view.instances().len());

        for instance in view.instances() {
            let instance = Arc::new(instance.clone());
            // Instances without announcements are still needed for affinity lookups
            by_id.insert(instance.id.clone(), instance.clone());

            for token in instance.capability_tokens() {
                let candidates = by_pattern.entry(token.to_string()).or_default();
                if candidates.iter().any(|c| c.id == instance.id) {
                    continue;
                }
                let pos = candidates
                    .partition_point(|c| comparator.compare(c, &instance).is_lt());
                candidates.insert(pos, instance.clone());
            }
        }

        tracing::debug!(
            instances = by_id.len(),
            patterns = by_pattern.len(),
            local_cluster = comparator.local_cluster_id(),
            "Capability index built"
        );

        Self {
            comparator,
            by_pattern,
            by_id,
        }
    }

    pub fn comparator(&self) -> &InstanceComparator {
        &self.comparator
    }

    /// Instances announcing exactly `pattern`.
    pub fn candidates(&self, pattern: &str) -> &[Arc<Instance>] {
        self.by_pattern
            .get(pattern)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Look up any member of the view, announcing or not.
    pub fn instance(&self, id: &str) -> Option<&Arc<Instance>> {
        self.by_id.get(id)
    }

    /// All instances able to consume `topic`, deduplicated and in comparator order.
    pub fn potential_targets(&self, topic: &str) -> Vec<Arc<Instance>> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut targets: Vec<Arc<Instance>> = Vec::new();

        for key in lookup_keys(topic) {
            for candidate in self.candidates(&key) {
                if seen.insert(candidate.id.as_str()) {
                    targets.push(candidate.clone());
                }
            }
        }

        targets.sort_by(|a, b| self.comparator.compare(a, b));
        targets
    }

    /// Pattern -> instance ids, for inventory output.
    pub fn patterns(&self) -> BTreeMap<String, Vec<String>> {
        self.by_pattern
            .iter()
            .map(|(pattern, candidates)| {
                (
                    pattern.clone(),
                    candidates.iter().map(|c| c.id.clone()).collect(),
                )
            })
            .collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.by_pattern.len()
    }

    pub fn instance_count(&self) -> usize {
        self.by_id.len()
    }
}

/// Instance id -> capability announcement (`""` when absent).
///
/// Two views with equal summaries route every topic identically.
pub fn instances_summary(view: &dyn TopologyView) -> BTreeMap<String, String> {
    view.instances()
        .iter()
        .map(|i| (i.id.clone(), i.topics().unwrap_or_default().to_string()))
        .collect()
}
