use std::cmp::Ordering;

use crate::topology::instance::Instance;
use crate::topology::view::TopologyView;

/// Total order over instances as seen from one cluster-group.
///
/// Instances of the local cluster-group sort first, the local leader ahead of
/// its peers. Everything else is ordered by id, so two resolvers with the same
/// local group always agree on the order of any candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceComparator {
    local_cluster_id: String,
}

impl InstanceComparator {
    pub fn new(local_cluster_id: impl Into<String>) -> Self {
        Self {
            local_cluster_id: local_cluster_id.into(),
        }
    }

    /// Comparator for the cluster-group of the view's local instance.
    pub fn for_view(view: &dyn TopologyView) -> Self {
        Self::new(view.local_instance().cluster_id.clone())
    }

    pub fn local_cluster_id(&self) -> &str {
        &self.local_cluster_id
    }

    pub fn compare(&self, a: &Instance, b: &Instance) -> Ordering {
        if a.id == b.id {
            return Ordering::Equal;
        }

        let a_local = a.cluster_id == self.local_cluster_id;
        let b_local = b.cluster_id == self.local_cluster_id;
        match (a_local, b_local) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (true, true) => match (a.leader, b.leader) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            },
            (false, false) => {}
        }

        a.id.cmp(&b.id)
    }
}
