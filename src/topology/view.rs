use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::topology::instance::Instance;

/// Read-only membership snapshot supplied by the discovery layer.
pub trait TopologyView: Send + Sync + std::fmt::Debug {
    /// All known members, local instance included.
    fn instances(&self) -> &[Instance];

    /// The instance this process runs as.
    fn local_instance(&self) -> &Instance;

    /// False once the discovery layer has moved on to a newer view.
    fn is_current(&self) -> bool;

    /// When the view was taken.
    fn created_at(&self) -> DateTime<Utc>;
}

/// Serializable form of a [`ClusterView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDescription {
    /// Id of the local instance.
    pub local: String,
    pub instances: Vec<Instance>,
}

impl ViewDescription {
    pub fn instance_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.instances.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

/// In-memory topology view with a validated member list.
#[derive(Debug)]
pub struct ClusterView {
    instances: Vec<Instance>,
    local_index: usize,
    created_at: DateTime<Utc>,
    current: AtomicBool,
}

impl ClusterView {
    /// Build a view, rejecting duplicate ids and a local id that is not a member.
    pub fn new(local_id: &str, instances: Vec<Instance>) -> Result<Self> {
        if instances.is_empty() {
            return Err(RouterError::EmptyView);
        }

        let mut seen = HashSet::with_capacity(instances.len());
        for instance in &instances {
            if !seen.insert(instance.id.as_str()) {
                return Err(RouterError::DuplicateInstance(instance.id.clone()));
            }
        }

        let local_index = instances
            .iter()
            .position(|i| i.id == local_id)
            .ok_or_else(|| RouterError::UnknownLocalInstance(local_id.to_string()))?;

        Ok(Self {
            instances,
            local_index,
            created_at: Utc::now(),
            current: AtomicBool::new(true),
        })
    }

    pub fn from_description(description: ViewDescription) -> Result<Self> {
        Self::new(&description.local, description.instances)
    }

    pub fn description(&self) -> ViewDescription {
        ViewDescription {
            local: self.local_instance().id.clone(),
            instances: self.instances.clone(),
        }
    }

    pub fn instance(&self, id: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id == id)
    }

    /// Mark this view as superseded. Irreversible.
    pub fn invalidate(&self) {
        self.current.store(false, Ordering::Release);
    }
}

impl TopologyView for ClusterView {
    fn instances(&self) -> &[Instance] {
        &self.instances
    }

    fn local_instance(&self) -> &Instance {
        &self.instances[self.local_index]
    }

    fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
