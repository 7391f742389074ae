use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Property under which an instance announces the job topics it consumes.
pub const PROPERTY_TOPICS: &str = "job.consumer.topics";

/// A single cluster member as seen in a topology view.
///
/// Cluster-group membership is carried as a plain id; instances never hold a
/// reference back to the view they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub cluster_id: String,
    #[serde(default)]
    pub leader: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Instance {
    pub fn new(id: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cluster_id: cluster_id.into(),
            leader: false,
            properties: BTreeMap::new(),
        }
    }

    /// Mark this instance as the leader of its cluster-group.
    pub fn as_leader(mut self) -> Self {
        self.leader = true;
        self
    }

    /// Set the capability announcement (comma-separated topic patterns).
    pub fn with_topics(self, topics: impl Into<String>) -> Self {
        self.with_property(PROPERTY_TOPICS, topics)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The raw capability announcement, if any.
    pub fn topics(&self) -> Option<&str> {
        self.property(PROPERTY_TOPICS)
    }

    /// Announced topic patterns. Blank tokens (stray commas) are skipped.
    pub fn capability_tokens(&self) -> impl Iterator<Item = &str> {
        self.topics()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}
