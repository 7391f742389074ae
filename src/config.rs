use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scheduler::queue::{QueuePolicy, QueueType};
use crate::topology::view::ViewDescription;

/// Job manager settings that influence routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobManagerConfig {
    /// When false, no snapshot built under this configuration is active.
    pub enabled: bool,
    /// Restrict same-group routing to cluster-group leaders.
    pub disable_distribution: bool,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disable_distribution: false,
        }
    }
}

/// Configuration of one job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    /// Topic patterns claimed by this queue (`a/b`, `a/*`, `a/**`).
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, rename = "type")]
    pub queue_type: QueueType,
    #[serde(default)]
    pub prefer_run_on_creation_instance: bool,
    /// Higher ranking queues are matched first.
    #[serde(default)]
    pub ranking: i32,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topics: Vec::new(),
            queue_type: QueueType::default(),
            prefer_run_on_creation_instance: false,
            ranking: 0,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(topic.into());
        self
    }

    pub fn with_type(mut self, queue_type: QueueType) -> Self {
        self.queue_type = queue_type;
        self
    }

    pub fn ordered(self) -> Self {
        self.with_type(QueueType::Ordered)
    }

    pub fn prefer_creation_instance(mut self) -> Self {
        self.prefer_run_on_creation_instance = true;
        self
    }

    pub fn with_ranking(mut self, ranking: i32) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn policy(&self) -> QueuePolicy {
        QueuePolicy {
            queue_type: self.queue_type,
            prefer_run_on_creation_instance: self.prefer_run_on_creation_instance,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub job_manager: JobManagerConfig,
    pub queues: Vec<QueueConfig>,
}

impl RouterConfig {
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queues.push(queue);
        self
    }
}

/// Topology view plus router configuration, as read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyFile {
    #[serde(flatten)]
    pub view: ViewDescription,
    #[serde(flatten)]
    pub config: RouterConfig,
}

impl TopologyFile {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_json(&bytes)
    }
}

/// Live job manager state consulted by resolver snapshots.
pub trait JobManagerConfiguration: Send + Sync + std::fmt::Debug {
    fn is_active(&self) -> bool;
    fn disable_distribution(&self) -> bool;
}

/// Runtime counterpart of [`JobManagerConfig`]; flags can change at any time.
#[derive(Debug)]
pub struct JobManagerState {
    active: AtomicBool,
    disable_distribution: AtomicBool,
}

impl JobManagerState {
    pub fn new(config: &JobManagerConfig) -> Self {
        Self {
            active: AtomicBool::new(config.enabled),
            disable_distribution: AtomicBool::new(config.disable_distribution),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn set_disable_distribution(&self, disable: bool) {
        self.disable_distribution.store(disable, Ordering::Release);
    }
}

impl Default for JobManagerState {
    fn default() -> Self {
        Self::new(&JobManagerConfig::default())
    }
}

impl JobManagerConfiguration for JobManagerState {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn disable_distribution(&self) -> bool {
        self.disable_distribution.load(Ordering::Acquire)
    }
}
