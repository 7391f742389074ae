use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::config::QueueConfig;
use crate::scheduler::pattern::TopicPattern;

/// Name of the queue used for topics no configuration claims.
pub const MAIN_QUEUE_NAME: &str = "<main queue>";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueType {
    /// Jobs may run anywhere, in any order.
    #[default]
    Unordered,
    /// Jobs of the queue run one after another on a single instance.
    Ordered,
    /// Like `Unordered`, with one queue per topic.
    TopicRoundRobin,
    /// Jobs are persisted but never assigned.
    Ignore,
    /// Jobs are discarded.
    Drop,
}

impl std::fmt::Display for QueueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueType::Unordered => write!(f, "unordered"),
            QueueType::Ordered => write!(f, "ordered"),
            QueueType::TopicRoundRobin => write!(f, "topic_round_robin"),
            QueueType::Ignore => write!(f, "ignore"),
            QueueType::Drop => write!(f, "drop"),
        }
    }
}

/// Per-queue settings consulted when picking a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueuePolicy {
    pub queue_type: QueueType,
    pub prefer_run_on_creation_instance: bool,
}

impl QueuePolicy {
    pub fn new(queue_type: QueueType) -> Self {
        Self {
            queue_type,
            prefer_run_on_creation_instance: false,
        }
    }

    pub fn ordered() -> Self {
        Self::new(QueueType::Ordered)
    }

    pub fn unordered() -> Self {
        Self::new(QueueType::Unordered)
    }

    pub fn preferring_creation_instance(mut self) -> Self {
        self.prefer_run_on_creation_instance = true;
        self
    }

    pub fn is_ordered(&self) -> bool {
        self.queue_type == QueueType::Ordered
    }
}

/// The queue a topic belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    pub queue_name: String,
    pub policy: QueuePolicy,
}

impl QueueInfo {
    fn main() -> Self {
        Self {
            queue_name: MAIN_QUEUE_NAME.to_string(),
            policy: QueuePolicy::default(),
        }
    }
}

/// Topic -> queue lookup over the configured queues.
///
/// Configurations are tried by descending ranking; equal rankings keep their
/// configured order. Topics nothing claims go to the main queue.
#[derive(Debug, Default)]
pub struct QueueRegistry {
    queues: Vec<(QueueConfig, Vec<TopicPattern>)>,
}

impl QueueRegistry {
    pub fn new(mut configs: Vec<QueueConfig>) -> Self {
        configs.sort_by_key(|c| Reverse(c.ranking));
        let queues = configs
            .into_iter()
            .map(|config| {
                let patterns = config
                    .topics
                    .iter()
                    .map(|t| TopicPattern::parse(t.trim()))
                    .collect();
                (config, patterns)
            })
            .collect();
        Self { queues }
    }

    pub fn queue_for(&self, topic: &str) -> QueueInfo {
        self.queues
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.matches(topic)))
            .map(|(config, _)| QueueInfo {
                queue_name: config.name.clone(),
                policy: config.policy(),
            })
            .unwrap_or_else(QueueInfo::main)
    }

    /// Queue names in lookup order.
    pub fn names(&self) -> Vec<&str> {
        self.queues.iter().map(|(c, _)| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
