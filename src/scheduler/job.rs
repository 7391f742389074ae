use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Id of the instance a job was created on.
pub const PROPERTY_CREATED_INSTANCE: &str = "job.created.instance";
/// Id of the instance a job was routed to.
pub const PROPERTY_TARGET_INSTANCE: &str = "job.target.instance";
/// Name of the queue a job was put into.
pub const PROPERTY_QUEUE_NAME: &str = "job.queue.name";

/// Job metadata bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobProperties(BTreeMap<String, Value>);

impl JobProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_created_instance(self, instance_id: impl Into<String>) -> Self {
        let instance_id: String = instance_id.into();
        self.with(PROPERTY_CREATED_INSTANCE, instance_id)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        get_string(self, key)
    }

    pub fn created_instance(&self) -> Option<&str> {
        self.get_string(PROPERTY_CREATED_INSTANCE)
    }

    pub fn target_instance(&self) -> Option<&str> {
        self.get_string(PROPERTY_TARGET_INSTANCE)
    }

    pub fn queue_name(&self) -> Option<&str> {
        self.get_string(PROPERTY_QUEUE_NAME)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// String value stored under `key`; `None` when missing or not a string.
pub fn get_string<'a>(properties: &'a JobProperties, key: &str) -> Option<&'a str> {
    properties.get(key).and_then(Value::as_str)
}
