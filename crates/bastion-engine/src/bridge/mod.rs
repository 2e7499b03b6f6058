//! Key-value facade between game state and the renderer.
//!
//! The renderer only reads values (with a fallback) and may subscribe to
//! changes; where the values come from is the host's business.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Subscriber = Box<dyn FnMut(&Value)>;

pub trait DataBridge {
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Registers `callback` for changes to `key`.
    fn subscribe(&mut self, key: &str, callback: Subscriber) -> SubscriptionId;

    /// Returns `false` if `id` was not subscribed.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// Reads `key` as `T`, falling back when it is missing or has the wrong shape.
pub fn value_or<T: DeserializeOwned>(bridge: &dyn DataBridge, key: &str, fallback: T) -> T {
    let Some(value) = bridge.get_value(key) else {
        return fallback;
    };
    match serde_json::from_value(value) {
        Ok(v) => v,
        Err(err) => {
            log::debug!("bridge value `{key}` ignored: {err}");
            fallback
        }
    }
}

/// In-process [`DataBridge`] backed by a map.
#[derive(Default)]
pub struct LocalDataBridge {
    values: HashMap<String, Value>,
    subscribers: Vec<(SubscriptionId, String, Subscriber)>,
    next_id: u64,
}

impl std::fmt::Debug for LocalDataBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDataBridge")
            .field("values", &self.values)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl LocalDataBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` and notifies subscribers of `key` if it changed.
    pub fn set_value(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.values.get(key) == Some(&value) {
            return;
        }
        for (_, k, cb) in &mut self.subscribers {
            if k == key {
                cb(&value);
            }
        }
        self.values.insert(key.to_owned(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}

impl DataBridge for LocalDataBridge {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn subscribe(&mut self, key: &str, callback: Subscriber) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, key.to_owned(), callback));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, ..)| *sid != id);
        self.subscribers.len() != before
    }
}
