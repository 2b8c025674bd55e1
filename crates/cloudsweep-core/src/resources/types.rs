use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cloudsweep_config::ResourceClass;

/// Immutable snapshot of one cloud resource taken at discovery time.
///
/// Decisions and outcomes are recorded next to the descriptor, never
/// written back into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub class: ResourceClass,
    /// Unique within its class.
    pub id: String,
    /// Creation or last-activity time, whichever the provider tracks.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Provider lifecycle state (`stopped`, `available`, ...).
    #[serde(default)]
    pub state: Option<String>,
    /// Owning resource for child entries (object versions, log streams).
    #[serde(default)]
    pub parent: Option<String>,
    /// Resource in another class this one hangs off (the instance a volume
    /// is attached to).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<String>,
    /// Owned by the provider itself (service-linked roles, managed policies).
    #[serde(default)]
    pub managed: bool,
}

impl ResourceDescriptor {
    pub fn new(class: ResourceClass, id: impl Into<String>) -> Self {
        Self {
            class,
            id: id.into(),
            timestamp: None,
            tags: BTreeMap::new(),
            state: None,
            parent: None,
            attached_to: None,
            managed: false,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn attached_to(mut self, owner: impl Into<String>) -> Self {
        self.attached_to = Some(owner.into());
        self
    }

    pub fn managed(mut self) -> Self {
        self.managed = true;
        self
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }
}
