//! Provider backed by a JSON inventory snapshot of an account.
//!
//! Lets operators rehearse a cleanup (including injected failures) without
//! touching a live account, and doubles as the provider used in tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cloudsweep_config::{PROVIDER_BATCH_CAP, ResourceClass};

use super::errors::{ProviderError, ProviderErrorKind};
use super::traits::{ItemResult, Page, ResourceProvider};
use crate::errors::SweepError;
use crate::resources::ResourceDescriptor;

const DEFAULT_PAGE_SIZE: usize = 100;

/// Injected deletion failure for one resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSpec {
    pub kind: ProviderErrorKind,
    /// Fail this many times, then succeed. `None` fails forever.
    #[serde(default)]
    pub times: Option<u32>,
}

/// On-disk inventory format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub page_size: Option<usize>,
    pub resources: Vec<ResourceDescriptor>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fail_delete: BTreeMap<String, FailureSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fail_listing: Vec<ResourceClass>,
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Failed to read inventory '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse inventory '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Failed to write inventory '{path}': {message}")]
    WriteFailed { path: PathBuf, message: String },
}

impl SweepError for InventoryError {
    fn error_code(&self) -> &'static str {
        match self {
            InventoryError::ReadFailed { .. } => "INVENTORY_READ_FAILED",
            InventoryError::ParseFailed { .. } => "INVENTORY_PARSE_FAILED",
            InventoryError::WriteFailed { .. } => "INVENTORY_WRITE_FAILED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, InventoryError::ParseFailed { .. })
    }
}

impl Inventory {
    pub fn load(path: &Path) -> Result<Inventory, InventoryError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| InventoryError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|e| InventoryError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), InventoryError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| InventoryError::WriteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| InventoryError::WriteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Shared, mutable view of an inventory. One store serves every class.
#[derive(Debug, Default)]
pub struct InventoryStore {
    inventory: Mutex<Inventory>,
    failures_served: Mutex<HashMap<String, u32>>,
    list_calls: AtomicUsize,
    bulk_calls: AtomicUsize,
    single_calls: AtomicUsize,
}

impl InventoryStore {
    pub fn new(inventory: Inventory) -> Arc<Self> {
        Arc::new(Self {
            inventory: Mutex::new(inventory),
            ..Default::default()
        })
    }

    pub fn from_resources(resources: Vec<ResourceDescriptor>) -> Arc<Self> {
        Self::new(Inventory {
            resources,
            ..Default::default()
        })
    }

    /// Provider handle for one class.
    pub fn provider(self: &Arc<Self>, class: ResourceClass) -> Arc<dyn ResourceProvider> {
        Arc::new(InventoryProvider {
            store: Arc::clone(self),
            class,
        })
    }

    /// Current inventory contents, including injected failures.
    pub fn snapshot(&self) -> Inventory {
        self.lock_inventory().clone()
    }

    pub fn contains(&self, class: ResourceClass, id: &str) -> bool {
        self.lock_inventory()
            .resources
            .iter()
            .any(|r| r.class == class && r.id == id)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    fn lock_inventory(&self) -> MutexGuard<'_, Inventory> {
        self.inventory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, class: ResourceClass, id: &str) -> Result<(), ProviderError> {
        if let Some(spec) = self.injected_failure(id) {
            return Err(ProviderError::new(
                spec.kind,
                format!("injected {} failure for '{}'", spec.kind, id),
            ));
        }

        let mut inventory = self.lock_inventory();
        let has_children = inventory
            .resources
            .iter()
            .any(|r| r.class == class && r.parent.as_deref() == Some(id));
        if has_children {
            if !class.parent_delete_removes_children() {
                return Err(ProviderError::new(
                    ProviderErrorKind::Other,
                    format!("'{}' still has child entries", id),
                ));
            }
            inventory
                .resources
                .retain(|r| !(r.class == class && r.parent.as_deref() == Some(id)));
        }

        let position = inventory
            .resources
            .iter()
            .position(|r| r.class == class && r.id == id)
            .ok_or_else(|| ProviderError::not_found(format!("{} '{}' not found", class, id)))?;
        inventory.resources.remove(position);
        Ok(())
    }

    fn injected_failure(&self, id: &str) -> Option<FailureSpec> {
        let spec = *self.lock_inventory().fail_delete.get(id)?;
        let mut served = self
            .failures_served
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = served.entry(id.to_string()).or_insert(0);
        match spec.times {
            Some(limit) if *count >= limit => None,
            _ => {
                *count += 1;
                Some(spec)
            }
        }
    }
}

struct InventoryProvider {
    store: Arc<InventoryStore>,
    class: ResourceClass,
}

#[async_trait]
impl ResourceProvider for InventoryProvider {
    fn class(&self) -> ResourceClass {
        self.class
    }

    fn bulk_limit(&self) -> Option<usize> {
        // Object stores are the only class with a bulk delete API.
        match self.class {
            ResourceClass::S3Bucket => Some(PROVIDER_BATCH_CAP),
            _ => None,
        }
    }

    fn supports_children(&self) -> bool {
        self.class.child_noun().is_some()
    }

    async fn list_page(&self, cursor: Option<String>) -> Result<Page, ProviderError> {
        self.store.list_calls.fetch_add(1, Ordering::SeqCst);
        let inventory = self.store.lock_inventory();
        if inventory.fail_listing.contains(&self.class) {
            return Err(ProviderError::new(
                ProviderErrorKind::PermissionDenied,
                format!("listing {} is not permitted", self.class),
            ));
        }

        let offset = match cursor {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ProviderError::new(ProviderErrorKind::Other, format!("bad cursor '{}'", raw))
            })?,
            None => 0,
        };
        let page_size = inventory.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

        let top_level: Vec<&ResourceDescriptor> = inventory
            .resources
            .iter()
            .filter(|r| r.class == self.class && r.parent.is_none())
            .collect();
        let items: Vec<ResourceDescriptor> = top_level
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|r| (*r).clone())
            .collect();
        let consumed = offset + items.len();
        let next = (consumed < top_level.len()).then(|| consumed.to_string());

        debug!(
            event = "core.inventory.page_listed",
            class = %self.class,
            offset = offset,
            count = items.len()
        );
        Ok(Page { items, next })
    }

    async fn delete_one(&self, resource: &ResourceDescriptor) -> Result<(), ProviderError> {
        self.store.single_calls.fetch_add(1, Ordering::SeqCst);
        self.store.remove(self.class, &resource.id)
    }

    async fn delete_bulk(
        &self,
        resources: &[ResourceDescriptor],
    ) -> Result<Vec<ItemResult>, ProviderError> {
        self.store.bulk_calls.fetch_add(1, Ordering::SeqCst);
        if resources.len() > PROVIDER_BATCH_CAP {
            return Err(ProviderError::new(
                ProviderErrorKind::Other,
                format!(
                    "bulk delete accepts at most {} items (got {})",
                    PROVIDER_BATCH_CAP,
                    resources.len()
                ),
            ));
        }
        let results = resources
            .iter()
            .map(|resource| ItemResult {
                id: resource.id.clone(),
                result: self.store.remove(self.class, &resource.id),
            })
            .collect();
        info!(
            event = "core.inventory.bulk_deleted",
            class = %self.class,
            count = resources.len()
        );
        Ok(results)
    }

    async fn list_children(
        &self,
        parent: &ResourceDescriptor,
    ) -> Result<Vec<ResourceDescriptor>, ProviderError> {
        self.store.list_calls.fetch_add(1, Ordering::SeqCst);
        let inventory = self.store.lock_inventory();
        Ok(inventory
            .resources
            .iter()
            .filter(|r| r.class == self.class && r.parent.as_deref() == Some(parent.id.as_str()))
            .cloned()
            .collect())
    }
}
