//! Capability set a resource class exposes to the engine.

use async_trait::async_trait;

use cloudsweep_config::ResourceClass;

use super::errors::ProviderError;
use crate::resources::ResourceDescriptor;

/// One page of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<ResourceDescriptor>,
    /// Cursor for the next page, `None` on the last page.
    pub next: Option<String>,
}

/// Per-item result of a bulk delete call.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub id: String,
    pub result: Result<(), ProviderError>,
}

/// Discovery and deletion capabilities for one resource class.
///
/// Implementations talk to the cloud provider; the engine never does.
/// Every call is a suspension point and may fail transiently.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// The class this provider discovers and deletes.
    fn class(&self) -> ResourceClass;

    /// Maximum items per bulk-delete call, or `None` when the class can
    /// only be deleted one item at a time.
    fn bulk_limit(&self) -> Option<usize> {
        None
    }

    /// Whether [`list_children`](Self::list_children) returns anything useful.
    fn supports_children(&self) -> bool {
        false
    }

    /// Fetch one page of top-level resources.
    async fn list_page(&self, cursor: Option<String>) -> Result<Page, ProviderError>;

    /// Delete a single resource or child entry.
    async fn delete_one(&self, resource: &ResourceDescriptor) -> Result<(), ProviderError>;

    /// Delete up to [`bulk_limit`](Self::bulk_limit) resources in one call.
    ///
    /// An `Err` means the whole call failed and no item was touched.
    async fn delete_bulk(
        &self,
        resources: &[ResourceDescriptor],
    ) -> Result<Vec<ItemResult>, ProviderError> {
        let mut results = Vec::with_capacity(resources.len());
        for resource in resources {
            results.push(ItemResult {
                id: resource.id.clone(),
                result: self.delete_one(resource).await,
            });
        }
        Ok(results)
    }

    /// Child entries owned by `parent` (object versions, log streams, ...).
    async fn list_children(
        &self,
        _parent: &ResourceDescriptor,
    ) -> Result<Vec<ResourceDescriptor>, ProviderError> {
        Ok(Vec::new())
    }
}
