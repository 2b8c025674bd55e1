pub mod errors;
pub mod inventory;
pub mod traits;

pub use errors::{ProviderError, ProviderErrorKind};
pub use inventory::{FailureSpec, Inventory, InventoryError, InventoryStore};
pub use traits::{ItemResult, Page, ResourceProvider};
