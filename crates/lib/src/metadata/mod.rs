//! Local metadata: component identity, the source-format registry, and the
//! project inventory scan.

mod inventory;
pub mod registry;
mod types;

pub use inventory::{Inventory, InventoryError, LocalFiles, scan_project};
pub use types::{ComponentId, MetadataComponent, ParseComponentIdError};
