//! Brood Loot
//!
//! Weighted loot tables and the registry that resolves them by id

mod error;
mod registry;
mod table;

pub use error::LootError;
pub use registry::LootRegistry;
pub use table::{LootDrop, LootEntry, LootTable, LootTableDef};
