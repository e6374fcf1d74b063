//! Loot registry keyed by table id.

use crate::{LootDrop, LootError, LootTable};
use rand::Rng;
use std::collections::HashMap;

/// Owns every loaded loot table.
///
/// Consumers keep table ids, not references, and resolve through the
/// registry each time, so replacing a table by id takes effect on the next
/// lookup.
#[derive(Debug, Clone, Default)]
pub struct LootRegistry {
    tables: HashMap<String, LootTable>,
}

impl LootRegistry {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Insert a table, replacing any table with the same id.
    ///
    /// Returns the replaced table. Tables validate themselves on
    /// construction, so registration cannot fail.
    pub fn register(&mut self, table: LootTable) -> Option<LootTable> {
        let id = table.id().to_string();
        let previous = self.tables.insert(id, table);
        if let Some(previous) = &previous {
            tracing::info!(table = previous.id(), "loot table reloaded");
        }
        previous
    }

    /// Parse a JSON array of tables and register them all.
    ///
    /// Nothing is registered if any table in the batch is invalid.
    pub fn load_json(&mut self, json: &str) -> Result<usize, LootError> {
        let tables: Vec<LootTable> = serde_json::from_str(json)?;
        let count = tables.len();
        for table in tables {
            self.register(table);
        }
        tracing::debug!(count, total = self.len(), "loot tables loaded");
        Ok(count)
    }

    pub fn get(&self, id: &str) -> Option<&LootTable> {
        self.tables.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tables.contains_key(id)
    }

    /// All registered tables, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &LootTable> {
        self.tables.values()
    }

    pub fn remove(&mut self, id: &str) -> Option<LootTable> {
        self.tables.remove(id)
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Roll the table with this id. An unknown id is a transient miss and
    /// yields no drops.
    pub fn roll<R: Rng + ?Sized>(&self, id: &str, rng: &mut R) -> Vec<LootDrop> {
        match self.tables.get(id) {
            Some(table) => table.roll(rng),
            None => {
                tracing::debug!(table = id, "loot table not found, no drops");
                Vec::new()
            }
        }
    }
}
