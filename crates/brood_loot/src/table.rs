//! Weighted loot tables.

use crate::LootError;
use rand::Rng;
use serde::{Deserialize, Serialize};

fn one() -> u32 {
    1
}

/// One droppable item and its relative weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item_id: String,
    pub weight: f64,
    #[serde(default = "one")]
    pub quantity_min: u32,
    #[serde(default = "one")]
    pub quantity_max: u32,
}

impl LootEntry {
    pub fn new(item_id: impl Into<String>, weight: f64) -> Self {
        Self {
            item_id: item_id.into(),
            weight,
            quantity_min: 1,
            quantity_max: 1,
        }
    }

    pub fn with_quantity(mut self, min: u32, max: u32) -> Self {
        self.quantity_min = min;
        self.quantity_max = max;
        self
    }
}

/// A resolved drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootDrop {
    pub item_id: String,
    pub quantity: u32,
}

/// Serialized form of a [`LootTable`]. Deserialization goes through
/// `LootTable::try_from`, so content with bad weights never loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootTableDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entries: Vec<LootEntry>,
    #[serde(default = "one")]
    pub roll_count: u32,
}

/// Named, weighted collection of drops.
///
/// Always valid once constructed: weights are positive and finite and every
/// quantity range is non-empty. An empty table is legal and drops nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LootTableDef", into = "LootTableDef")]
pub struct LootTable {
    id: String,
    name: String,
    entries: Vec<LootEntry>,
    roll_count: u32,
    /// Running sum of weights, one per entry.
    cumulative: Vec<f64>,
}

impl LootTable {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        entries: Vec<LootEntry>,
    ) -> Result<Self, LootError> {
        let id = id.into();
        if id.is_empty() {
            return Err(LootError::EmptyId);
        }

        let mut cumulative = Vec::with_capacity(entries.len());
        let mut total = 0.0;
        for entry in &entries {
            if !(entry.weight.is_finite() && entry.weight > 0.0) {
                return Err(LootError::NonPositiveWeight {
                    table: id,
                    item_id: entry.item_id.clone(),
                    weight: entry.weight,
                });
            }
            if entry.quantity_min > entry.quantity_max {
                return Err(LootError::InvalidQuantity {
                    table: id,
                    item_id: entry.item_id.clone(),
                    min: entry.quantity_min,
                    max: entry.quantity_max,
                });
            }
            total += entry.weight;
            cumulative.push(total);
        }
        if !total.is_finite() {
            return Err(LootError::TotalWeightOverflow { table: id });
        }

        Ok(Self {
            id,
            name: name.into(),
            entries,
            roll_count: 1,
            cumulative,
        })
    }

    /// Number of independent picks per roll.
    pub fn with_roll_count(mut self, roll_count: u32) -> Result<Self, LootError> {
        if roll_count == 0 {
            return Err(LootError::ZeroRollCount { table: self.id });
        }
        self.roll_count = roll_count;
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[LootEntry] {
        &self.entries
    }

    pub fn roll_count(&self) -> u32 {
        self.roll_count
    }

    pub fn total_weight(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the drops for one kill/harvest.
    ///
    /// Each of the `roll_count` picks selects one entry with probability
    /// proportional to its weight, then a quantity uniformly from its range.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<LootDrop> {
        if self.entries.is_empty() {
            return Vec::new();
        }

        (0..self.roll_count)
            .map(|_| {
                let entry = self.pick(rng);
                LootDrop {
                    item_id: entry.item_id.clone(),
                    quantity: rng.random_range(entry.quantity_min..=entry.quantity_max),
                }
            })
            .collect()
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &LootEntry {
        let target = rng.random::<f64>() * self.total_weight();
        let index = self.cumulative.partition_point(|&sum| sum <= target);
        &self.entries[index.min(self.entries.len() - 1)]
    }
}

impl TryFrom<LootTableDef> for LootTable {
    type Error = LootError;

    fn try_from(def: LootTableDef) -> Result<Self, Self::Error> {
        LootTable::new(def.id, def.name, def.entries)?.with_roll_count(def.roll_count)
    }
}

impl From<LootTable> for LootTableDef {
    fn from(table: LootTable) -> Self {
        Self {
            id: table.id,
            name: table.name,
            entries: table.entries,
            roll_count: table.roll_count,
        }
    }
}
