use thiserror::Error;

/// Loot content that cannot be accepted.
#[derive(Debug, Error)]
pub enum LootError {
    #[error("loot table id must not be empty")]
    EmptyId,

    #[error("loot table '{table}': entry '{item_id}' has weight {weight}, weights must be positive")]
    NonPositiveWeight {
        table: String,
        item_id: String,
        weight: f64,
    },

    #[error("loot table '{table}': entry '{item_id}' has quantity range {min}..={max}")]
    InvalidQuantity {
        table: String,
        item_id: String,
        min: u32,
        max: u32,
    },

    #[error("loot table '{table}': total weight overflows")]
    TotalWeightOverflow { table: String },

    #[error("loot table '{table}': roll count must be at least 1")]
    ZeroRollCount { table: String },

    #[error("malformed loot content: {0}")]
    Json(#[from] serde_json::Error),
}
