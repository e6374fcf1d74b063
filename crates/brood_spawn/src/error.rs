use thiserror::Error;

/// Spawner content that cannot be accepted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpawnConfigError {
    #[error("spawn area radius must be positive and finite, got {radius}")]
    InvalidRadius { radius: f32 },

    #[error("spawn area half extents must be positive and finite, got ({x}, {z})")]
    InvalidExtents { x: f32, z: f32 },

    #[error("spawn area max height must be zero or positive, got {max_height}")]
    InvalidHeight { max_height: f32 },

    #[error("minimum spacing must be zero or positive, got {min_spacing}")]
    InvalidSpacing { min_spacing: f32 },

    #[error("activation range must be zero or positive, got {range}")]
    InvalidActivationRange { range: f32 },

    #[error("time window hour {hour} is outside 0..=24")]
    HourOutOfRange { hour: f32 },

    #[error("player count bounds are inverted: min {min} > max {max}")]
    PlayerBoundsInverted { min: usize, max: usize },

    #[error("player level bounds are inverted: min {min} > max {max}")]
    LevelBoundsInverted { min: u32, max: u32 },

    #[error("respawn interval must be zero or positive, got {seconds}s")]
    InvalidRespawnInterval { seconds: f32 },

    #[error("spawner '{name}' must allow at least one active entity")]
    ZeroMaxActive { name: String },
}
