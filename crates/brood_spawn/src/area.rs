//! Spawn areas: where a spawner may place entities.

use crate::SpawnConfigError;
use brood_core::math::{Position, Vec2};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;

/// Relative slack on boundary tests, so sampled points that land on the
/// edge after float rounding still count as inside.
const EDGE_TOLERANCE: f32 = 1.0e-5;

/// How close spawned entities may be to anything already indexed.
///
/// `min_spacing` only takes effect when `avoid_overlap` is set; the spawner
/// enforces it through the spatial index. Always valid once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SpacingRuleDef", into = "SpacingRuleDef")]
pub struct SpacingRule {
    min_spacing: f32,
    avoid_overlap: bool,
}

/// Serialized form of a [`SpacingRule`]; loading goes through
/// `SpacingRule::new`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpacingRuleDef {
    #[serde(default)]
    pub min_spacing: f32,
    #[serde(default)]
    pub avoid_overlap: bool,
}

impl SpacingRule {
    pub fn new(min_spacing: f32, avoid_overlap: bool) -> Result<Self, SpawnConfigError> {
        if !(min_spacing.is_finite() && min_spacing >= 0.0) {
            return Err(SpawnConfigError::InvalidSpacing { min_spacing });
        }
        Ok(Self {
            min_spacing,
            avoid_overlap,
        })
    }

    pub fn min_spacing(&self) -> f32 {
        self.min_spacing
    }

    pub fn avoid_overlap(&self) -> bool {
        self.avoid_overlap
    }
}

impl TryFrom<SpacingRuleDef> for SpacingRule {
    type Error = SpawnConfigError;

    fn try_from(def: SpacingRuleDef) -> Result<Self, Self::Error> {
        SpacingRule::new(def.min_spacing, def.avoid_overlap)
    }
}

impl From<SpacingRule> for SpacingRuleDef {
    fn from(rule: SpacingRule) -> Self {
        Self {
            min_spacing: rule.min_spacing,
            avoid_overlap: rule.avoid_overlap,
        }
    }
}

/// A region that can produce interior points.
///
/// Invariant: every point returned by `random_position` satisfies `contains`.
pub trait SpawnArea: fmt::Debug + Send + Sync {
    fn random_position(&self, rng: &mut dyn RngCore) -> Position;

    fn contains(&self, position: Position) -> bool;

    /// Reference point of the area; spawners without an explicit position
    /// measure activation range from here.
    fn center(&self) -> Position;

    fn spacing(&self) -> SpacingRule {
        SpacingRule::default()
    }
}

fn check_height(max_height: f32) -> Result<f32, SpawnConfigError> {
    if max_height.is_finite() && max_height >= 0.0 {
        Ok(max_height)
    } else {
        Err(SpawnConfigError::InvalidHeight { max_height })
    }
}

/// Disc (with optional vertical jitter) around a center point.
#[derive(Debug, Clone, PartialEq)]
pub struct CircularArea {
    center: Position,
    radius: f32,
    spacing: SpacingRule,
    max_height: f32,
}

impl CircularArea {
    pub fn new(center: Position, radius: f32) -> Result<Self, SpawnConfigError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(SpawnConfigError::InvalidRadius { radius });
        }
        Ok(Self {
            center,
            radius,
            spacing: SpacingRule::default(),
            max_height: 0.0,
        })
    }

    pub fn with_spacing(mut self, spacing: SpacingRule) -> Self {
        self.spacing = spacing;
        self
    }

    /// Half-range of the vertical offset; 0 keeps every point at the
    /// center's height.
    pub fn with_max_height(mut self, max_height: f32) -> Result<Self, SpawnConfigError> {
        self.max_height = check_height(max_height)?;
        Ok(self)
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }
}

impl SpawnArea for CircularArea {
    /// Uniform over the disc area: the radial distance is `sqrt(U) * r`,
    /// since `U * r` bunches points toward the middle.
    ///
    /// With vertical jitter the disc at height `dy` shrinks to
    /// `sqrt(r² - dy²)`, which keeps the point inside the 3D containment test.
    fn random_position(&self, rng: &mut dyn RngCore) -> Position {
        let height = self.max_height.min(self.radius);
        let dy = if height > 0.0 {
            rng.random_range(-height..=height)
        } else {
            0.0
        };
        let disc_radius = (self.radius * self.radius - dy * dy).max(0.0).sqrt();

        let angle = rng.random_range(0.0..TAU);
        let distance = rng.random::<f32>().sqrt() * disc_radius;
        self.center + Position::new(distance * angle.cos(), dy, distance * angle.sin())
    }

    fn contains(&self, position: Position) -> bool {
        position.distance_squared(self.center)
            <= self.radius * self.radius * (1.0 + EDGE_TOLERANCE)
    }

    fn center(&self) -> Position {
        self.center
    }

    fn spacing(&self) -> SpacingRule {
        self.spacing
    }
}

/// Axis-aligned rectangle on the ground plane.
#[derive(Debug, Clone, PartialEq)]
pub struct RectangularArea {
    center: Position,
    half_extents: Vec2,
    spacing: SpacingRule,
    max_height: f32,
}

impl RectangularArea {
    /// `half_extents.x` spans world X, `half_extents.y` spans world Z.
    pub fn new(center: Position, half_extents: Vec2) -> Result<Self, SpawnConfigError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !(valid(half_extents.x) && valid(half_extents.y)) {
            return Err(SpawnConfigError::InvalidExtents {
                x: half_extents.x,
                z: half_extents.y,
            });
        }
        Ok(Self {
            center,
            half_extents,
            spacing: SpacingRule::default(),
            max_height: 0.0,
        })
    }

    pub fn with_spacing(mut self, spacing: SpacingRule) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_max_height(mut self, max_height: f32) -> Result<Self, SpawnConfigError> {
        self.max_height = check_height(max_height)?;
        Ok(self)
    }
}

impl SpawnArea for RectangularArea {
    fn random_position(&self, rng: &mut dyn RngCore) -> Position {
        let dx = rng.random_range(-self.half_extents.x..=self.half_extents.x);
        let dz = rng.random_range(-self.half_extents.y..=self.half_extents.y);
        let dy = if self.max_height > 0.0 {
            rng.random_range(-self.max_height..=self.max_height)
        } else {
            0.0
        };
        self.center + Position::new(dx, dy, dz)
    }

    fn contains(&self, position: Position) -> bool {
        let offset = position - self.center;
        let slack = 1.0 + EDGE_TOLERANCE;
        offset.x.abs() <= self.half_extents.x * slack
            && offset.z.abs() <= self.half_extents.y * slack
            && offset.y.abs() <= self.max_height * slack
    }

    fn center(&self) -> Position {
        self.center
    }

    fn spacing(&self) -> SpacingRule {
        self.spacing
    }
}

/// Serialized form of a spawn area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AreaConfig {
    Circle {
        center: Position,
        radius: f32,
        #[serde(default)]
        max_height: f32,
        #[serde(flatten)]
        spacing: SpacingRule,
    },
    Rectangle {
        center: Position,
        half_extents: Vec2,
        #[serde(default)]
        max_height: f32,
        #[serde(flatten)]
        spacing: SpacingRule,
    },
}

impl AreaConfig {
    pub fn build(&self) -> Result<Box<dyn SpawnArea>, SpawnConfigError> {
        let area: Box<dyn SpawnArea> = match *self {
            AreaConfig::Circle {
                center,
                radius,
                max_height,
                spacing,
            } => Box::new(
                CircularArea::new(center, radius)?
                    .with_max_height(max_height)?
                    .with_spacing(spacing),
            ),
            AreaConfig::Rectangle {
                center,
                half_extents,
                max_height,
                spacing,
            } => Box::new(
                RectangularArea::new(center, half_extents)?
                    .with_max_height(max_height)?
                    .with_spacing(spacing),
            ),
        };
        Ok(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brood_core::math::deterministic_rng;

    const SAMPLES: usize = 10_000;

    #[test]
    fn circle_samples_stay_inside() {
        let mut rng = deterministic_rng(11);
        let area = CircularArea::new(Position::new(50.0, 3.0, -20.0), 12.5).unwrap();
        for _ in 0..SAMPLES {
            let p = area.random_position(&mut rng);
            assert!(area.contains(p), "{p:?} escaped the circle");
            assert_eq!(p.y, 3.0);
        }
    }

    #[test]
    fn circle_density_is_areal() {
        let mut rng = deterministic_rng(12);
        let radius = 10.0;
        let area = CircularArea::new(Position::ZERO, radius).unwrap();
        // The inner disc holding 10% of the area has radius r * sqrt(0.1).
        let inner = radius * 0.1f32.sqrt();
        let inside = (0..SAMPLES)
            .map(|_| area.random_position(&mut rng))
            .filter(|p| p.length() <= inner)
            .count();
        let fraction = inside as f64 / SAMPLES as f64;
        // sigma is 0.003 at this sample size; linear sampling would give ~0.32
        assert!((fraction - 0.1).abs() < 0.015, "inner fraction was {fraction}");
    }

    #[test]
    fn circle_height_jitter_stays_inside() {
        let mut rng = deterministic_rng(13);
        let area = CircularArea::new(Position::ZERO, 5.0)
            .unwrap()
            .with_max_height(2.0)
            .unwrap();
        let mut saw_offset = false;
        for _ in 0..SAMPLES {
            let p = area.random_position(&mut rng);
            assert!(area.contains(p));
            assert!(p.y.abs() <= 2.0);
            saw_offset |= p.y != 0.0;
        }
        assert!(saw_offset);
    }

    #[test]
    fn circle_contains_uses_3d_distance() {
        let area = CircularArea::new(Position::ZERO, 5.0).unwrap();
        assert!(area.contains(Position::new(3.0, 0.0, 4.0)));
        assert!(!area.contains(Position::new(3.0, 1.0, 4.0)));
        assert!(!area.contains(Position::new(0.0, 6.0, 0.0)));
    }

    #[test]
    fn rectangle_samples_stay_inside() {
        let mut rng = deterministic_rng(14);
        let area = RectangularArea::new(Position::new(0.0, 1.0, 0.0), Vec2::new(4.0, 2.0))
            .unwrap()
            .with_max_height(0.5)
            .unwrap();
        for _ in 0..SAMPLES {
            let p = area.random_position(&mut rng);
            assert!(area.contains(p));
        }
        assert!(!area.contains(Position::new(4.5, 1.0, 0.0)));
        assert!(!area.contains(Position::new(0.0, 1.0, 2.5)));
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(CircularArea::new(Position::ZERO, 0.0).is_err());
        assert!(CircularArea::new(Position::ZERO, f32::NAN).is_err());
        assert!(CircularArea::new(Position::ZERO, 1.0)
            .unwrap()
            .with_max_height(-1.0)
            .is_err());
        assert!(RectangularArea::new(Position::ZERO, Vec2::new(1.0, 0.0)).is_err());
        assert!(SpacingRule::new(-0.5, true).is_err());
    }

    #[test]
    fn invalid_spacing_never_loads() {
        let negative: Result<AreaConfig, _> = serde_json::from_str(
            r#"{ "shape": "circle", "center": [0.0, 0.0, 0.0], "radius": 8.0,
                 "min_spacing": -2.0, "avoid_overlap": true }"#,
        );
        assert!(negative.is_err());

        let defaults: AreaConfig = serde_json::from_str(
            r#"{ "shape": "rectangle", "center": [0.0, 0.0, 0.0], "half_extents": [2.0, 2.0] }"#,
        )
        .unwrap();
        assert_eq!(defaults.build().unwrap().spacing(), SpacingRule::default());
        assert!(SpacingRule::new(f32::NAN, true).is_err());
    }

    #[test]
    fn config_builds_trait_object() {
        let config: AreaConfig = serde_json::from_str(
            r#"{ "shape": "circle", "center": [1.0, 0.0, 1.0], "radius": 8.0,
                 "min_spacing": 2.0, "avoid_overlap": true }"#,
        )
        .unwrap();
        let area = config.build().unwrap();
        assert_eq!(area.center(), Position::new(1.0, 0.0, 1.0));
        assert_eq!(area.spacing(), SpacingRule::new(2.0, true).unwrap());

        let bad = AreaConfig::Rectangle {
            center: Position::ZERO,
            half_extents: Vec2::new(-1.0, 1.0),
            max_height: 0.0,
            spacing: SpacingRule::default(),
        };
        assert!(bad.build().is_err());
    }
}
