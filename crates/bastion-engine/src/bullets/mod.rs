//! Instanced bullet rendering.
//!
//! Bullets churn too fast to go through scene registration. Each logical bullet
//! owns one slot in a fixed-capacity, persistent instance buffer; updates
//! write that slot in place, so per-frame cost is O(dirty slots).
//!
//! - [`BulletGpuRenderer`]: batches, slot allocation, dirty flushing, draws
//! - [`BulletRenderBridge`]: visual-key registry in front of the renderer
//!
//! Slot ownership is carried by [`BulletSlotHandle`], which cannot be cloned and
//! is consumed by release.

mod bridge;
mod pool;

pub use bridge::BulletRenderBridge;
pub use pool::{BulletGpuRenderer, BulletInstance, BulletSlotHandle};

use serde::{Deserialize, Serialize};

use crate::paint::{Color, ColorSpec};

/// Silhouette drawn by the bullet shader. One GPU batch per shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletShape {
    /// Round core with a soft tail.
    #[default]
    Orb,
    /// Elongated streak aligned with movement.
    Bolt,
    /// Diamond that spins with the visual rotation.
    Shard,
}

impl BulletShape {
    /// Value passed to the shader.
    #[inline]
    pub fn shader_id(self) -> f32 {
        match self {
            BulletShape::Orb => 0.0,
            BulletShape::Bolt => 1.0,
            BulletShape::Shard => 2.0,
        }
    }
}

/// Identifies one instance buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey {
    pub shape: BulletShape,
}

impl From<BulletShape> for BatchKey {
    fn from(shape: BulletShape) -> Self {
        Self { shape }
    }
}

/// Visual policy for a bullet type, as written in content config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletVisualConfig {
    pub shape: BulletShape,
    pub core_color: ColorSpec,
    pub tail_color: ColorSpec,
    /// Tail length as a multiple of the radius.
    pub tail_length: f32,
    /// Tail width as a multiple of the radius.
    pub tail_width: f32,
}

impl Default for BulletVisualConfig {
    fn default() -> Self {
        Self {
            shape: BulletShape::Orb,
            core_color: ColorSpec::Hex("#fff4c2".into()),
            tail_color: ColorSpec::Hex("#ff9a3c80".into()),
            tail_length: 3.0,
            tail_width: 0.8,
        }
    }
}

/// [`BulletVisualConfig`] with colors resolved and multipliers sanitized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResolvedVisual {
    pub batch: BatchKey,
    pub core: Color,
    pub tail: Color,
    pub tail_length: f32,
    pub tail_width: f32,
}

impl BulletVisualConfig {
    pub fn resolve(&self) -> ResolvedVisual {
        let sane = |v: f32, fallback: f32| if v.is_finite() && v >= 0.0 { v } else { fallback };
        ResolvedVisual {
            batch: BatchKey::from(self.shape),
            core: self.core_color.resolve().map_or(Color::WHITE, Color::clamped),
            tail: self.tail_color.resolve().map_or(Color::transparent(), Color::clamped),
            tail_length: sane(self.tail_length, 0.0),
            tail_width: sane(self.tail_width, 1.0),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BulletPoolError {
    /// The slot was released or the pool was reset since the handle was issued.
    #[error("stale bullet slot handle (slot {slot} of {batch:?})")]
    StaleHandle { batch: BatchKey, slot: u32 },
    #[error("unknown bullet visual `{0}`")]
    UnknownVisual(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_config_from_toml_like_json() {
        let cfg: BulletVisualConfig =
            serde_json::from_value(serde_json::json!({ "shape": "bolt", "core_color": [1.0, 0.0, 0.0, 1.0] }))
                .unwrap();
        let resolved = cfg.resolve();
        assert_eq!(resolved.batch, BatchKey { shape: BulletShape::Bolt });
        assert_eq!(resolved.core, Color::from_straight(1.0, 0.0, 0.0, 1.0));
        assert_eq!(resolved.tail_length, 3.0);
    }

    #[test]
    fn bad_values_are_sanitized() {
        let cfg = BulletVisualConfig {
            core_color: ColorSpec::Hex("not a color".into()),
            tail_length: f32::NAN,
            ..Default::default()
        };
        let resolved = cfg.resolve();
        assert_eq!(resolved.core, Color::WHITE);
        assert_eq!(resolved.tail_length, 0.0);
    }
}
