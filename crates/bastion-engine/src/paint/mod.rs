//! Paint model shared by scene data and renderers.
//!
//! Scope:
//! - color representation (linear premultiplied alpha)
//! - stroke description
//!
//! Geometry types remain in `coords`.

pub mod color;

pub use color::{Color, ColorSpec};

/// Stroke drawn along the outline of a shape.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: Color,
}

impl Stroke {
    #[inline]
    pub fn new(width: f32, color: Color) -> Self {
        Self { width, color }
    }

    /// A stroke that would produce no geometry.
    #[inline]
    pub fn is_invisible(&self) -> bool {
        !(self.width > 0.0) || self.color.a <= 0.0
    }
}
