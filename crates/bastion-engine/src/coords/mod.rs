//! Positions and drawable-area types.
//!
//! Logical pixels, origin top-left, +Y down. Shaders convert to clip space
//! from the viewport uniform.

mod vec2;
mod viewport;

pub use vec2::Vec2;
pub use viewport::Viewport;
