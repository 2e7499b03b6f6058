/// Drawable area in logical pixels, plus the DPI scale to physical ones.
///
/// Mesh and bullet positions are logical; offscreen targets are physical.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height, scale: 1.0 }
    }

    pub fn from_physical(width: u32, height: u32, scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale as f32 } else { 1.0 };
        Self { width: width as f32 / scale, height: height as f32 / scale, scale }
    }

    /// Logical size with degenerate axes raised to one pixel.
    pub fn logical_size(self) -> [f32; 2] {
        let axis = |v: f32| if v.is_finite() { v.max(1.0) } else { 1.0 };
        [axis(self.width), axis(self.height)]
    }

    /// Physical size in whole pixels, never zero.
    pub fn physical_size(self) -> (u32, u32) {
        let [w, h] = self.logical_size();
        let px = |v: f32| ((v * self.scale).round() as u32).max(1);
        (px(w), px(h))
    }
}
