use std::collections::HashMap;
use std::rc::Rc;

use crate::coords::Vec2;
use crate::gpu::GpuBackend;

use super::{BulletGpuRenderer, BulletPoolError, BulletSlotHandle, BulletVisualConfig, ResolvedVisual};

/// Game-facing entry point for bullet visuals.
///
/// Bullet types register their [`BulletVisualConfig`] once under a visual key;
/// spawns then acquire slots by key without touching colors or shapes again.
#[derive(Debug)]
pub struct BulletRenderBridge {
    renderer: BulletGpuRenderer,
    visuals: HashMap<Rc<str>, ResolvedVisual>,
}

impl BulletRenderBridge {
    pub fn new(capacity_per_batch: u32) -> Self {
        Self {
            renderer: BulletGpuRenderer::new(capacity_per_batch),
            visuals: HashMap::new(),
        }
    }

    /// Resolves and stores the visual for `key`. Re-registering replaces it for
    /// future spawns; live slots keep the colors they were acquired with.
    pub fn register_visual(&mut self, key: &str, config: &BulletVisualConfig) {
        let resolved = config.resolve();
        if let Some(prev) = self.visuals.insert(Rc::from(key), resolved) {
            if prev != resolved {
                log::debug!("bullet visual `{key}` re-registered with a new config");
            }
        }
    }

    pub fn visual(&self, key: &str) -> Option<&ResolvedVisual> {
        self.visuals.get(key)
    }

    /// `Ok(None)` means the batch is full; the caller skips the visual and keeps
    /// its game-side bullet.
    pub fn acquire_slot(&mut self, key: &str) -> Result<Option<BulletSlotHandle>, BulletPoolError> {
        let Some((key, visual)) = self.visuals.get_key_value(key) else {
            return Err(BulletPoolError::UnknownVisual(key.to_owned()));
        };
        Ok(self.renderer.acquire_slot(Rc::clone(key), visual))
    }

    #[inline]
    pub fn update_slot(
        &mut self,
        handle: &BulletSlotHandle,
        position: Vec2,
        movement_rotation: f32,
        visual_rotation: f32,
        radius: f32,
        active: bool,
    ) -> Result<(), BulletPoolError> {
        self.renderer
            .update_slot(handle, position, movement_rotation, visual_rotation, radius, active)
    }

    #[inline]
    pub fn release_slot(&mut self, handle: BulletSlotHandle) -> Result<(), BulletPoolError> {
        self.renderer.release_slot(handle)
    }

    pub fn live_count(&self) -> u32 {
        self.renderer.live_count()
    }

    /// Flushes dirty slots and draws every batch. Returns the number of draws.
    pub fn render(&mut self, gl: &mut dyn GpuBackend) -> u32 {
        self.renderer.flush(gl);
        self.renderer.draw(gl)
    }

    pub fn reset(&mut self) {
        self.renderer.reset();
    }

    pub fn dispose(&mut self, gl: &mut dyn GpuBackend) {
        self.renderer.dispose(gl);
    }

    pub fn renderer(&self) -> &BulletGpuRenderer {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bullets::{BatchKey, BulletShape};
    use crate::gpu::testing::RecordingBackend;
    use crate::paint::ColorSpec;

    fn bridge() -> BulletRenderBridge {
        let mut b = BulletRenderBridge::new(3);
        b.register_visual("arrow", &BulletVisualConfig { shape: BulletShape::Bolt, ..Default::default() });
        b.register_visual("fireball", &BulletVisualConfig::default());
        b
    }

    #[test]
    fn unknown_visual_is_an_error() {
        let mut b = bridge();
        assert_eq!(b.acquire_slot("laser").unwrap_err(), BulletPoolError::UnknownVisual("laser".into()));
    }

    #[test]
    fn handle_records_visual_and_batch() {
        let mut b = bridge();
        let h = b.acquire_slot("arrow").unwrap().unwrap();
        assert_eq!(h.visual(), "arrow");
        assert_eq!(h.batch(), BatchKey { shape: BulletShape::Bolt });
        b.release_slot(h).unwrap();
    }

    #[test]
    fn spawn_update_release_lifecycle() {
        let mut gl = RecordingBackend::new();
        let mut b = bridge();

        let mut handles = Vec::new();
        for _ in 0..3 {
            handles.push(b.acquire_slot("fireball").unwrap().unwrap());
        }
        assert!(b.acquire_slot("fireball").unwrap().is_none(), "backpressure at capacity");

        for (i, h) in handles.iter().enumerate() {
            b.update_slot(h, Vec2::new(i as f32, 0.0), 0.0, 0.0, 4.0, true).unwrap();
        }
        assert_eq!(b.render(&mut gl), 1);
        assert_eq!(b.live_count(), 3);

        for h in handles.drain(..) {
            b.release_slot(h).unwrap();
        }
        assert_eq!(b.live_count(), 0);
        assert_eq!(b.render(&mut gl), 0);
    }

    #[test]
    fn re_registration_applies_to_new_spawns() {
        let mut b = bridge();
        let before = *b.visual("fireball").unwrap();
        b.register_visual(
            "fireball",
            &BulletVisualConfig { core_color: ColorSpec::Hex("#00ff00".into()), ..Default::default() },
        );
        assert_ne!(b.visual("fireball").unwrap().core, before.core);
    }
}
