use serde::Deserialize;

use crate::paint::{Color, ColorSpec};
use crate::primitives;
use crate::scene::{DynamicPrimitive, ObjectRegistration, SceneObjectRef};

use super::{color_or, parse_custom, positive, ObjectRenderer, RegistrationCtx, RegistrationError};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SpellRingData {
    radius: f32,
    max_radius: f32,
    width: f32,
    color: Option<ColorSpec>,
    /// Seconds per expansion.
    duration: f32,
    repeat: bool,
    /// Frame time at which the first expansion starts.
    start_time: f32,
}

impl Default for SpellRingData {
    fn default() -> Self {
        Self {
            radius: 0.0,
            max_radius: 0.0,
            width: 3.0,
            color: None,
            duration: 1.0,
            repeat: true,
            start_time: 0.0,
        }
    }
}

/// Expanding, fading ring around a spell projectile or impact.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpellRingRenderer;

/// Progress in `[0, 1]`, or `None` once a one-shot ring has finished.
fn progress(time: f32, start: f32, duration: f32, repeat: bool) -> Option<f32> {
    let t = (time - start) / duration;
    if !t.is_finite() {
        return None;
    }
    if repeat {
        Some(t.rem_euclid(1.0))
    } else {
        (0.0..=1.0).contains(&t).then_some(t)
    }
}

impl ObjectRenderer for SpellRingRenderer {
    fn register(
        &self,
        instance: &SceneObjectRef,
        _ctx: &mut RegistrationCtx<'_>,
    ) -> Result<ObjectRegistration, RegistrationError> {
        let inst = instance.borrow();
        let Some(custom) = parse_custom::<SpellRingData>(&inst) else {
            return Ok(ObjectRegistration::empty());
        };
        let (Some(max_radius), Some(width), Some(duration)) =
            (positive(custom.max_radius), positive(custom.width), positive(custom.duration))
        else {
            log::warn!("spell ring {} needs positive max_radius, width and duration", inst.id().raw());
            return Ok(ObjectRegistration::empty());
        };

        let start_radius = if custom.radius.is_finite() { custom.radius.clamp(0.0, max_radius) } else { 0.0 };
        let color = color_or(custom.color.as_ref(), inst.data().fill).unwrap_or(Color::WHITE);
        let (start, repeat) = (custom.start_time, custom.repeat);

        let mut reg = ObjectRegistration::empty();
        reg.push_dynamic(DynamicPrimitive::new(instance, move |inst, frame| {
            let Some(t) = progress(frame.time, start, duration, repeat) else {
                return Vec::new();
            };
            let eased = 1.0 - (1.0 - t) * (1.0 - t);
            let r = start_radius + (max_radius - start_radius) * eased;
            vec![primitives::ring(inst.position_at(frame.alpha), r, width, color.fade(1.0 - t))]
        }));
        Ok(reg)
    }
}
