use core::f32::consts::TAU;

use serde::Deserialize;

use crate::coords::Vec2;
use crate::paint::{Color, ColorSpec};
use crate::primitives::{self, PolylinePoint, QuadOptions, Winding};
use crate::scene::{DynamicPrimitive, ObjectRegistration, SceneObjectRef};

use super::{color_or, parse_custom, positive, ObjectRenderer, RegistrationCtx, RegistrationError};

const MAX_SEGMENTS: u32 = 64;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TentacleData {
    length: f32,
    segments: u32,
    base_width: f32,
    tip_width: f32,
    /// Peak bend per segment, radians.
    sway_amplitude: f32,
    /// Sway cycles per second.
    sway_speed: f32,
    color: Option<ColorSpec>,
    winding: Option<Winding>,
}

impl Default for TentacleData {
    fn default() -> Self {
        Self {
            length: 0.0,
            segments: 8,
            base_width: 6.0,
            tip_width: 1.0,
            sway_amplitude: 0.25,
            sway_speed: 0.6,
            color: None,
            winding: None,
        }
    }
}

/// Swaying, tapering limbs tessellated with [`primitives::polyline_to_quads`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TentacleRenderer {
    pub quad_options: QuadOptions,
}

/// Spine of the tentacle at `time`, rooted at `origin` and pointing along `heading`.
fn spine(data: &Spine, origin: Vec2, heading: f32, time: f32) -> Vec<PolylinePoint> {
    let n = data.segments;
    let step = data.length / n as f32;
    let mut angle = heading;
    let mut pos = origin;
    let mut points = Vec::with_capacity(n as usize + 1);

    for i in 0..=n {
        let t = i as f32 / n as f32;
        let width = data.base_width + (data.tip_width - data.base_width) * t;
        points.push(PolylinePoint { position: pos, width });
        angle += (time * data.sway_speed * TAU - i as f32 * 0.6).sin() * data.sway_amplitude * t;
        pos += Vec2::from_angle(angle) * step;
    }
    points
}

#[derive(Debug, Clone, Copy)]
struct Spine {
    length: f32,
    segments: u32,
    base_width: f32,
    tip_width: f32,
    sway_amplitude: f32,
    sway_speed: f32,
}

impl ObjectRenderer for TentacleRenderer {
    fn register(
        &self,
        instance: &SceneObjectRef,
        _ctx: &mut RegistrationCtx<'_>,
    ) -> Result<ObjectRegistration, RegistrationError> {
        let inst = instance.borrow();
        let Some(custom) = parse_custom::<TentacleData>(&inst) else {
            return Ok(ObjectRegistration::empty());
        };
        let Some(length) = positive(custom.length) else {
            log::warn!("tentacle {} has no usable length", inst.id().raw());
            return Ok(ObjectRegistration::empty());
        };
        let finite = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };

        let spine_data = Spine {
            length,
            segments: custom.segments.clamp(1, MAX_SEGMENTS),
            base_width: finite(custom.base_width),
            tip_width: finite(custom.tip_width),
            sway_amplitude: finite(custom.sway_amplitude),
            sway_speed: finite(custom.sway_speed),
        };
        let color = color_or(custom.color.as_ref(), inst.data().fill).unwrap_or(Color::WHITE);
        let options = QuadOptions {
            winding: custom.winding.unwrap_or(self.quad_options.winding),
            ..self.quad_options
        };

        let mut reg = ObjectRegistration::empty();
        reg.push_dynamic(DynamicPrimitive::new(instance, move |inst, frame| {
            let points = spine(&spine_data, inst.position_at(frame.alpha), inst.data().rotation, frame.time);
            let quads = primitives::polyline_to_quads(&points, options);
            vec![primitives::from_quads(&quads, color)]
        }));
        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::primitives::Primitive;
    use serde_json::json;

    #[test]
    fn tentacle_emits_one_quad_per_segment() {
        let mut h = Harness::new();
        let obj = object("tentacle", json!({ "length": 80, "segments": 10 }));
        let reg = h.register(&TentacleRenderer::default(), &obj).unwrap();

        for t in [0.0, 0.7, 3.1] {
            let prims = primitives_at(&reg, t);
            let [Primitive::Triangles { vertices, .. }] = prims.as_slice() else {
                panic!("expected a triangle list");
            };
            assert_eq!(vertices.len(), 10 * 6);
            assert!(vertices.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn sway_moves_the_tip() {
        let mut h = Harness::new();
        let obj = object("tentacle", json!({ "length": 50, "sway_amplitude": 0.4 }));
        let reg = h.register(&TentacleRenderer::default(), &obj).unwrap();
        assert_ne!(primitives_at(&reg, 0.0), primitives_at(&reg, 0.4));
    }

    #[test]
    fn zero_length_is_empty() {
        let mut h = Harness::new();
        let obj = object("tentacle", json!({ "segments": 4 }));
        assert!(h.register(&TentacleRenderer::default(), &obj).unwrap().is_empty());
    }
}
