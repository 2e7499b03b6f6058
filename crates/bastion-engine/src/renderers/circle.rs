use core::f32::consts::TAU;

use serde::Deserialize;

use crate::coords::Vec2;
use crate::paint::ColorSpec;
use crate::primitives::{self, Fill};
use crate::scene::{DynamicPrimitive, ObjectRegistration, SceneObjectRef};

use super::{color_or, parse_custom, positive, stroke_or, ObjectRenderer, RegistrationCtx, RegistrationError};

#[derive(Debug, Deserialize, Clone, Copy)]
struct Pulse {
    /// Fraction of the radius added at the peak.
    amplitude: f32,
    /// Cycles per second.
    #[serde(default = "Pulse::default_speed")]
    speed: f32,
}

impl Pulse {
    fn default_speed() -> f32 {
        1.0
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CircleData {
    radius: f32,
    fill: Option<ColorSpec>,
    stroke_width: Option<f32>,
    stroke_color: Option<ColorSpec>,
    pulse: Option<Pulse>,
}

/// Circles (units, projectiles without a pooled visual, range markers).
///
/// With a `pulse` the radius is re-evaluated every frame; otherwise the circle is static.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleRenderer;

impl ObjectRenderer for CircleRenderer {
    fn register(
        &self,
        instance: &SceneObjectRef,
        _ctx: &mut RegistrationCtx<'_>,
    ) -> Result<ObjectRegistration, RegistrationError> {
        let inst = instance.borrow();
        let Some(custom) = parse_custom::<CircleData>(&inst) else {
            return Ok(ObjectRegistration::empty());
        };
        let Some(radius) = positive(custom.radius) else {
            log::warn!("circle {} has no usable radius", inst.id().raw());
            return Ok(ObjectRegistration::empty());
        };

        let data = inst.data();
        let fill = Fill::from(color_or(custom.fill.as_ref(), data.fill));
        let stroke = stroke_or(custom.stroke_width, custom.stroke_color.as_ref(), data.stroke);

        let pulse = custom
            .pulse
            .filter(|p| p.amplitude.is_finite() && p.speed.is_finite() && p.amplitude != 0.0);
        let Some(pulse) = pulse else {
            return Ok(ObjectRegistration::with_static(vec![primitives::circle(
                Vec2::zero(),
                radius,
                fill,
                stroke,
            )]));
        };

        let mut reg = ObjectRegistration::empty();
        reg.push_dynamic(DynamicPrimitive::new(instance, move |inst, frame| {
            let wave = (frame.time * pulse.speed * TAU).sin();
            let r = radius * (1.0 + pulse.amplitude * wave);
            vec![primitives::circle(inst.position_at(frame.alpha), r, fill, stroke)]
        }));
        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::primitives::Primitive;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn plain_circle_is_static() {
        let mut h = Harness::new();
        let obj = object("circle", json!({ "radius": 6 }));
        let reg = h.register(&CircleRenderer, &obj).unwrap();
        assert_eq!(reg.static_primitives.len(), 1);
        assert!(reg.dynamic_primitives.is_empty());
    }

    #[test]
    fn pulse_animates_radius() {
        let mut h = Harness::new();
        let obj = object("circle", json!({ "radius": 10, "pulse": { "amplitude": 0.5, "speed": 1.0 } }));
        let reg = h.register(&CircleRenderer, &obj).unwrap();
        assert!(reg.static_primitives.is_empty());

        let radius_at = |t| match primitives_at(&reg, t).as_slice() {
            [Primitive::Circle { radius, .. }] => *radius,
            other => panic!("unexpected {other:?}"),
        };
        assert_relative_eq!(radius_at(0.0), 10.0);
        assert_relative_eq!(radius_at(0.25), 15.0, epsilon = 1e-4);
    }

    #[test]
    fn missing_radius_is_empty() {
        let mut h = Harness::new();
        assert!(h.register(&CircleRenderer, &object("circle", json!({}))).unwrap().is_empty());
        assert!(h.register(&CircleRenderer, &object("circle", json!([1, 2]))).unwrap().is_empty());
    }
}
