use serde::Deserialize;

use crate::coords::Vec2;
use crate::paint::ColorSpec;
use crate::primitives::{self, Fill};
use crate::scene::{ObjectRegistration, SceneObjectRef};

use super::{
    color_or, parse_custom, positive, stroke_or, ObjectRenderer, RegistrationCtx, RegistrationError,
};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PolygonData {
    /// Explicit outline in object-local space.
    points: Vec<[f32; 2]>,
    /// Regular polygon, used when `points` is empty.
    sides: Option<u32>,
    radius: Option<f32>,
    fill: Option<ColorSpec>,
    stroke_width: Option<f32>,
    stroke_color: Option<ColorSpec>,
}

/// Static filled/stroked polygons (walls, tower bases, map decals).
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonRenderer;

impl ObjectRenderer for PolygonRenderer {
    fn register(
        &self,
        instance: &SceneObjectRef,
        _ctx: &mut RegistrationCtx<'_>,
    ) -> Result<ObjectRegistration, RegistrationError> {
        let inst = instance.borrow();
        let Some(custom) = parse_custom::<PolygonData>(&inst) else {
            return Ok(ObjectRegistration::empty());
        };
        let data = inst.data();
        let rotation = if data.rotation.is_finite() { data.rotation } else { 0.0 };

        let fill = Fill::from(color_or(custom.fill.as_ref(), data.fill));
        let stroke = stroke_or(custom.stroke_width, custom.stroke_color.as_ref(), data.stroke);

        let primitive = if !custom.points.is_empty() {
            if custom.points.len() < 3 {
                log::warn!("polygon {} has fewer than 3 points", inst.id().raw());
                return Ok(ObjectRegistration::empty());
            }
            let points = custom.points.iter().map(|&p| Vec2::from(p).rotated(rotation)).collect();
            primitives::polygon(points, fill, stroke)
        } else {
            match (custom.sides, custom.radius.and_then(positive)) {
                (Some(sides), Some(radius)) => {
                    primitives::regular_polygon(Vec2::zero(), radius, sides, rotation, fill, stroke)
                }
                _ => {
                    log::warn!("polygon {} has neither points nor sides/radius", inst.id().raw());
                    return Ok(ObjectRegistration::empty());
                }
            }
        };

        Ok(ObjectRegistration::with_static(vec![primitive]))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::paint::Color;
    use crate::primitives::Primitive;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn explicit_points_are_rotated() {
        let mut h = Harness::new();
        let obj = object("polygon", json!({ "points": [[1, 0], [0, 1], [-1, 0]] }));
        obj.borrow_mut().data_mut().rotation = core::f32::consts::FRAC_PI_2;

        let reg = h.register(&PolygonRenderer, &obj).unwrap();
        let Primitive::Polygon { points, fill, .. } = &reg.static_primitives[0] else { unreachable!() };
        assert_relative_eq!(points[0].x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(points[0].y, 1.0, epsilon = 1e-6);
        assert_eq!(fill.color(), Some(Color::WHITE));
        assert!(reg.dynamic_primitives.is_empty());
    }

    #[test]
    fn regular_polygon_from_sides() {
        let mut h = Harness::new();
        let obj = object("polygon", json!({ "sides": 5, "radius": 10.0, "fill": "#ff0000" }));
        let reg = h.register(&PolygonRenderer, &obj).unwrap();
        let Primitive::Polygon { points, fill, .. } = &reg.static_primitives[0] else { unreachable!() };
        assert_eq!(points.len(), 5);
        assert_eq!(fill.color(), Color::from_hex("#ff0000"));
    }

    #[test]
    fn malformed_payloads_register_empty() {
        let mut h = Harness::new();
        for custom in [
            json!({ "points": [[0, 0], [1, 1]] }),
            json!({ "points": "nope" }),
            json!({ "sides": 5 }),
            json!({ "sides": 5, "radius": -3 }),
        ] {
            let obj = object("polygon", custom);
            assert!(h.register(&PolygonRenderer, &obj).unwrap().is_empty());
        }
    }
}
