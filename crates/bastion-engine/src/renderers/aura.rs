use core::f32::consts::TAU;

use serde::Deserialize;

use crate::paint::{Color, ColorSpec};
use crate::primitives::{self, Fill};
use crate::scene::{DynamicPrimitive, ObjectRegistration, SceneObjectRef};

use super::{color_or, parse_custom, positive, EmitterConfig, ObjectRenderer, RegistrationCtx, RegistrationError};

const BREATH: f32 = 0.08;

/// One visual layer of an aura.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuraLayer {
    /// Soft filled disc.
    Glow {
        #[serde(default = "one")]
        radius_scale: f32,
        color: Option<ColorSpec>,
    },
    /// Outline at a multiple of the aura radius.
    Ring {
        #[serde(default = "one")]
        radius_scale: f32,
        #[serde(default = "one")]
        width: f32,
        color: Option<ColorSpec>,
    },
    /// Accepted in content files but not drawn by auras.
    Sprite {},
    #[serde(other)]
    Unsupported,
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ParticleSpec {
    count: u32,
    speed: f32,
    lifetime: f32,
    size: f32,
    color: Option<ColorSpec>,
}

impl Default for ParticleSpec {
    fn default() -> Self {
        Self { count: 12, speed: 8.0, lifetime: 1.5, size: 2.0, color: None }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AuraData {
    radius: f32,
    color: Option<ColorSpec>,
    /// Breathing cycles per second.
    pulse_speed: f32,
    layers: Vec<AuraLayer>,
    particles: Option<ParticleSpec>,
}

impl Default for AuraData {
    fn default() -> Self {
        Self { radius: 0.0, color: None, pulse_speed: 0.5, layers: Vec::new(), particles: None }
    }
}

/// Pulsing area-of-effect visuals with optional drifting particles.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuraRenderer;

impl ObjectRenderer for AuraRenderer {
    fn register(
        &self,
        instance: &SceneObjectRef,
        ctx: &mut RegistrationCtx<'_>,
    ) -> Result<ObjectRegistration, RegistrationError> {
        let inst = instance.borrow();
        let Some(custom) = parse_custom::<AuraData>(&inst) else {
            ctx.emitters.forget(inst.id());
            return Ok(ObjectRegistration::empty());
        };
        let Some(radius) = positive(custom.radius) else {
            log::warn!("aura {} has no usable radius", inst.id().raw());
            ctx.emitters.forget(inst.id());
            return Ok(ObjectRegistration::empty());
        };

        let base = color_or(custom.color.as_ref(), inst.data().fill)
            .unwrap_or(Color::from_straight(0.4, 0.8, 1.0, 0.35));
        let speed = if custom.pulse_speed.is_finite() { custom.pulse_speed } else { 0.0 };
        let layers = if custom.layers.is_empty() && custom.particles.is_none() {
            vec![AuraLayer::Glow { radius_scale: 1.0, color: None }]
        } else {
            custom.layers
        };

        let mut reg = ObjectRegistration::empty();
        for layer in layers {
            match layer {
                AuraLayer::Glow { radius_scale, color } => {
                    let Some(scale) = positive(radius_scale) else { continue };
                    let color = color_or(color.as_ref(), Some(base)).unwrap_or(base);
                    reg.push_dynamic(DynamicPrimitive::new(instance, move |inst, frame| {
                        let breath = (frame.time * speed * TAU).sin();
                        let r = radius * scale * (1.0 + BREATH * breath);
                        let fill = Fill::Solid(color.fade(0.8 + 0.2 * breath));
                        vec![primitives::circle(inst.position_at(frame.alpha), r, fill, None)]
                    }));
                }
                AuraLayer::Ring { radius_scale, width, color } => {
                    let (Some(scale), Some(width)) = (positive(radius_scale), positive(width)) else {
                        continue;
                    };
                    let color = color_or(color.as_ref(), Some(base)).unwrap_or(base);
                    reg.push_dynamic(DynamicPrimitive::new(instance, move |inst, frame| {
                        let breath = (frame.time * speed * TAU + 1.0).sin();
                        let r = radius * scale * (1.0 + BREATH * breath);
                        vec![primitives::ring(inst.position_at(frame.alpha), r, width, color)]
                    }));
                }
                AuraLayer::Sprite {} | AuraLayer::Unsupported => {
                    log::warn!("aura {}: unsupported layer type skipped", inst.id().raw());
                }
            }
        }

        if let Some(spec) = custom.particles.filter(|p| p.count > 0) {
            let color = color_or(spec.color.as_ref(), Some(base)).unwrap_or(base);
            let seed = inst.id().raw() as u32;
            let config = ctx.emitters.get_or_insert_with(inst.id(), inst.version(), || EmitterConfig {
                count: spec.count.min(256),
                spawn_radius: radius,
                speed: if spec.speed.is_finite() { spec.speed } else { 0.0 },
                lifetime: positive(spec.lifetime).unwrap_or(1.0),
                size: positive(spec.size).unwrap_or(1.0),
                color,
                seed,
            });
            reg.push_dynamic(DynamicPrimitive::new(instance, move |inst, frame| {
                let center = inst.position_at(frame.alpha);
                config
                    .particles(frame.time)
                    .map(|p| {
                        let fill = Fill::Solid(config.color.fade(p.alpha));
                        primitives::circle(center + p.offset, p.size, fill, None)
                    })
                    .collect()
            }));
        } else {
            ctx.emitters.forget(inst.id());
        }

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
    fn default_aura_is_one_breathing_glow() {
        let mut h = Harness::new();
        let obj = object("aura", json!({ "radius": 40 }));
        let reg = h.register(&AuraRenderer, &obj).unwrap();
        assert_eq!(reg.dynamic_primitives.len(), 1);

        let r = |t| match primitives_at(&reg, t).as_slice() {
            [Primitive::Circle { radius, .. }] => *radius,
            other => panic!("unexpected {other:?}"),
        };
        assert_ne!(r(0.0), r(0.5));
    }

    #[test]
    fn sprite_and_unknown_layers_are_skipped() {
        let mut h = Harness::new();
        let obj = object(
            "aura",
            json!({
                "radius": 30,
                "layers": [
                    { "type": "sprite", "image": "images/aura.png" },
                    { "type": "ring", "width": 2 },
                    { "type": "hologram" }
                ]
            }),
        );
        let reg = h.register(&AuraRenderer, &obj).unwrap();
        assert_eq!(reg.dynamic_primitives.len(), 1);
    }

    #[test]
    fn particles_use_the_emitter_cache() {
        let mut h = Harness::new();
        let obj = object("aura", json!({ "radius": 20, "particles": { "count": 5 } }));

        let reg = h.register(&AuraRenderer, &obj).unwrap();
        assert_eq!(h.emitters.len(), 1);
        assert_eq!(h.emitters.total_capacity(), 5);
        assert_eq!(primitives_at(&reg, 0.3).len(), 5);

        // Same version: cached config reused.
        h.register(&AuraRenderer, &obj).unwrap();
        assert_eq!(h.emitters.recomputes(), 1);

        obj.borrow_mut().data_mut().custom = json!({ "radius": 20, "particles": { "count": 9 } });
        h.register(&AuraRenderer, &obj).unwrap();
        assert_eq!(h.emitters.recomputes(), 2);
        assert_eq!(h.emitters.total_capacity(), 9);
    }

    #[test]
    fn dropping_particles_releases_the_emitter() {
        let mut h = Harness::new();
        let obj = object("aura", json!({ "radius": 20, "particles": { "count": 5 } }));
        h.register(&AuraRenderer, &obj).unwrap();
        assert_eq!(h.emitters.total_capacity(), 5);

        obj.borrow_mut().data_mut().custom = json!({ "radius": 20 });
        let reg = h.register(&AuraRenderer, &obj).unwrap();
        assert_eq!(reg.dynamic_primitives.len(), 1);
        assert!(h.emitters.is_empty());
        assert_eq!(h.emitters.total_capacity(), 0);

        obj.borrow_mut().data_mut().custom = json!({ "radius": 20, "particles": { "count": 3 } });
        h.register(&AuraRenderer, &obj).unwrap();
        obj.borrow_mut().data_mut().custom = json!({ "radius": 20, "particles": { "count": 0 } });
        h.register(&AuraRenderer, &obj).unwrap();
        assert!(h.emitters.is_empty());
    }

    #[test]
    fn missing_radius_is_empty() {
        let mut h = Harness::new();
        assert!(h.register(&AuraRenderer, &object("aura", json!({ "layers": [] }))).unwrap().is_empty());
    }
}
