//! Per-kind visual policies turning scene objects into primitives.
//!
//! Every renderer implements [`ObjectRenderer`]. Renderers are pure with respect
//! to the instance: they read its data and never mutate it. Custom data is
//! untrusted; anything malformed registers as empty with a warning.
//!
//! Extending:
//! - add a module with the renderer and its serde payload
//! - add a [`RendererKind`] variant and its dispatch arm
//! - map a kind name to it in [`RendererRegistry::with_defaults`]

mod aura;
mod circle;
mod emitter_cache;
mod polygon;
mod spell_ring;
mod sprite;
mod tentacle;

pub use aura::{AuraLayer, AuraRenderer};
pub use circle::CircleRenderer;
pub use emitter_cache::{EmitterConfig, EmitterConfigCache, Particle};
pub use polygon::PolygonRenderer;
pub use spell_ring::SpellRingRenderer;
pub use sprite::SpriteRenderer;
pub use tentacle::TentacleRenderer;

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::paint::{Color, ColorSpec, Stroke};
use crate::scene::{ObjectRegistration, SceneObjectInstance, SceneObjectRef};
use crate::texture::{AtlasEntry, AtlasError, TextureAtlasRegistry, TextureOptions, TextureResourceManager};

/// Errors that indicate a programming or content-config mistake.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error(transparent)]
    Atlas(#[from] AtlasError),
}

/// Services available to renderers while registering an instance.
pub struct RegistrationCtx<'a> {
    pub textures: &'a mut TextureResourceManager,
    pub atlases: &'a TextureAtlasRegistry,
    pub emitters: &'a mut EmitterConfigCache,
    requested: Vec<String>,
}

impl<'a> RegistrationCtx<'a> {
    pub fn new(
        textures: &'a mut TextureResourceManager,
        atlases: &'a TextureAtlasRegistry,
        emitters: &'a mut EmitterConfigCache,
    ) -> Self {
        Self { textures, atlases, emitters, requested: Vec::new() }
    }

    /// Sprite-array layer for `path`, available before the image loads.
    ///
    /// The path is queued so the caller can start the load with a live context.
    pub fn sprite_layer(&mut self, path: &str) -> u32 {
        let key = self.textures.normalize(path, None);
        let layer = self.textures.texture_index(&key, TextureOptions::default());
        if !self.requested.contains(&key) {
            self.requested.push(key);
        }
        layer
    }

    pub fn atlas(&self, id: &str) -> Result<&AtlasEntry, AtlasError> {
        self.atlases.resolve(id)
    }

    /// Normalized paths queued by [`sprite_layer`](Self::sprite_layer) since the last call.
    pub fn take_requested(&mut self) -> Vec<String> {
        std::mem::take(&mut self.requested)
    }
}

/// Registration contract shared by every renderer.
pub trait ObjectRenderer {
    fn register(
        &self,
        instance: &SceneObjectRef,
        ctx: &mut RegistrationCtx<'_>,
    ) -> Result<ObjectRegistration, RegistrationError>;
}

/// Closed set of renderers, dispatched by match.
#[derive(Debug, Clone)]
pub enum RendererKind {
    Polygon(PolygonRenderer),
    Circle(CircleRenderer),
    Sprite(SpriteRenderer),
    Aura(AuraRenderer),
    SpellRing(SpellRingRenderer),
    Tentacle(TentacleRenderer),
}

impl ObjectRenderer for RendererKind {
    fn register(
        &self,
        instance: &SceneObjectRef,
        ctx: &mut RegistrationCtx<'_>,
    ) -> Result<ObjectRegistration, RegistrationError> {
        match self {
            RendererKind::Polygon(r) => r.register(instance, ctx),
            RendererKind::Circle(r) => r.register(instance, ctx),
            RendererKind::Sprite(r) => r.register(instance, ctx),
            RendererKind::Aura(r) => r.register(instance, ctx),
            RendererKind::SpellRing(r) => r.register(instance, ctx),
            RendererKind::Tentacle(r) => r.register(instance, ctx),
        }
    }
}

/// Maps scene object kinds to renderers.
#[derive(Debug, Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<String, RendererKind>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in renderer under its conventional kind name.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.insert("polygon", RendererKind::Polygon(PolygonRenderer));
        reg.insert("circle", RendererKind::Circle(CircleRenderer));
        reg.insert("sprite", RendererKind::Sprite(SpriteRenderer));
        reg.insert("aura", RendererKind::Aura(AuraRenderer));
        reg.insert("spell_ring", RendererKind::SpellRing(SpellRingRenderer));
        reg.insert("tentacle", RendererKind::Tentacle(TentacleRenderer::default()));
        reg
    }

    pub fn insert(&mut self, kind: impl Into<String>, renderer: RendererKind) -> Option<RendererKind> {
        self.renderers.insert(kind.into(), renderer)
    }

    pub fn get(&self, kind: &str) -> Option<&RendererKind> {
        self.renderers.get(kind)
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

/// Deserializes the instance's custom payload, warning on failure.
///
/// A missing payload (`null`) is read as an empty object so all-default
/// payloads need no data at all.
pub(crate) fn parse_custom<T: DeserializeOwned>(instance: &SceneObjectInstance) -> Option<T> {
    let custom = &instance.data().custom;
    let parsed = if custom.is_null() {
        serde_json::from_value(serde_json::Value::Object(Default::default()))
    } else {
        T::deserialize(custom)
    };
    match parsed {
        Ok(v) => Some(v),
        Err(err) => {
            log::warn!(
                "malformed custom data on {} object {}: {err}",
                instance.kind(),
                instance.id().raw()
            );
            None
        }
    }
}

/// Resolves an optional color from custom data, falling back to `fallback`.
pub(crate) fn color_or(spec: Option<&ColorSpec>, fallback: Option<Color>) -> Option<Color> {
    match spec {
        Some(spec) => spec.resolve().map(Color::clamped).or(fallback),
        None => fallback,
    }
}

/// Stroke from optional custom overrides layered on the instance stroke.
pub(crate) fn stroke_or(
    width: Option<f32>,
    color: Option<&ColorSpec>,
    fallback: Option<Stroke>,
) -> Option<Stroke> {
    let color = color_or(color, fallback.map(|s| s.color))?;
    let width = match width {
        Some(w) => positive(w)?,
        None => fallback?.width,
    };
    Some(Stroke::new(width, color))
}

/// `Some(v)` when `v` is finite and strictly positive.
#[inline]
pub(crate) fn positive(v: f32) -> Option<f32> {
    (v.is_finite() && v > 0.0).then_some(v)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Payload {
        radius: f32,
    }

    #[test]
    fn null_payload_uses_defaults() {
        let obj = object("circle", serde_json::Value::Null);
        let parsed: Option<Payload> = parse_custom(&obj.borrow());
        assert_eq!(parsed.map(|p| p.radius), Some(0.0));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let obj = object("circle", json!({ "radius": "big" }));
        assert!(parse_custom::<Payload>(&obj.borrow()).is_none());
    }

    #[test]
    fn defaults_cover_builtin_kinds() {
        let reg = RendererRegistry::with_defaults();
        for kind in ["polygon", "circle", "sprite", "aura", "spell_ring", "tentacle"] {
            assert!(reg.get(kind).is_some(), "{kind}");
        }
    }

    #[test]
    fn sprite_layer_queues_each_path_once() {
        let mut h = Harness::new();
        let mut ctx = RegistrationCtx::new(&mut h.textures, &h.atlases, &mut h.emitters);
        let a = ctx.sprite_layer("images/a.png");
        let again = ctx.sprite_layer("/images/a.png");
        let b = ctx.sprite_layer("images/b.png");
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(ctx.take_requested().len(), 2);
        assert!(ctx.take_requested().is_empty());
    }
}
