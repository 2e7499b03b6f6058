use serde::Deserialize;

use crate::coords::Vec2;
use crate::paint::{Color, ColorSpec};
use crate::primitives;
use crate::scene::{DynamicPrimitive, ObjectRegistration, SceneObjectRef};
use crate::texture::UvRect;

use super::{color_or, parse_custom, positive, ObjectRenderer, RegistrationCtx, RegistrationError};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SpriteData {
    /// Image path; defaults to the atlas image when `atlas` is set.
    image: Option<String>,
    atlas: Option<String>,
    frame: u32,
    /// Atlas frames per second. Requires `atlas`.
    fps: Option<f32>,
    width: f32,
    height: f32,
    tint: Option<ColorSpec>,
}

/// Textured quads from the sprite array, optionally animated through an atlas.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteRenderer;

impl ObjectRenderer for SpriteRenderer {
    fn register(
        &self,
        instance: &SceneObjectRef,
        ctx: &mut RegistrationCtx<'_>,
    ) -> Result<ObjectRegistration, RegistrationError> {
        let inst = instance.borrow();
        let Some(custom) = parse_custom::<SpriteData>(&inst) else {
            return Ok(ObjectRegistration::empty());
        };

        // Unknown atlas ids are config errors and propagate.
        let atlas = match &custom.atlas {
            Some(id) => Some(ctx.atlas(id)?.clone()),
            None => None,
        };

        let image = custom.image.clone().or_else(|| atlas.as_ref().map(|a| a.image_path.clone()));
        let Some(image) = image.filter(|p| !p.trim().is_empty()) else {
            log::warn!("sprite {} has no image", inst.id().raw());
            return Ok(ObjectRegistration::empty());
        };
        let (Some(w), Some(h)) = (positive(custom.width), positive(custom.height)) else {
            log::warn!("sprite {} has no usable size", inst.id().raw());
            return Ok(ObjectRegistration::empty());
        };

        let layer = ctx.sprite_layer(&image);
        let size = Vec2::new(w, h);
        let rotation = inst.data().rotation;
        let tint = color_or(custom.tint.as_ref(), Some(Color::WHITE)).unwrap_or(Color::WHITE);

        match (atlas, custom.fps.and_then(positive)) {
            (Some(atlas), Some(fps)) => {
                let start = custom.frame;
                let mut reg = ObjectRegistration::empty();
                reg.push_dynamic(DynamicPrimitive::new(instance, move |inst, frame| {
                    let step = (frame.time.max(0.0) * fps) as u32;
                    let uv = atlas.frame_uv(start.wrapping_add(step));
                    let rotation = inst.data().rotation;
                    vec![primitives::sprite(inst.position_at(frame.alpha), size, rotation, layer, uv, tint)]
                }));
                Ok(reg)
            }
            (atlas, _) => {
                let uv = atlas.map_or(UvRect::FULL, |a| a.frame_uv(custom.frame));
                Ok(ObjectRegistration::with_static(vec![primitives::sprite(
                    Vec2::zero(),
                    size,
                    rotation,
                    layer,
                    uv,
                    tint,
                )]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::primitives::Primitive;
    use crate::texture::{AtlasGrid, TextureOptions};
    use serde_json::json;

    #[test]
    fn static_sprite_uses_dedup_index_as_layer() {
        let mut h = Harness::new();
        h.textures.texture_index("images/other.png", TextureOptions::default());
        let obj = object("sprite", json!({ "image": "images/tower.png", "width": 32, "height": 32 }));

        let reg = h.register(&SpriteRenderer, &obj).unwrap();
        let [Primitive::Sprite { layer, uv, .. }] = reg.static_primitives.as_slice() else {
            panic!("expected one sprite");
        };
        assert_eq!(*layer, 1);
        assert_eq!(*uv, UvRect::FULL);
    }

    #[test]
    fn atlas_animation_is_dynamic() {
        let mut h = Harness::new();
        h.atlases.register("imp", "images/imp.png", AtlasGrid::new(4, 1)).unwrap();
        let obj = object("sprite", json!({ "atlas": "imp", "fps": 4.0, "width": 16, "height": 16 }));

        let reg = h.register(&SpriteRenderer, &obj).unwrap();
        assert_eq!(reg.dynamic_primitives.len(), 1);

        let uv_at = |t| match primitives_at(&reg, t).as_slice() {
            [Primitive::Sprite { uv, .. }] => *uv,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(uv_at(0.0).u0, 0.0);
        assert_eq!(uv_at(0.5).u0, 0.5);
        assert_eq!(uv_at(1.0).u0, 0.0);
    }

    #[test]
    fn unknown_atlas_is_an_error() {
        let mut h = Harness::new();
        let obj = object("sprite", json!({ "atlas": "ghost", "width": 8, "height": 8 }));
        assert!(matches!(h.register(&SpriteRenderer, &obj), Err(RegistrationError::Atlas(_))));
    }

    #[test]
    fn missing_image_or_size_is_empty() {
        let mut h = Harness::new();
        let no_image = object("sprite", json!({ "width": 8, "height": 8 }));
        let no_size = object("sprite", json!({ "image": "images/a.png" }));
        assert!(h.register(&SpriteRenderer, &no_image).unwrap().is_empty());
        assert!(h.register(&SpriteRenderer, &no_size).unwrap().is_empty());
    }
}
