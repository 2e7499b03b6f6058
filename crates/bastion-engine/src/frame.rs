//! Per-frame orchestration of the rendering core.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::assets::{AssetResolver, ImageLoader};
use crate::batch::{DynamicVertexBuffer, PrimitiveBatcher};
use crate::bridge::{value_or, DataBridge};
use crate::bullets::BulletRenderBridge;
use crate::config::BastionConfig;
use crate::coords::Viewport;
use crate::debug::DebugStats;
use crate::gpu::{DrawCall, GpuBackend};
use crate::postprocess::{RadiationParams, RadiationPostProcess};
use crate::renderers::{EmitterConfigCache, RegistrationCtx, RegistrationError, RendererRegistry};
use crate::scene::{FrameParams, PrimitiveList, SceneRegistry};
use crate::texture::{
    SpriteTextureManager, TextureAtlasRegistry, TextureError, TextureOptions, TextureRequest,
    TextureResourceManager,
};

/// Owns every GPU-facing manager and drives them once per frame.
pub struct FrameRenderer {
    textures: TextureResourceManager,
    atlases: TextureAtlasRegistry,
    emitters: EmitterConfigCache,
    renderers: RendererRegistry,
    sprites: SpriteTextureManager,
    /// Sprite loads by normalized path. Kept across context changes so they can be re-issued.
    sprite_requests: HashMap<String, Option<TextureRequest>>,

    list: PrimitiveList,
    batcher: PrimitiveBatcher,
    vbo: DynamicVertexBuffer,

    radiation: RadiationPostProcess,
    radiation_base: RadiationParams,
    intensity_key: String,
    bridge: Rc<RefCell<dyn DataBridge>>,

    viewport: Viewport,
}

impl FrameRenderer {
    pub fn new(
        config: &BastionConfig,
        loader: Box<dyn ImageLoader>,
        bridge: Rc<RefCell<dyn DataBridge>>,
    ) -> Self {
        let mut atlases = TextureAtlasRegistry::new();
        for def in &config.assets.atlases {
            if let Err(e) = atlases.register(&def.id, &def.image, def.grid) {
                log::warn!("skipping atlas: {e}");
            }
        }

        Self {
            textures: TextureResourceManager::new(AssetResolver::new(config.assets.root.clone()), loader),
            atlases,
            emitters: EmitterConfigCache::new(),
            renderers: RendererRegistry::with_defaults(),
            sprites: SpriteTextureManager::new(config.sprites.max_textures, config.sprites.texture_size),
            sprite_requests: HashMap::new(),
            list: PrimitiveList::new(),
            batcher: PrimitiveBatcher::with_layer_capacity(config.sprites.max_textures),
            vbo: DynamicVertexBuffer::new(),
            radiation: RadiationPostProcess::new(),
            radiation_base: config.radiation.params,
            intensity_key: config.radiation.intensity_key.clone(),
            bridge,
            viewport: Viewport::default(),
        }
    }

    /// Surface area; its physical size sizes the post-process target.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn textures(&self) -> &TextureResourceManager {
        &self.textures
    }

    pub fn atlases_mut(&mut self) -> &mut TextureAtlasRegistry {
        &mut self.atlases
    }

    pub fn renderers_mut(&mut self) -> &mut RendererRegistry {
        &mut self.renderers
    }

    pub fn radiation(&self) -> &RadiationPostProcess {
        &self.radiation
    }

    /// Renders one frame.
    ///
    /// Registration errors (unknown atlas ids) do not abort the frame: the
    /// offending objects are dropped from the scene, everything else is drawn,
    /// and the first error is returned afterwards.
    pub fn render(
        &mut self,
        gl: &mut dyn GpuBackend,
        frame: &FrameParams,
        scene: &mut SceneRegistry,
        bullets: &mut BulletRenderBridge,
        stats: &mut DebugStats,
    ) -> Result<(), RegistrationError> {
        stats.begin_frame();

        if self.textures.context() != Some(gl.context_id()) {
            self.textures.set_context(gl);
            // Cached textures are gone; every sprite needs loading again.
            for request in self.sprite_requests.values_mut() {
                *request = None;
            }
        }

        self.textures.pump(gl);
        self.sprites.update_from_cache(gl, &self.textures);

        let sync = {
            let mut ctx = RegistrationCtx::new(&mut self.textures, &self.atlases, &mut self.emitters);
            let result = scene.sync(&self.renderers, &mut ctx);
            for path in ctx.take_requested() {
                self.sprite_requests.entry(path).or_insert(None);
            }
            result
        };
        self.request_sprites(gl);

        self.list.clear();
        scene.collect(frame, &mut self.list);
        self.batcher.batch(&mut self.list);

        let params = self.radiation_params(frame);
        let (width, height) = self.viewport.physical_size();
        let capturing = params.is_active() && self.radiation.begin_frame(gl, width, height);

        if let Some(vertices) = self.vbo.upload(gl, self.batcher.vertices(), stats) {
            let textures = if self.batcher.has_textured() { self.sprites.texture() } else { None };
            gl.draw(&DrawCall::Mesh { vertices, vertex_count: self.batcher.vertex_count(), textures });
            stats.draw_calls += 1;
        }

        stats.draw_calls += bullets.render(gl);

        if capturing && self.radiation.render(gl, &params) {
            stats.draw_calls += 1;
        }

        stats.textures_cached = self.textures.len() as u32;
        stats.scene_objects = scene.len() as u32;
        stats.live_bullets = bullets.live_count();
        stats.particle_emitters = self.emitters.len() as u32;
        stats.particle_capacity = self.emitters.total_capacity().min(u32::MAX as u64) as u32;

        sync.map(|_| ())
    }

    /// Starts loads for sprite paths that have none in flight or cached.
    fn request_sprites(&mut self, gl: &mut dyn GpuBackend) {
        for (path, request) in &mut self.sprite_requests {
            match request.as_ref().and_then(TextureRequest::poll) {
                Some(Err(TextureError::ContextChanged(_))) => *request = None,
                Some(Err(err)) => {
                    log::warn!("sprite {path} unavailable: {err}");
                    // Keep the failed handle; no automatic retry.
                    continue;
                }
                _ => {}
            }
            if request.is_none() {
                *request = Some(self.textures.load_texture(gl, path, TextureOptions::default()));
            }
        }
    }

    fn radiation_params(&self, frame: &FrameParams) -> RadiationParams {
        let intensity: f32 = value_or(&*self.bridge.borrow(), &self.intensity_key, 0.0);
        RadiationParams {
            time: frame.time,
            intensity: if intensity.is_finite() { intensity.clamp(0.0, 1.0) } else { 0.0 },
            ..self.radiation_base
        }
    }

    /// Releases everything owned by `old`, then adopts `new`. Sprites are
    /// requested again on the next frame.
    pub fn swap_context(&mut self, old: &mut dyn GpuBackend, new: &dyn GpuBackend) {
        self.dispose(old);
        self.textures.set_context(new);
    }

    /// Releases every GPU object this renderer owns on `gl`.
    pub fn dispose(&mut self, gl: &mut dyn GpuBackend) {
        self.textures.dispose(gl);
        self.sprites.dispose(gl);
        self.vbo.dispose(gl);
        self.radiation.dispose(gl);
        for request in self.sprite_requests.values_mut() {
            *request = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::ManualImageLoader;
    use crate::assets::AssetRoot;
    use crate::bridge::LocalDataBridge;
    use crate::bullets::BulletVisualConfig;
    use crate::coords::Vec2;
    use crate::gpu::testing::{Op, RecordingBackend};
    use crate::paint::Color;
    use crate::postprocess::RadiationState;
    use crate::scene::{SceneObjectData, SceneObjectInstance, SceneObjectRef};
    use serde_json::json;

    struct Fixture {
        renderer: FrameRenderer,
        loader: Rc<RefCell<ManualImageLoader>>,
        bridge: Rc<RefCell<LocalDataBridge>>,
        scene: SceneRegistry,
        bullets: BulletRenderBridge,
        stats: DebugStats,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(BastionConfig::default())
        }

        fn with_config(mut config: BastionConfig) -> Self {
            config.assets.root = AssetRoot::Web { base_url: "https://game.test".into() };
            let loader = Rc::new(RefCell::new(ManualImageLoader::new()));
            let bridge = Rc::new(RefCell::new(LocalDataBridge::new()));
            let mut renderer = FrameRenderer::new(&config, Box::new(Rc::clone(&loader)), bridge.clone());
            renderer.set_viewport(Viewport::new(320.0, 240.0));

            let mut bullets = BulletRenderBridge::new(16);
            bullets.register_visual("arrow", &BulletVisualConfig::default());

            Self { renderer, loader, bridge, scene: SceneRegistry::new(), bullets, stats: DebugStats::default() }
        }

        fn frame(&mut self, gl: &mut RecordingBackend, time: f32) -> Result<(), RegistrationError> {
            let frame = FrameParams { time, dt: 1.0 / 60.0, alpha: 1.0 };
            self.renderer.render(gl, &frame, &mut self.scene, &mut self.bullets, &mut self.stats)
        }

        fn add(&mut self, kind: &str, custom: serde_json::Value) -> SceneObjectRef {
            let obj = SceneObjectInstance::new(
                kind,
                SceneObjectData {
                    position: Vec2::new(50.0, 50.0),
                    fill: Some(Color::WHITE),
                    custom,
                    ..Default::default()
                },
            )
            .into_ref();
            self.scene.add(&obj);
            obj
        }
    }

    #[test]
    fn scene_is_one_mesh_draw() {
        let mut gl = RecordingBackend::new();
        let mut f = Fixture::new();
        let _a = f.add("circle", json!({ "radius": 10 }));
        let _b = f.add("polygon", json!({ "sides": 5, "radius": 8 }));

        f.frame(&mut gl, 0.0).unwrap();
        match gl.draws().as_slice() {
            [DrawCall::Mesh { vertex_count, textures: None, .. }] => assert!(*vertex_count > 0),
            other => panic!("unexpected draws {other:?}"),
        }
        assert_eq!(f.stats.draw_calls, 1);
        assert_eq!(f.stats.scene_objects, 2);
        assert!(f.stats.vbo_bytes >= DynamicVertexBuffer::MIN_BYTES);
    }

    #[test]
    fn sprites_load_once_and_reach_the_array() {
        let mut gl = RecordingBackend::new();
        let mut f = Fixture::new();
        let _s = f.add("sprite", json!({ "image": "images/tower.png", "width": 16, "height": 16 }));

        f.frame(&mut gl, 0.0).unwrap();
        f.frame(&mut gl, 0.1).unwrap();
        let url = "https://game.test/images/tower.png";
        assert_eq!(f.loader.borrow().requests_for(url), 1);

        f.loader.borrow_mut().complete(url, 32, 32);
        f.frame(&mut gl, 0.2).unwrap();
        assert_eq!(f.stats.textures_cached, 1);
        assert_eq!(gl.count(|op| matches!(op, Op::UploadTexture(_, 0))), 2, "2D upload plus array layer 0");

        let last_mesh = gl.draws().into_iter().rev().find_map(|d| match d {
            DrawCall::Mesh { textures, .. } => Some(textures),
            _ => None,
        });
        assert!(matches!(last_mesh, Some(Some(_))));
    }

    #[test]
    fn sprites_beyond_array_capacity_are_not_drawn() {
        let mut gl = RecordingBackend::new();
        let mut config = BastionConfig::default();
        config.sprites.max_textures = 1;
        let mut f = Fixture::with_config(config);
        let _keep = f.add("sprite", json!({ "image": "images/keep.png", "width": 16, "height": 16 }));
        let _extra = f.add("sprite", json!({ "image": "images/extra.png", "width": 16, "height": 16 }));

        f.frame(&mut gl, 0.0).unwrap();
        for name in ["keep", "extra"] {
            f.loader.borrow_mut().complete(&format!("https://game.test/images/{name}.png"), 8, 8);
        }
        f.frame(&mut gl, 0.1).unwrap();
        f.frame(&mut gl, 0.2).unwrap();

        assert_eq!(gl.count(|op| matches!(op, Op::UploadTexture(_, 1))), 0, "no layer 1 in a one-layer array");
        let last_mesh = gl.draws().into_iter().rev().find_map(|d| match d {
            DrawCall::Mesh { vertex_count, .. } => Some(vertex_count),
            _ => None,
        });
        assert_eq!(last_mesh, Some(6), "only the in-capacity sprite is drawn");
    }

    #[test]
    fn swap_context_frees_the_old_backend() {
        let mut gl1 = RecordingBackend::new();
        let mut f = Fixture::new();
        let _s = f.add("sprite", json!({ "image": "images/tower.png", "width": 16, "height": 16 }));
        let url = "https://game.test/images/tower.png";

        f.frame(&mut gl1, 0.0).unwrap();
        f.loader.borrow_mut().complete(url, 8, 8);
        f.frame(&mut gl1, 0.1).unwrap();
        assert!(!gl1.live_textures.is_empty());
        assert!(!gl1.live_buffers.is_empty());

        let mut gl2 = RecordingBackend::new();
        f.renderer.swap_context(&mut gl1, &gl2);
        assert!(gl1.live_textures.is_empty());
        assert!(gl1.live_buffers.is_empty());
        assert_eq!(f.renderer.textures().context(), Some(gl2.context_id()));

        f.frame(&mut gl2, 0.2).unwrap();
        assert_eq!(f.loader.borrow().requests_for(url), 2);
    }

    #[test]
    fn context_change_reissues_sprite_loads() {
        let mut gl = RecordingBackend::new();
        let mut f = Fixture::new();
        let _s = f.add("sprite", json!({ "image": "images/tower.png", "width": 16, "height": 16 }));
        let url = "https://game.test/images/tower.png";

        f.frame(&mut gl, 0.0).unwrap();
        f.loader.borrow_mut().complete(url, 8, 8);
        f.frame(&mut gl, 0.1).unwrap();

        let mut gl2 = RecordingBackend::new();
        f.frame(&mut gl2, 0.2).unwrap();
        assert_eq!(f.loader.borrow().requests_for(url), 2);
        f.loader.borrow_mut().complete(url, 8, 8);
        f.frame(&mut gl2, 0.3).unwrap();
        assert_eq!(f.stats.textures_cached, 1);
    }

    #[test]
    fn radiation_wraps_the_frame_when_intensity_is_set() {
        let mut gl = RecordingBackend::new();
        let mut f = Fixture::new();
        let _a = f.add("circle", json!({ "radius": 10 }));

        f.frame(&mut gl, 0.0).unwrap();
        assert_eq!(f.renderer.radiation().state(), RadiationState::Uninitialized);
        assert!(gl.count(|op| matches!(op, Op::BindRenderTarget(_))) == 0);

        f.bridge.borrow_mut().set_value("radiation.intensity", 0.7);
        gl.ops.clear();
        f.frame(&mut gl, 0.1).unwrap();
        let draws = gl.draws();
        assert!(matches!(draws.first(), Some(DrawCall::Mesh { .. })));
        assert!(matches!(draws.last(), Some(DrawCall::Fullscreen { .. })));
        assert_eq!(gl.bound_render_target(), None);
        assert_eq!(f.stats.draw_calls, 2);
    }

    #[test]
    fn bullets_draw_after_the_scene() {
        let mut gl = RecordingBackend::new();
        let mut f = Fixture::new();
        let _a = f.add("circle", json!({ "radius": 10 }));
        let h = f.bullets.acquire_slot("arrow").unwrap().unwrap();
        f.bullets.update_slot(&h, Vec2::new(5.0, 5.0), 0.0, 0.0, 2.0, true).unwrap();

        f.frame(&mut gl, 0.0).unwrap();
        assert!(matches!(gl.draws().as_slice(), [DrawCall::Mesh { .. }, DrawCall::Bullets { .. }]));
        assert_eq!(f.stats.live_bullets, 1);
        f.bullets.release_slot(h).unwrap();
    }

    #[test]
    fn unknown_atlas_is_reported_but_the_frame_still_draws() {
        let mut gl = RecordingBackend::new();
        let mut f = Fixture::new();
        let _ok = f.add("circle", json!({ "radius": 10 }));
        let _bad = f.add("sprite", json!({ "atlas": "ghost", "width": 8, "height": 8 }));

        assert!(matches!(f.frame(&mut gl, 0.0), Err(RegistrationError::Atlas(_))));
        assert_eq!(gl.draw_count(), 1);
        assert_eq!(f.stats.scene_objects, 1);
        assert!(f.frame(&mut gl, 0.1).is_ok());
    }

    #[test]
    fn particles_are_counted() {
        let mut gl = RecordingBackend::new();
        let mut f = Fixture::new();
        let _a = f.add("aura", json!({ "radius": 20, "particles": { "count": 7 } }));
        f.frame(&mut gl, 0.0).unwrap();
        assert_eq!(f.stats.particle_emitters, 1);
        assert_eq!(f.stats.particle_capacity, 7);
    }
}
