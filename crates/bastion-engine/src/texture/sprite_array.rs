use std::collections::HashSet;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::gpu::{ContextId, GpuBackend, TextureDesc, TextureId};

use super::TextureResourceManager;

/// One fixed-capacity texture array mirroring the 2D texture cache.
///
/// A cached texture lands in the layer equal to its stable dedup index, so
/// sprites can address their layer before the image has loaded. Indices past
/// capacity are skipped with a single warning.
pub struct SpriteTextureManager {
    max_textures: u32,
    texture_size: u32,

    context: Option<ContextId>,
    texture: Option<TextureId>,
    /// Allocation failed for this context; retried only after a swap.
    unavailable: bool,

    seen: HashSet<String>,
    layers_filled: u32,
    capacity_warned: bool,
}

impl SpriteTextureManager {
    pub fn new(max_textures: u32, texture_size: u32) -> Self {
        Self {
            max_textures: max_textures.max(1),
            texture_size: texture_size.max(1),
            context: None,
            texture: None,
            unavailable: false,
            seen: HashSet::new(),
            layers_filled: 0,
            capacity_warned: false,
        }
    }

    /// The array texture, once allocated for the current context.
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn max_textures(&self) -> u32 {
        self.max_textures
    }

    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    pub fn layers_filled(&self) -> u32 {
        self.layers_filled
    }

    fn reset(&mut self) {
        self.texture = None;
        self.unavailable = false;
        self.seen.clear();
        self.layers_filled = 0;
        self.capacity_warned = false;
    }

    /// Deletes the array on `gl` (if it owns it) and forgets every upload.
    pub fn dispose(&mut self, gl: &mut dyn GpuBackend) {
        if let Some(texture) = self.texture.take() {
            if self.context == Some(gl.context_id()) {
                gl.delete_texture(texture);
            }
        }
        self.reset();
        self.context = None;
    }

    fn ensure_texture(&mut self, gl: &mut dyn GpuBackend) -> Option<TextureId> {
        let id = gl.context_id();
        if self.context != Some(id) {
            if self.context.is_some() {
                log::debug!("sprite array: context changed, rebuilding");
            }
            self.reset();
            self.context = Some(id);
        }

        if self.texture.is_none() && !self.unavailable {
            let desc = TextureDesc::Array { size: self.texture_size, layers: self.max_textures };
            match gl.create_texture(desc) {
                Some(texture) => {
                    log::debug!(
                        "sprite array allocated: {} layers of {}px",
                        self.max_textures,
                        self.texture_size
                    );
                    self.texture = Some(texture);
                }
                None => {
                    log::error!("sprite array allocation failed; sprite batching disabled");
                    self.unavailable = true;
                }
            }
        }

        self.texture
    }

    /// Uploads every newly cached texture into its layer. Returns the number of uploads.
    pub fn update_from_cache(&mut self, gl: &mut dyn GpuBackend, cache: &TextureResourceManager) -> usize {
        let Some(texture) = self.ensure_texture(gl) else {
            return 0;
        };

        let mut uploads = 0;
        for path in cache.cached_paths() {
            if self.seen.contains(path) {
                continue;
            }
            let Some(entry) = cache.get(path) else { continue };
            self.seen.insert(path.clone());

            if entry.index >= self.max_textures {
                if !self.capacity_warned {
                    log::warn!(
                        "sprite array full ({} layers); {} and later textures are not batched",
                        self.max_textures,
                        path
                    );
                    self.capacity_warned = true;
                }
                continue;
            }

            let layer = fit_square(&entry.source, self.texture_size);
            gl.upload_texture(texture, entry.index, &layer);
            self.layers_filled += 1;
            uploads += 1;
        }

        uploads
    }
}

/// Scales `src` to fit a `size × size` canvas, centred on transparent padding.
pub fn fit_square(src: &RgbaImage, size: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let mut canvas = RgbaImage::new(size, size);
    if w == 0 || h == 0 || size == 0 {
        return canvas;
    }
    if (w, h) == (size, size) {
        return src.clone();
    }

    let scale = size as f32 / w.max(h) as f32;
    let fw = ((w as f32 * scale).round() as u32).clamp(1, size);
    let fh = ((h as f32 * scale).round() as u32).clamp(1, size);
    let scaled = imageops::resize(src, fw, fh, FilterType::Triangle);

    let x = (size - fw) / 2;
    let y = (size - fh) / 2;
    imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use image::Rgba;

    use crate::assets::testing::ManualImageLoader;
    use crate::assets::{AssetResolver, AssetRoot};
    use crate::gpu::testing::{Op, RecordingBackend};
    use crate::texture::TextureOptions;

    fn loaded_cache(
        gl: &mut RecordingBackend,
        paths: &[&str],
    ) -> (TextureResourceManager, Rc<RefCell<ManualImageLoader>>) {
        let loader = Rc::new(RefCell::new(ManualImageLoader::new()));
        let resolver = AssetResolver::new(AssetRoot::Web { base_url: "https://game.test".into() });
        let mut cache = TextureResourceManager::new(resolver, Box::new(Rc::clone(&loader)));
        for p in paths {
            cache.load_texture(gl, p, TextureOptions::default());
            loader.borrow_mut().complete(&format!("https://game.test/{p}"), 16, 8);
        }
        cache.pump(gl);
        (cache, loader)
    }

    #[test]
    fn layers_follow_dedup_index() {
        let mut gl = RecordingBackend::new();
        let (mut cache, loader) = loaded_cache(&mut gl, &[]);
        // b.png is indexed before anything loads, so a.png takes index 1.
        assert_eq!(cache.texture_index("images/b.png", TextureOptions::default()), 0);
        cache.load_texture(&mut gl, "images/a.png", TextureOptions::default());
        loader.borrow_mut().complete("https://game.test/images/a.png", 8, 8);
        cache.pump(&mut gl);

        let mut sprites = SpriteTextureManager::new(4, 8);
        assert_eq!(sprites.update_from_cache(&mut gl, &cache), 1);
        let tex = sprites.texture().unwrap();
        assert!(gl.ops.contains(&Op::UploadTexture(tex, 1)));
        assert!(!gl.ops.contains(&Op::UploadTexture(tex, 0)));
    }

    #[test]
    fn uploads_new_textures_once() {
        let mut gl = RecordingBackend::new();
        let (cache, _) = loaded_cache(&mut gl, &["images/a.png", "images/b.png"]);
        let mut sprites = SpriteTextureManager::new(4, 8);

        assert_eq!(sprites.update_from_cache(&mut gl, &cache), 2);
        assert_eq!(sprites.update_from_cache(&mut gl, &cache), 0);

        let tex = sprites.texture().unwrap();
        assert!(gl.ops.contains(&Op::UploadTexture(tex, 0)));
        assert!(gl.ops.contains(&Op::UploadTexture(tex, 1)));
        assert_eq!(gl.live_textures[&tex], TextureDesc::Array { size: 8, layers: 4 });
    }

    #[test]
    fn indices_past_capacity_are_skipped() {
        let mut gl = RecordingBackend::new();
        let (cache, _) = loaded_cache(&mut gl, &["a.png", "b.png", "c.png"]);
        let mut sprites = SpriteTextureManager::new(2, 8);

        assert_eq!(sprites.update_from_cache(&mut gl, &cache), 2);
        let tex = sprites.texture().unwrap();
        assert!(!gl.ops.contains(&Op::UploadTexture(tex, 2)));
        assert_eq!(sprites.layers_filled(), 2);
    }

    #[test]
    fn context_swap_rebuilds_array() {
        let mut gl1 = RecordingBackend::new();
        let (cache1, _) = loaded_cache(&mut gl1, &["a.png"]);
        let mut sprites = SpriteTextureManager::new(4, 8);
        sprites.update_from_cache(&mut gl1, &cache1);
        let old = sprites.texture().unwrap();

        sprites.dispose(&mut gl1);
        assert!(!gl1.live_textures.contains_key(&old));

        let mut gl2 = RecordingBackend::new();
        let (cache2, _) = loaded_cache(&mut gl2, &["a.png"]);
        assert_eq!(sprites.update_from_cache(&mut gl2, &cache2), 1);
        assert!(gl2.live_textures.contains_key(&sprites.texture().unwrap()));
    }

    #[test]
    fn allocation_failure_disables_quietly() {
        let mut gl = RecordingBackend::new();
        let (cache, _) = loaded_cache(&mut gl, &["a.png"]);
        gl.fail_textures = true;
        let mut sprites = SpriteTextureManager::new(4, 8);

        assert_eq!(sprites.update_from_cache(&mut gl, &cache), 0);
        assert!(sprites.texture().is_none());
    }

    #[test]
    fn fit_square_letterboxes_wide_images() {
        let src = RgbaImage::from_pixel(16, 8, Rgba([255, 255, 255, 255]));
        let out = fit_square(&src, 8);

        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(4, 0)[3], 0);
        assert_eq!(out.get_pixel(4, 7)[3], 0);
        assert_eq!(out.get_pixel(4, 4)[3], 255);
    }
}
