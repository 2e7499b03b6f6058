use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use image::RgbaImage;
use image::imageops::FilterType;

use crate::assets::{normalize_path, AssetResolver, ImageLoader, LoadTicket};
use crate::gpu::{ContextId, GpuBackend, TextureDesc, TextureId};

use super::{TextureError, TextureRequest};

/// Per-call options for 2D texture loads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureOptions<'a> {
    /// Directory relative paths are joined with.
    pub base_dir: Option<&'a str>,
}

/// Options for [`TextureResourceManager::load_texture_array`].
#[derive(Debug, Clone, Copy)]
pub struct TextureArrayOptions<'a> {
    /// Edge length of every layer; sources are resized to `size × size`.
    pub size: u32,
    pub base_dir: Option<&'a str>,
}

/// A resident 2D texture.
#[derive(Debug)]
pub struct TextureEntry {
    pub path: String,
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    /// Stable dedup index (see [`TextureResourceManager::texture_index`]).
    pub index: u32,
    pub context: ContextId,
    /// Decoded source pixels, kept for sprite-array rebuilds.
    pub source: Arc<RgbaImage>,
}

/// A resident texture array and the ordered sources it was built from.
#[derive(Debug, Clone)]
pub struct TextureArrayEntry {
    pub texture: TextureId,
    pub size: u32,
    pub paths: Vec<String>,
    pub context: ContextId,
    pub layers_uploaded: u32,
}

struct PendingTexture {
    ticket: LoadTicket,
    context: ContextId,
    request: TextureRequest,
}

enum Inflight {
    Texture { path: String },
    ArrayLayer { key: String, texture: TextureId, layer: u32, size: u32 },
}

/// Loads and caches textures and texture arrays for one graphics context.
///
/// Cache keys are normalized paths. Loads for the same key share one decode.
/// Switching context drops every cached handle and fails in-flight requests.
pub struct TextureResourceManager {
    resolver: AssetResolver,
    loader: Box<dyn ImageLoader>,
    context: Option<ContextId>,

    textures: HashMap<String, Rc<TextureEntry>>,
    insertion_order: Vec<String>,
    pending: HashMap<String, PendingTexture>,
    inflight: HashMap<LoadTicket, Inflight>,
    arrays: HashMap<String, TextureArrayEntry>,

    indices: HashMap<String, u32>,
    next_index: u32,
    next_ticket: u64,
}

impl TextureResourceManager {
    pub fn new(resolver: AssetResolver, loader: Box<dyn ImageLoader>) -> Self {
        Self {
            resolver,
            loader,
            context: None,
            textures: HashMap::new(),
            insertion_order: Vec::new(),
            pending: HashMap::new(),
            inflight: HashMap::new(),
            arrays: HashMap::new(),
            indices: HashMap::new(),
            next_index: 0,
            next_ticket: 1,
        }
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    /// Normalizes `path` with this manager's resolver.
    pub fn normalize(&self, path: &str, base_dir: Option<&str>) -> String {
        normalize_path(path, base_dir, &self.resolver)
    }

    /// Adopts `gl` as the current context.
    ///
    /// No-op when the context is unchanged. Otherwise every cached handle is
    /// forgotten, pending requests fail with [`TextureError::ContextChanged`],
    /// and completions still in flight become no-ops.
    ///
    /// This cannot delete the old handles: only the old backend can. Callers
    /// that still hold it must use [`swap_context`](Self::swap_context) (or
    /// [`dispose`](Self::dispose) first); otherwise the handles live until that
    /// backend is dropped.
    pub fn set_context(&mut self, gl: &dyn GpuBackend) {
        let id = gl.context_id();
        if self.context == Some(id) {
            return;
        }

        if let Some(old) = self.context {
            log::info!(
                "graphics context changed ({} -> {}); dropping {} textures, {} arrays, {} pending loads",
                old.raw(),
                id.raw(),
                self.textures.len(),
                self.arrays.len(),
                self.pending.len(),
            );
        }

        self.clear_caches();
        self.context = Some(id);
    }

    /// Deletes every GPU object owned by `gl` and empties the caches.
    ///
    /// Use this while the old context is still alive, before swapping.
    pub fn dispose(&mut self, gl: &mut dyn GpuBackend) {
        if self.context == Some(gl.context_id()) {
            for entry in self.textures.values() {
                gl.delete_texture(entry.texture);
            }
            for array in self.arrays.values() {
                gl.delete_texture(array.texture);
            }
        }
        self.clear_caches();
        self.context = None;
    }

    /// Disposes everything owned by `old`, then adopts `new`.
    pub fn swap_context(&mut self, old: &mut dyn GpuBackend, new: &dyn GpuBackend) {
        self.dispose(old);
        self.set_context(new);
    }

    fn clear_caches(&mut self) {
        for (path, pending) in self.pending.drain() {
            pending.request.resolve(Err(TextureError::ContextChanged(path)));
        }
        self.textures.clear();
        self.insertion_order.clear();
        self.inflight.clear();
        self.arrays.clear();
    }

    /// Returns the stable index for `path`, assigning the next one on first sight.
    ///
    /// Available before the texture loads, so shaders can address array layers
    /// immediately.
    pub fn texture_index(&mut self, path: &str, opts: TextureOptions<'_>) -> u32 {
        let key = self.normalize(path, opts.base_dir);
        self.index_for_key(&key)
    }

    fn index_for_key(&mut self, key: &str) -> u32 {
        if let Some(&idx) = self.indices.get(key) {
            return idx;
        }
        let idx = self.next_index;
        self.next_index += 1;
        self.indices.insert(key.to_string(), idx);
        idx
    }

    /// Requests a 2D texture.
    ///
    /// Cached entries resolve immediately; a load already in flight for the same
    /// key is shared; otherwise a decode is started and completes in [`pump`](Self::pump).
    pub fn load_texture(
        &mut self,
        gl: &mut dyn GpuBackend,
        path: &str,
        opts: TextureOptions<'_>,
    ) -> TextureRequest {
        self.set_context(gl);
        let context = gl.context_id();
        let key = self.normalize(path, opts.base_dir);

        if let Some(entry) = self.textures.get(&key).filter(|e| e.context == context) {
            return TextureRequest::ready(Rc::clone(entry));
        }

        if let Some(pending) = self.pending.get(&key) {
            if pending.context == context {
                return pending.request.clone();
            }
        }

        let ticket = self.next_ticket();
        let request = TextureRequest::pending();
        self.pending.insert(
            key.clone(),
            PendingTexture { ticket, context, request: request.clone() },
        );
        self.inflight.insert(ticket, Inflight::Texture { path: key.clone() });
        log::trace!("texture load {key} started (ticket {})", ticket.0);
        self.loader.request(ticket, &key);
        request
    }

    /// Loads (or reuses) a texture array of `paths.len()` layers.
    ///
    /// Returns the existing texture untouched when context, size and the ordered
    /// path list all match the cached entry. Otherwise the old array is deleted,
    /// a new one allocated, and each layer uploads when its image arrives.
    pub fn load_texture_array(
        &mut self,
        gl: &mut dyn GpuBackend,
        key: &str,
        paths: &[&str],
        opts: TextureArrayOptions<'_>,
    ) -> Option<TextureId> {
        self.set_context(gl);
        let context = gl.context_id();
        let normalized: Vec<String> =
            paths.iter().map(|p| self.normalize(p, opts.base_dir)).collect();

        if let Some(existing) = self.arrays.get(key) {
            if existing.context == context && existing.size == opts.size && existing.paths == normalized
            {
                return Some(existing.texture);
            }
        }

        if let Some(old) = self.arrays.remove(key) {
            if old.context == context {
                gl.delete_texture(old.texture);
            }
        }

        if normalized.is_empty() || opts.size == 0 {
            return None;
        }

        let desc = TextureDesc::Array { size: opts.size, layers: normalized.len() as u32 };
        let Some(texture) = gl.create_texture(desc) else {
            log::error!("failed to allocate texture array {key} ({} layers)", normalized.len());
            return None;
        };

        for (layer, url) in normalized.iter().enumerate() {
            let ticket = self.next_ticket();
            self.inflight.insert(
                ticket,
                Inflight::ArrayLayer {
                    key: key.to_string(),
                    texture,
                    layer: layer as u32,
                    size: opts.size,
                },
            );
            self.loader.request(ticket, url);
        }

        self.arrays.insert(
            key.to_string(),
            TextureArrayEntry { texture, size: opts.size, paths: normalized, context, layers_uploaded: 0 },
        );
        Some(texture)
    }

    /// Applies finished decodes. Call once per frame before drawing.
    ///
    /// Returns the number of GPU uploads performed.
    pub fn pump(&mut self, gl: &mut dyn GpuBackend) -> usize {
        self.set_context(gl);
        let context = gl.context_id();
        let mut uploads = 0;

        for done in self.loader.drain_completed() {
            let Some(inflight) = self.inflight.remove(&done.ticket) else {
                log::trace!("ignoring completion for retired load {}", done.url);
                continue;
            };

            match inflight {
                Inflight::Texture { path } => {
                    let Some(pending) = self.pending.remove(&path) else { continue };
                    if pending.ticket != done.ticket {
                        // A newer load owns this key; put it back.
                        self.pending.insert(path, pending);
                        continue;
                    }
                    if pending.context != context {
                        pending.request.resolve(Err(TextureError::ContextChanged(path)));
                        continue;
                    }

                    let image = match done.image {
                        Ok(image) => image,
                        Err(err) => {
                            log::warn!("texture load failed: {err}");
                            pending.request.resolve(Err(err.into()));
                            continue;
                        }
                    };

                    let (width, height) = image.dimensions();
                    let Some(texture) = gl.create_texture(TextureDesc::D2 { width, height }) else {
                        log::error!("failed to allocate GPU texture for {path}");
                        pending.request.resolve(Err(TextureError::CreateFailed(path)));
                        continue;
                    };
                    gl.upload_texture(texture, 0, &image);
                    uploads += 1;

                    let entry = Rc::new(TextureEntry {
                        index: self.index_for_key(&path),
                        path: path.clone(),
                        texture,
                        width,
                        height,
                        context,
                        source: Arc::new(image),
                    });
                    self.insertion_order.push(path.clone());
                    self.textures.insert(path, Rc::clone(&entry));
                    pending.request.resolve(Ok(entry));
                }

                Inflight::ArrayLayer { key, texture, layer, size } => {
                    let current = self
                        .arrays
                        .get_mut(&key)
                        .filter(|a| a.texture == texture && a.context == context);
                    let Some(array) = current else {
                        log::trace!("array {key} was replaced; dropping layer {layer}");
                        continue;
                    };

                    match done.image {
                        Ok(image) => {
                            let image = if image.dimensions() == (size, size) {
                                image
                            } else {
                                image::imageops::resize(&image, size, size, FilterType::Triangle)
                            };
                            gl.upload_texture(texture, layer, &image);
                            array.layers_uploaded += 1;
                            uploads += 1;
                        }
                        Err(err) => log::warn!("texture array {key} layer {layer}: {err}"),
                    }
                }
            }
        }

        uploads
    }

    /// Cached entry for an already-normalized key.
    pub fn get(&self, key: &str) -> Option<&Rc<TextureEntry>> {
        self.textures.get(key)
    }

    pub fn texture_array(&self, key: &str) -> Option<&TextureArrayEntry> {
        self.arrays.get(key)
    }

    /// Cache keys in the order their textures became resident.
    pub fn cached_paths(&self) -> &[String] {
        &self.insertion_order
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn next_ticket(&mut self) -> LoadTicket {
        let t = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        t
    }
}
