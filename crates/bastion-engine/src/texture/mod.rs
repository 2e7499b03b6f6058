//! Texture resources: the 2D texture / texture-array cache, sprite atlases, and
//! the fixed-capacity sprite array built from the cache.
//!
//! GPU handles stored here belong to exactly one [`ContextId`](crate::gpu::ContextId).
//! Every deferred GPU write re-checks that identity first, so a load that
//! finishes after its context (or its array texture) was replaced is a no-op.

mod atlas;
mod error;
mod request;
mod resource_manager;
mod sprite_array;

pub use atlas::{AtlasEntry, AtlasGrid, TextureAtlasRegistry, UvRect};
pub use error::{AtlasError, TextureError};
pub use request::TextureRequest;
pub use resource_manager::{
    TextureArrayEntry, TextureArrayOptions, TextureEntry, TextureOptions, TextureResourceManager,
};
pub use sprite_array::SpriteTextureManager;
