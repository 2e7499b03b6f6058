//! Asset URL resolution and asynchronous image decoding.
//!
//! Texture managers key their caches by the output of [`normalize_path`], so it
//! must stay pure: same input, same string, no I/O.

mod loader;
mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use loader::{ImageLoader, LoadError, LoadResult, LoadTicket, ThreadedImageLoader};
pub use resolver::{normalize_path, AssetResolver, AssetRoot};
