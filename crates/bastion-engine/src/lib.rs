//! Bastion engine crate.
//!
//! The rendering core of a 2D tower-defense game: scene objects are turned into
//! primitive lists by per-kind renderers, tessellated into one dynamic vertex
//! buffer, and drawn together with instanced bullet batches and an optional
//! full-screen radiation pass. Everything GPU-facing goes through
//! [`gpu::GpuBackend`]; the window runtime supplies a wgpu implementation.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod config;
pub mod coords;
pub mod paint;

pub mod gpu;
pub mod assets;
pub mod texture;
pub mod primitives;
pub mod scene;
pub mod renderers;
pub mod batch;
pub mod bullets;
pub mod postprocess;
pub mod bridge;
pub mod debug;
pub mod frame;

pub use frame::FrameRenderer;
