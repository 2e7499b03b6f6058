//! Core engine-facing contracts.
//!
//! This module defines the interface between the runtime (platform loop) and
//! the game: a per-frame context that hands out the graphics backend, and the
//! `App` trait the game implements.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
