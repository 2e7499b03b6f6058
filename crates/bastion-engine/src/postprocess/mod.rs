//! Fullscreen post-processing passes.

mod radiation;

pub use radiation::{RadiationParams, RadiationPostProcess, RadiationState};
