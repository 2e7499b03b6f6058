//! Primitive batching.
//!
//! Collected primitives are tessellated on the CPU into one triangle list of
//! [`MeshVertex`] and uploaded through a single growable vertex buffer, so the
//! whole scene costs one draw call.

mod batcher;
mod vbo;
mod vertex;

pub use batcher::PrimitiveBatcher;
pub use vbo::DynamicVertexBuffer;
pub use vertex::MeshVertex;
