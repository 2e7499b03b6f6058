use crate::debug::DebugStats;
use crate::gpu::{BufferId, BufferUsage, ContextId, GpuBackend};

use super::MeshVertex;

/// One vertex buffer reused across frames.
///
/// The buffer only grows: when a frame needs more than the current capacity it
/// is replaced by one sized to the next power of two (at least
/// [`MIN_BYTES`](Self::MIN_BYTES)).
#[derive(Debug, Default)]
pub struct DynamicVertexBuffer {
    buffer: Option<BufferId>,
    capacity: u64,
    context: Option<ContextId>,
    allocations: u64,
    /// Allocation failed on this context; retried only after a swap.
    unavailable: bool,
}

impl DynamicVertexBuffer {
    pub const MIN_BYTES: u64 = 4096;

    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Uploads `vertices` and returns the buffer holding them.
    ///
    /// `None` when there is nothing to draw or allocation failed.
    pub fn upload(
        &mut self,
        gl: &mut dyn GpuBackend,
        vertices: &[MeshVertex],
        stats: &mut DebugStats,
    ) -> Option<BufferId> {
        let ctx = gl.context_id();
        if self.context != Some(ctx) {
            // Handles from another context are meaningless here.
            self.buffer = None;
            self.capacity = 0;
            self.context = Some(ctx);
            self.unavailable = false;
        }
        if vertices.is_empty() || self.unavailable {
            return None;
        }

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let needed = bytes.len() as u64;
        let buffer = match self.buffer {
            Some(buffer) if needed <= self.capacity => buffer,
            current => {
                let size = needed.next_power_of_two().max(Self::MIN_BYTES);
                if let Some(old) = current {
                    gl.delete_buffer(old);
                    self.buffer = None;
                    self.capacity = 0;
                }
                let Some(buffer) = gl.create_buffer(BufferUsage::Vertex, size) else {
                    log::error!("vertex buffer allocation failed ({size} bytes); scene drawing disabled");
                    self.unavailable = true;
                    stats.vbo_bytes = 0;
                    return None;
                };
                if self.allocations > 0 {
                    stats.vbo_reallocs += 1;
                    log::debug!("vertex buffer grown to {size} bytes");
                }
                self.allocations += 1;
                self.buffer = Some(buffer);
                self.capacity = size;
                stats.vbo_bytes = size;
                buffer
            }
        };

        gl.write_buffer(buffer, 0, bytes);
        Some(buffer)
    }

    pub fn dispose(&mut self, gl: &mut dyn GpuBackend) {
        if let Some(buffer) = self.buffer.take() {
            if self.context == Some(gl.context_id()) {
                gl.delete_buffer(buffer);
            }
        }
        self.capacity = 0;
        self.unavailable = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::gpu::testing::{Op, RecordingBackend};
    use crate::paint::Color;

    fn verts(n: usize) -> Vec<MeshVertex> {
        vec![MeshVertex::solid(Vec2::zero(), Color::WHITE); n]
    }

    #[test]
    fn reuses_buffer_while_it_fits() {
        let mut gl = RecordingBackend::new();
        let mut stats = DebugStats::default();
        let mut vbo = DynamicVertexBuffer::new();

        let a = vbo.upload(&mut gl, &verts(3), &mut stats).unwrap();
        assert_eq!(stats.vbo_bytes, DynamicVertexBuffer::MIN_BYTES);
        let b = vbo.upload(&mut gl, &verts(100), &mut stats).unwrap();
        assert_eq!(a, b);
        assert_eq!(stats.vbo_reallocs, 0);
        assert_eq!(gl.count(|op| matches!(op, Op::CreateBuffer(..))), 1);
    }

    #[test]
    fn growth_doubles_to_power_of_two_and_frees_old() {
        let mut gl = RecordingBackend::new();
        let mut stats = DebugStats::default();
        let mut vbo = DynamicVertexBuffer::new();

        let first = vbo.upload(&mut gl, &verts(10), &mut stats).unwrap();
        // 200 * 36 = 7200 bytes -> 8192.
        let second = vbo.upload(&mut gl, &verts(200), &mut stats).unwrap();
        assert_ne!(first, second);
        assert_eq!(vbo.capacity(), 8192);
        assert_eq!(stats.vbo_bytes, 8192);
        assert_eq!(stats.vbo_reallocs, 1);
        assert!(gl.ops.contains(&Op::DeleteBuffer(first)));
        assert_eq!(gl.live_buffers.len(), 1);
    }

    #[test]
    fn empty_frame_uploads_nothing() {
        let mut gl = RecordingBackend::new();
        let mut vbo = DynamicVertexBuffer::new();
        assert!(vbo.upload(&mut gl, &[], &mut DebugStats::default()).is_none());
        assert!(gl.ops.is_empty());
    }

    #[test]
    fn new_context_allocates_fresh_without_deleting() {
        let mut old = RecordingBackend::new();
        let mut stats = DebugStats::default();
        let mut vbo = DynamicVertexBuffer::new();
        vbo.upload(&mut old, &verts(3), &mut stats).unwrap();

        let mut new = RecordingBackend::new();
        vbo.upload(&mut new, &verts(3), &mut stats).unwrap();
        assert_eq!(new.count(|op| matches!(op, Op::DeleteBuffer(_))), 0);
        assert_eq!(new.live_buffers.len(), 1);
    }

    #[test]
    fn allocation_failure_skips_the_frame() {
        let mut gl = RecordingBackend::new();
        gl.fail_buffers = true;
        let mut vbo = DynamicVertexBuffer::new();
        assert!(vbo.upload(&mut gl, &verts(3), &mut DebugStats::default()).is_none());
    }

    #[test]
    fn failed_allocation_is_not_retried_until_the_context_changes() {
        let mut gl = RecordingBackend::new();
        let mut stats = DebugStats::default();
        let mut vbo = DynamicVertexBuffer::new();
        gl.fail_buffers = true;
        assert!(vbo.upload(&mut gl, &verts(3), &mut stats).is_none());

        gl.fail_buffers = false;
        for _ in 0..3 {
            assert!(vbo.upload(&mut gl, &verts(3), &mut stats).is_none());
        }
        assert_eq!(gl.count(|op| matches!(op, Op::CreateBuffer(..))), 0);

        let mut fresh = RecordingBackend::new();
        assert!(vbo.upload(&mut fresh, &verts(3), &mut stats).is_some());
        assert_eq!(fresh.live_buffers.len(), 1);
    }
}
