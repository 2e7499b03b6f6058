use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;
use crate::gpu::{BufferId, BufferUsage, ContextId, DrawCall, GpuBackend};

use super::{BatchKey, BulletPoolError, ResolvedVisual};

/// One bullet as the instanced shader reads it.
///
/// Shape is per batch, so it is not stored per instance.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BulletInstance {
    pub position: [f32; 2],
    pub movement_rotation: f32,
    pub visual_rotation: f32,
    pub radius: f32,
    pub tail_length: f32,
    pub tail_width: f32,
    /// 1.0 when drawn, 0.0 when the slot is free or soft-disabled.
    pub active: f32,
    pub core_color: [f32; 4],
    pub tail_color: [f32; 4],
}

impl BulletInstance {
    pub const STRIDE: u64 = std::mem::size_of::<BulletInstance>() as u64;

    pub const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32x4, // position.xy, movement_rotation, visual_rotation
        2 => Float32x4, // radius, tail_length, tail_width, active
        3 => Float32x4, // core_color
        4 => Float32x4, // tail_color
    ];
}

/// Ownership of one slot in one bullet batch.
///
/// Not `Clone`: exactly one owner may update or release a slot. Dropping a
/// handle without releasing it leaks the slot until [`BulletGpuRenderer::reset`].
#[must_use = "a dropped handle leaks its slot until the pool is reset"]
#[derive(Debug, PartialEq, Eq)]
pub struct BulletSlotHandle {
    batch: BatchKey,
    visual: Rc<str>,
    slot: u32,
    generation: u32,
}

impl BulletSlotHandle {
    #[inline]
    pub fn batch(&self) -> BatchKey {
        self.batch
    }

    #[inline]
    pub fn visual(&self) -> &str {
        &self.visual
    }

    #[inline]
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

#[derive(Debug)]
struct Batch {
    mirror: Vec<BulletInstance>,
    generations: Vec<u32>,
    free: VecDeque<u32>,
    dirty: Vec<bool>,
    dirty_slots: Vec<u32>,
    /// One past the highest slot ever handed out since the last reset.
    high_water: u32,
    live: u32,
    buffer: Option<BufferId>,
    /// Buffer creation failed for the current context.
    unavailable: bool,
    warned_full: bool,
}

impl Batch {
    fn new(capacity: u32) -> Self {
        let cap = capacity as usize;
        Self {
            mirror: vec![BulletInstance::default(); cap],
            generations: vec![0; cap],
            free: (0..capacity).collect(),
            dirty: vec![false; cap],
            dirty_slots: Vec::new(),
            high_water: 0,
            live: 0,
            buffer: None,
            unavailable: false,
            warned_full: false,
        }
    }

    fn mark_dirty(&mut self, slot: u32) {
        let flag = &mut self.dirty[slot as usize];
        if !*flag {
            *flag = true;
            self.dirty_slots.push(slot);
        }
    }

    fn mark_all_dirty(&mut self) {
        for slot in 0..self.high_water {
            self.mark_dirty(slot);
        }
    }

    fn check(&self, handle: &BulletSlotHandle) -> Result<usize, BulletPoolError> {
        let idx = handle.slot as usize;
        match self.generations.get(idx) {
            Some(&g) if g == handle.generation => Ok(idx),
            _ => Err(BulletPoolError::StaleHandle { batch: handle.batch, slot: handle.slot }),
        }
    }

    /// Uploads dirty slots, coalescing contiguous runs into one write each.
    fn write_dirty(&mut self, gl: &mut dyn GpuBackend, buffer: BufferId) -> usize {
        if self.dirty_slots.is_empty() {
            return 0;
        }
        self.dirty_slots.sort_unstable();

        let mut writes = 0;
        let mut i = 0;
        while i < self.dirty_slots.len() {
            let start = self.dirty_slots[i];
            let mut end = start + 1;
            i += 1;
            while i < self.dirty_slots.len() && self.dirty_slots[i] == end {
                end += 1;
                i += 1;
            }
            let bytes = bytemuck::cast_slice(&self.mirror[start as usize..end as usize]);
            gl.write_buffer(buffer, start as u64 * BulletInstance::STRIDE, bytes);
            writes += 1;
        }

        for &slot in &self.dirty_slots {
            self.dirty[slot as usize] = false;
        }
        self.dirty_slots.clear();
        writes
    }
}

/// Persistent, fixed-capacity instance buffers for bullets, one per [`BatchKey`].
///
/// Updates go to a CPU mirror and are uploaded by [`flush`](Self::flush) as
/// per-slot writes; buffers are never rebuilt while live. When the graphics
/// context changes the buffers are recreated from the mirror, so outstanding
/// handles stay valid.
#[derive(Debug)]
pub struct BulletGpuRenderer {
    capacity: u32,
    batches: BTreeMap<BatchKey, Batch>,
    context: Option<ContextId>,
}

impl BulletGpuRenderer {
    pub fn new(capacity_per_batch: u32) -> Self {
        Self {
            capacity: capacity_per_batch.max(1),
            batches: BTreeMap::new(),
            context: None,
        }
    }

    #[inline]
    pub fn capacity_per_batch(&self) -> u32 {
        self.capacity
    }

    /// Bullets currently holding a slot, across all batches.
    pub fn live_count(&self) -> u32 {
        self.batches.values().map(|b| b.live).sum()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Claims a slot in the batch for `visual`. Returns `None` when that batch is full.
    ///
    /// The slot starts inactive; the first [`update_slot`](Self::update_slot) makes it visible.
    pub fn acquire_slot(&mut self, visual_key: Rc<str>, visual: &ResolvedVisual) -> Option<BulletSlotHandle> {
        let capacity = self.capacity;
        let batch = self.batches.entry(visual.batch).or_insert_with(|| Batch::new(capacity));

        let Some(slot) = batch.free.pop_front() else {
            if !batch.warned_full {
                log::warn!("bullet batch {:?} is full ({capacity} slots); spawns skipped", visual.batch);
                batch.warned_full = true;
            }
            return None;
        };

        batch.mirror[slot as usize] = BulletInstance {
            position: [0.0, 0.0],
            movement_rotation: 0.0,
            visual_rotation: 0.0,
            radius: 0.0,
            tail_length: visual.tail_length,
            tail_width: visual.tail_width,
            active: 0.0,
            core_color: visual.core.to_array(),
            tail_color: visual.tail.to_array(),
        };
        batch.mark_dirty(slot);
        batch.high_water = batch.high_water.max(slot + 1);
        batch.live += 1;

        Some(BulletSlotHandle {
            batch: visual.batch,
            visual: visual_key,
            slot,
            generation: batch.generations[slot as usize],
        })
    }

    /// Writes the per-frame state of one bullet. `active = false` hides it without
    /// giving up the slot.
    pub fn update_slot(
        &mut self,
        handle: &BulletSlotHandle,
        position: Vec2,
        movement_rotation: f32,
        visual_rotation: f32,
        radius: f32,
        active: bool,
    ) -> Result<(), BulletPoolError> {
        let batch = self.batch_for(handle)?;
        let idx = batch.check(handle)?;

        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        let inst = &mut batch.mirror[idx];
        inst.position = if position.is_finite() { position.to_array() } else { [0.0, 0.0] };
        inst.movement_rotation = finite(movement_rotation);
        inst.visual_rotation = finite(visual_rotation);
        inst.radius = finite(radius).max(0.0);
        inst.active = if active { 1.0 } else { 0.0 };
        batch.mark_dirty(handle.slot);
        Ok(())
    }

    /// Returns the slot to the free list. The slot is hidden on the next flush.
    pub fn release_slot(&mut self, handle: BulletSlotHandle) -> Result<(), BulletPoolError> {
        let batch = self.batch_for(&handle)?;
        let idx = batch.check(&handle)?;

        batch.mirror[idx].active = 0.0;
        batch.generations[idx] = batch.generations[idx].wrapping_add(1);
        batch.mark_dirty(handle.slot);
        batch.free.push_back(handle.slot);
        batch.live -= 1;
        batch.warned_full = false;
        Ok(())
    }

    fn batch_for(&mut self, handle: &BulletSlotHandle) -> Result<&mut Batch, BulletPoolError> {
        self.batches
            .get_mut(&handle.batch)
            .ok_or(BulletPoolError::StaleHandle { batch: handle.batch, slot: handle.slot })
    }

    /// Frees every slot and invalidates all outstanding handles.
    pub fn reset(&mut self) {
        for batch in self.batches.values_mut() {
            for g in &mut batch.generations {
                *g = g.wrapping_add(1);
            }
            batch.mirror.fill(BulletInstance::default());
            batch.free = (0..self.capacity).collect();
            for &slot in &batch.dirty_slots {
                batch.dirty[slot as usize] = false;
            }
            batch.dirty_slots.clear();
            batch.high_water = 0;
            batch.live = 0;
            batch.warned_full = false;
        }
        log::debug!("bullet pool reset");
    }

    /// Uploads pending slot writes. Returns the number of `write_buffer` calls.
    pub fn flush(&mut self, gl: &mut dyn GpuBackend) -> usize {
        let ctx = gl.context_id();
        if self.context != Some(ctx) {
            if self.context.is_some() {
                log::info!("bullet pool: graphics context changed, re-uploading {} batches", self.batches.len());
            }
            for batch in self.batches.values_mut() {
                batch.buffer = None;
                batch.unavailable = false;
            }
            self.context = Some(ctx);
        }

        let size = self.capacity as u64 * BulletInstance::STRIDE;
        let mut writes = 0;
        for (key, batch) in &mut self.batches {
            if batch.buffer.is_none() && !batch.unavailable {
                match gl.create_buffer(BufferUsage::Instance, size) {
                    Some(buffer) => {
                        batch.buffer = Some(buffer);
                        batch.mark_all_dirty();
                    }
                    None => {
                        log::error!("bullet batch {key:?}: instance buffer allocation failed ({size} bytes)");
                        batch.unavailable = true;
                    }
                }
            }
            if let Some(buffer) = batch.buffer {
                writes += batch.write_dirty(gl, buffer);
            }
        }
        writes
    }

    /// Issues one instanced draw per non-empty batch. Returns the number of draws.
    pub fn draw(&self, gl: &mut dyn GpuBackend) -> u32 {
        if self.context != Some(gl.context_id()) {
            return 0;
        }
        let mut draws = 0;
        for (key, batch) in &self.batches {
            let Some(buffer) = batch.buffer else { continue };
            if batch.live == 0 {
                continue;
            }
            gl.draw(&DrawCall::Bullets {
                instances: buffer,
                instance_count: batch.high_water,
                batch: *key,
            });
            draws += 1;
        }
        draws
    }

    /// Deletes the instance buffers. CPU state survives; the next flush re-uploads.
    pub fn dispose(&mut self, gl: &mut dyn GpuBackend) {
        let same_context = self.context == Some(gl.context_id());
        for batch in self.batches.values_mut() {
            if let Some(buffer) = batch.buffer.take() {
                if same_context {
                    gl.delete_buffer(buffer);
                }
            }
            batch.unavailable = false;
        }
    }
}
