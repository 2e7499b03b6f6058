use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AtlasError;

/// Cell layout of a sprite sheet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasGrid {
    pub columns: u32,
    pub rows: u32,
}

impl AtlasGrid {
    pub const SINGLE: AtlasGrid = AtlasGrid { columns: 1, rows: 1 };

    pub fn new(columns: u32, rows: u32) -> Self {
        Self { columns: columns.max(1), rows: rows.max(1) }
    }

    /// `None` when the grid has more cells than a frame index can address.
    #[inline]
    pub fn cell_count(&self) -> Option<u32> {
        self.columns.max(1).checked_mul(self.rows.max(1))
    }
}

impl Default for AtlasGrid {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Normalized texture-space rectangle (origin top-left).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect { u0: 0.0, v0: 0.0, u1: 1.0, v1: 1.0 };

    /// Interpolates inside the rect; `(0,0)` is the top-left corner.
    #[inline]
    pub fn at(&self, s: f32, t: f32) -> [f32; 2] {
        [self.u0 + (self.u1 - self.u0) * s, self.v0 + (self.v1 - self.v0) * t]
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtlasEntry {
    pub id: String,
    pub image_path: String,
    pub grid: AtlasGrid,
    /// Assigned on first registration; never changes.
    pub index: u32,
}

impl AtlasEntry {
    /// UV rect of `frame`, row-major, wrapping past the last cell.
    pub fn frame_uv(&self, frame: u32) -> UvRect {
        let AtlasGrid { columns, rows } = self.grid;
        let (columns, rows) = (columns.max(1), rows.max(1));
        let cell = (u64::from(frame) % (u64::from(columns) * u64::from(rows))) as u32;
        let (col, row) = (cell % columns, cell / columns);
        let (w, h) = (1.0 / columns as f32, 1.0 / rows as f32);
        UvRect {
            u0: col as f32 * w,
            v0: row as f32 * h,
            u1: (col + 1) as f32 * w,
            v1: (row + 1) as f32 * h,
        }
    }
}

/// Named sprite sheets. Registration is first-wins.
#[derive(Debug, Default)]
pub struct TextureAtlasRegistry {
    entries: HashMap<String, AtlasEntry>,
    next_index: u32,
}

impl TextureAtlasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` and returns its index. Re-registering keeps the first entry.
    pub fn register(&mut self, id: &str, image_path: &str, grid: AtlasGrid) -> Result<u32, AtlasError> {
        if let Some(existing) = self.entries.get(id) {
            if existing.grid != grid || existing.image_path != image_path {
                log::debug!("atlas {id} already registered; keeping the original layout");
            }
            return Ok(existing.index);
        }
        if grid.cell_count().is_none() {
            return Err(AtlasError::GridTooLarge(id.to_string()));
        }

        let index = self.next_index;
        self.next_index += 1;
        self.entries.insert(
            id.to_string(),
            AtlasEntry { id: id.to_string(), image_path: image_path.to_string(), grid, index },
        );
        Ok(index)
    }

    pub fn resolve(&self, id: &str) -> Result<&AtlasEntry, AtlasError> {
        self.entries.get(id).ok_or_else(|| AtlasError::UnknownAtlas(id.to_string()))
    }

    pub fn frame_uv(&self, id: &str, frame: u32) -> Result<UvRect, AtlasError> {
        Ok(self.resolve(id)?.frame_uv(frame))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AtlasEntry> {
        self.entries.values()
    }
}
