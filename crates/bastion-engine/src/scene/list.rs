use crate::primitives::Primitive;

use super::{SortKey, ZIndex};

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveItem {
    pub key: SortKey,
    pub primitive: Primitive,
}

/// Primitives collected for one frame.
///
/// - `push()` is O(1)
/// - paint-order iteration reuses an internal index buffer; no per-frame
///   allocation once warmed
#[derive(Debug, Default)]
pub struct PrimitiveList {
    items: Vec<PrimitiveItem>,
    next_order: u32,

    sorted_indices: Vec<usize>,
    sorted_dirty: bool,
}

impl PrimitiveList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops recorded items, keeping capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
        self.next_order = 0;
        self.sorted_indices.clear();
        self.sorted_dirty = true;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in submission order.
    #[inline]
    pub fn items(&self) -> &[PrimitiveItem] {
        &self.items
    }

    /// Records `primitive` on layer `z`. Empty primitives are dropped here.
    pub fn push(&mut self, z: ZIndex, primitive: Primitive) {
        if primitive.is_empty() {
            return;
        }
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        self.items.push(PrimitiveItem { key: SortKey::new(z, order), primitive });
        self.sorted_dirty = true;
    }

    pub fn extend(&mut self, z: ZIndex, primitives: impl IntoIterator<Item = Primitive>) {
        for p in primitives {
            self.push(z, p);
        }
    }

    /// Iterates back-to-front.
    pub fn iter_in_paint_order(&mut self) -> impl Iterator<Item = &PrimitiveItem> {
        if self.sorted_dirty {
            self.sorted_indices.clear();
            self.sorted_indices.extend(0..self.items.len());
            let items = &self.items;
            self.sorted_indices.sort_by_key(|&i| items[i].key);
            self.sorted_dirty = false;
        }
        self.sorted_indices.iter().map(|&i| &self.items[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::paint::Color;
    use crate::primitives::{circle, Fill};

    fn dot(x: f32) -> Primitive {
        circle(Vec2::new(x, 0.0), 1.0, Fill::Solid(Color::WHITE), None)
    }

    #[test]
    fn paint_order_is_layer_then_submission() {
        let mut list = PrimitiveList::new();
        list.push(ZIndex::EFFECTS, dot(0.0));
        list.push(ZIndex::GROUND, dot(1.0));
        list.push(ZIndex::EFFECTS, dot(2.0));
        list.push(ZIndex::GROUND, dot(3.0));

        let xs: Vec<f32> = list
            .iter_in_paint_order()
            .map(|item| match &item.primitive {
                Primitive::Circle { center, .. } => center.x,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(xs, vec![1.0, 3.0, 0.0, 2.0]);
    }

    #[test]
    fn empty_primitives_are_not_recorded() {
        let mut list = PrimitiveList::new();
        list.push(ZIndex::GROUND, circle(Vec2::zero(), 0.0, Fill::Solid(Color::WHITE), None));
        assert!(list.is_empty());
    }

    #[test]
    fn clear_keeps_working() {
        let mut list = PrimitiveList::new();
        list.push(ZIndex::GROUND, dot(0.0));
        assert_eq!(list.iter_in_paint_order().count(), 1);
        list.clear();
        list.push(ZIndex::GROUND, dot(1.0));
        list.push(ZIndex::GROUND, dot(2.0));
        assert_eq!(list.iter_in_paint_order().count(), 2);
    }
}
