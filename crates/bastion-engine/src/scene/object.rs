use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::coords::Vec2;
use crate::paint::{Color, Stroke};

use super::ZIndex;

/// Stable identity of a scene object for the lifetime of the process.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Visual state written by game logic and read by renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObjectData {
    pub position: Vec2,
    /// Radians.
    pub rotation: f32,
    pub z: ZIndex,
    pub fill: Option<Color>,
    pub stroke: Option<Stroke>,
    /// Renderer-specific payload. Treated as untrusted.
    pub custom: serde_json::Value,
}

impl Default for SceneObjectData {
    fn default() -> Self {
        Self {
            position: Vec2::zero(),
            rotation: 0.0,
            z: ZIndex::default(),
            fill: None,
            stroke: None,
            custom: serde_json::Value::Null,
        }
    }
}

/// A game object as the renderer sees it.
#[derive(Debug)]
pub struct SceneObjectInstance {
    id: ObjectId,
    kind: String,
    version: u64,
    previous_position: Vec2,
    data: SceneObjectData,
}

/// Shared handle owned by game logic. The render side only keeps `Weak`s.
pub type SceneObjectRef = Rc<RefCell<SceneObjectInstance>>;

impl SceneObjectInstance {
    pub fn new(kind: impl Into<String>, data: SceneObjectData) -> Self {
        Self {
            id: ObjectId::next(),
            kind: kind.into(),
            version: 0,
            previous_position: data.position,
            data,
        }
    }

    pub fn into_ref(self) -> SceneObjectRef {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Renderer lookup key (e.g. `"polygon"`, `"aura"`).
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Bumped on every [`data_mut`](Self::data_mut); registrations are rebuilt when it changes.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn data(&self) -> &SceneObjectData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut SceneObjectData {
        self.version = self.version.wrapping_add(1);
        &mut self.data
    }

    /// Moves the object without invalidating its registration.
    ///
    /// Dynamic primitives read the position every frame, so per-tick movement
    /// goes through here. The old position is kept for interpolation.
    pub fn move_to(&mut self, position: Vec2) {
        self.previous_position = self.data.position;
        self.data.position = position;
    }

    /// Position blended between the last two ticks (`alpha` in `[0, 1]`).
    pub fn position_at(&self, alpha: f32) -> Vec2 {
        self.previous_position.lerp(self.data.position, alpha.clamp(0.0, 1.0))
    }
}
