use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::primitives::Primitive;

use super::{SceneObjectInstance, SceneObjectRef};

/// Per-frame timing handed to dynamic primitives.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct FrameParams {
    /// Seconds since the renderer started.
    pub time: f32,
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Interpolation factor between the last two logic ticks.
    pub alpha: f32,
}

type Evaluator = dyn Fn(&SceneObjectInstance, &FrameParams) -> Vec<Primitive>;

/// Primitive list recomputed every frame from the live instance.
///
/// Holds only a weak reference: once game logic drops the object, evaluation
/// yields nothing.
pub struct DynamicPrimitive {
    instance: Weak<RefCell<SceneObjectInstance>>,
    eval: Box<Evaluator>,
}

impl DynamicPrimitive {
    pub fn new(
        instance: &SceneObjectRef,
        eval: impl Fn(&SceneObjectInstance, &FrameParams) -> Vec<Primitive> + 'static,
    ) -> Self {
        Self { instance: Rc::downgrade(instance), eval: Box::new(eval) }
    }

    pub fn is_alive(&self) -> bool {
        self.instance.strong_count() > 0
    }

    /// Appends this frame's primitives to `out`.
    pub fn evaluate_into(&self, frame: &FrameParams, out: &mut Vec<Primitive>) {
        let Some(instance) = self.instance.upgrade() else { return };
        // Game logic holding a mutable borrow mid-frame is a bug upstream; skip the frame.
        let Ok(instance) = instance.try_borrow() else {
            log::warn!("scene object borrowed mutably during render; skipping dynamic primitive");
            return;
        };
        out.extend((self.eval)(&instance, frame));
    }

    pub fn evaluate(&self, frame: &FrameParams) -> Vec<Primitive> {
        let mut out = Vec::new();
        self.evaluate_into(frame, &mut out);
        out
    }
}

impl fmt::Debug for DynamicPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicPrimitive").field("alive", &self.is_alive()).finish()
    }
}

/// A renderer's output for one instance.
///
/// Static primitives are in object-local space and get translated to the
/// object's interpolated position when collected, so plain movement never
/// forces a re-registration. Dynamic primitives produce world-space geometry.
#[derive(Debug, Default)]
pub struct ObjectRegistration {
    /// Computed once; reused every frame until the instance changes.
    pub static_primitives: Vec<Primitive>,
    pub dynamic_primitives: Vec<DynamicPrimitive>,
}

impl ObjectRegistration {
    /// Renders nothing. Used for malformed instances.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_static(static_primitives: Vec<Primitive>) -> Self {
        Self { static_primitives, dynamic_primitives: Vec::new() }
    }

    pub fn push_static(&mut self, primitive: Primitive) {
        self.static_primitives.push(primitive);
    }

    pub fn push_dynamic(&mut self, dynamic: DynamicPrimitive) {
        self.dynamic_primitives.push(dynamic);
    }

    pub fn is_empty(&self) -> bool {
        self.static_primitives.is_empty() && self.dynamic_primitives.is_empty()
    }
}
