use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::{Rc, Weak};

use crate::primitives::Primitive;
use crate::renderers::{ObjectRenderer, RegistrationCtx, RegistrationError, RendererRegistry};

use super::{FrameParams, ObjectId, ObjectRegistration, PrimitiveList, SceneObjectInstance, SceneObjectRef};

struct Entry {
    instance: Weak<RefCell<SceneObjectInstance>>,
    registration: Option<ObjectRegistration>,
    registered_version: u64,
    dirty: bool,
}

/// Outcome of one [`SceneRegistry::sync`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Instances (re)registered this call.
    pub registered: usize,
    /// Entries dropped because their instance died or was removed.
    pub dropped: usize,
}

/// Tracks scene objects and their cached registrations.
///
/// Objects are iterated in id order, which is creation order.
#[derive(Default)]
pub struct SceneRegistry {
    entries: BTreeMap<ObjectId, Entry>,
    removed: Vec<ObjectId>,
    warned_kinds: HashSet<String>,
    scratch: Vec<Primitive>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `instance`. It is registered on the next [`sync`](Self::sync).
    pub fn add(&mut self, instance: &SceneObjectRef) -> ObjectId {
        let id = instance.borrow().id();
        self.entries.insert(
            id,
            Entry {
                instance: Rc::downgrade(instance),
                registration: None,
                registered_version: 0,
                dirty: true,
            },
        );
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        let existed = self.entries.remove(&id).is_some();
        if existed {
            self.removed.push(id);
        }
        existed
    }

    /// Forces re-registration on the next sync.
    pub fn mark_dirty(&mut self, id: ObjectId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Registers new, dirty and version-changed instances and drops dead ones.
    ///
    /// A renderer error (unknown atlas) evicts that object and is returned
    /// after every other entry has been processed.
    pub fn sync(
        &mut self,
        renderers: &RendererRegistry,
        ctx: &mut RegistrationCtx<'_>,
    ) -> Result<SyncReport, RegistrationError> {
        let mut report = SyncReport { dropped: self.removed.len(), ..Default::default() };
        for id in self.removed.drain(..) {
            ctx.emitters.forget(id);
        }

        let mut failed: Vec<ObjectId> = Vec::new();
        let mut first_error = None;

        self.entries.retain(|&id, entry| {
            let Some(instance) = entry.instance.upgrade() else {
                ctx.emitters.forget(id);
                report.dropped += 1;
                return false;
            };

            // Held mutably elsewhere: retried next frame.
            let (version, kind) = match instance.try_borrow() {
                Ok(inst) => (inst.version(), inst.kind().to_string()),
                Err(_) => return true,
            };
            let stale = entry.registration.is_none()
                || entry.dirty
                || entry.registered_version != version;
            if !stale {
                return true;
            }

            let registration = match renderers.get(&kind) {
                Some(renderer) => match renderer.register(&instance, ctx) {
                    Ok(reg) => reg,
                    Err(err) => {
                        log::error!("failed to register scene object {} ({kind}): {err}", id.raw());
                        failed.push(id);
                        first_error.get_or_insert(err);
                        return false;
                    }
                },
                None => {
                    if self.warned_kinds.insert(kind.clone()) {
                        log::warn!("no renderer for scene object kind `{kind}`; not drawn");
                    }
                    ObjectRegistration::empty()
                }
            };

            entry.registration = Some(registration);
            entry.registered_version = version;
            entry.dirty = false;
            report.registered += 1;
            true
        });

        for id in failed {
            ctx.emitters.forget(id);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Emits every live object's primitives into `out`. Returns how many were pushed.
    pub fn collect(&mut self, frame: &FrameParams, out: &mut PrimitiveList) -> usize {
        let before = out.len();

        for entry in self.entries.values() {
            let Some(registration) = &entry.registration else { continue };
            let Some(instance) = entry.instance.upgrade() else { continue };
            let Ok(inst) = instance.try_borrow() else { continue };
            let origin = inst.position_at(frame.alpha);
            let z = inst.data().z;
            drop(inst);

            for primitive in &registration.static_primitives {
                let mut p = primitive.clone();
                p.translate(origin);
                out.push(z, p);
            }

            self.scratch.clear();
            for dynamic in &registration.dynamic_primitives {
                dynamic.evaluate_into(frame, &mut self.scratch);
            }
            out.extend(z, self.scratch.drain(..));
        }

        out.len() - before
    }
}
