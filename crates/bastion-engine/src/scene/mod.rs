//! Scene objects and the registration pipeline.
//!
//! Responsibilities:
//! - hold the visual state game logic writes (`SceneObjectInstance`)
//! - cache each object's renderer output (`SceneRegistry`)
//! - produce this frame's primitives in paint order (`PrimitiveList`)

mod list;
mod object;
mod order;
mod registration;
mod registry;

pub use list::{PrimitiveItem, PrimitiveList};
pub use object::{ObjectId, SceneObjectData, SceneObjectInstance, SceneObjectRef};
pub use order::{SortKey, ZIndex};
pub use registration::{DynamicPrimitive, FrameParams, ObjectRegistration};
pub use registry::{SceneRegistry, SyncReport};
