//! Reflection metadata: type ids, the reflectable capability trait, field and
//! type descriptors, and the type registry.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

mod descriptor;
pub mod engine_types;
mod field;
mod plain;
mod reflectable;
mod type_registry;

pub use descriptor::{DescriptorBuilder, ObjectFactory, RttiDescriptor};
pub use engine_types::register_engine_types;
pub use field::{FieldDescriptor, FieldGetter, FieldKind, FieldSetter, FieldValue};
pub use plain::{PlainField, PlainType, PlainValue};
pub use type_registry::{DescriptorFactory, TypeChain, TypeRegistry};

/// Numeric identifier of a concrete reflectable type.
///
/// Stable within one engine build. Id 0 is reserved as the null-object
/// sentinel in streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RttiId(pub u32);

impl RttiId {
    /// Sentinel written for a null reflectable pointer.
    pub const NULL: RttiId = RttiId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for RttiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of a field within one type's own (non-inherited) field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u16);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Capability every engine object participating in reflection implements.
///
/// Single RTTI inheritance is modelled by composition: a derived type embeds
/// its base part and exposes it through `rtti_base`/`rtti_base_mut`, so the
/// serializer can hand each level of the type chain the part it describes.
/// Use the [`reflectable!`](crate::reflectable) macro instead of writing
/// this by hand.
pub trait Reflectable: Any + Send + Sync {
    /// Id of the concrete type of this object (or of this base part).
    fn rtti_id(&self) -> RttiId;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Embedded base part, if the type has an RTTI base.
    fn rtti_base(&self) -> Option<&dyn Reflectable> {
        None
    }

    fn rtti_base_mut(&mut self) -> Option<&mut dyn Reflectable> {
        None
    }
}

impl fmt::Debug for dyn Reflectable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reflectable({})", self.rtti_id())
    }
}

/// A reflectable type with a statically known id and descriptor.
pub trait RttiType: Reflectable + Sized {
    const RTTI_ID: RttiId;

    /// Builds the descriptor. Called at most once per registry.
    fn rtti_descriptor() -> RttiDescriptor;
}

/// Shared, mutable handle to a reflectable object (a reflectable pointer).
pub type SharedObject = Arc<RwLock<Box<dyn Reflectable>>>;

/// Wraps a value into a [`SharedObject`].
pub fn share<T: Reflectable>(value: T) -> SharedObject {
    Arc::new(RwLock::new(Box::new(value)))
}

/// Wraps an already boxed object into a [`SharedObject`].
pub fn share_boxed(object: Box<dyn Reflectable>) -> SharedObject {
    Arc::new(RwLock::new(object))
}

/// Identity of a shared object, used for cycle detection.
pub fn object_identity(object: &SharedObject) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

/// Downcasts to the exact concrete type.
pub fn downcast_ref<T: Reflectable>(object: &dyn Reflectable) -> Option<&T> {
    object.as_any().downcast_ref::<T>()
}

pub fn downcast_mut<T: Reflectable>(object: &mut dyn Reflectable) -> Option<&mut T> {
    object.as_any_mut().downcast_mut::<T>()
}

/// Casts to `T` where `T` is the concrete type or any base along the chain.
pub fn cast_ref<T: Reflectable>(object: &dyn Reflectable) -> Option<&T> {
    let mut current = Some(object);
    while let Some(view) = current {
        if let Some(found) = view.as_any().downcast_ref::<T>() {
            return Some(found);
        }
        current = view.rtti_base();
    }
    None
}

/// Returns the part of `object` described by the type-chain level `level`.
pub fn level_view(object: &dyn Reflectable, level: RttiId) -> Option<&dyn Reflectable> {
    let mut current = object;
    loop {
        if current.rtti_id() == level {
            return Some(current);
        }
        current = current.rtti_base()?;
    }
}

pub fn level_view_mut<'a>(
    object: &'a mut dyn Reflectable,
    level: RttiId,
) -> Option<&'a mut dyn Reflectable> {
    let mut current = object;
    loop {
        if current.rtti_id() == level {
            return Some(current);
        }
        current = current.rtti_base_mut()?;
    }
}
