use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::plain::{PlainType, PlainValue};
use super::{FieldId, Reflectable, SharedObject};
use crate::error::RttiError;

/// Semantic kind of a reflected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    /// Primitive value, no recursion
    Plain,
    /// Shared, nullable reference to another reflectable object
    ReflectablePointer,
    /// Embedded reflectable value owned by the field
    ReflectableValue,
    /// Ordered sequence of primitive values
    PlainArray,
    /// Ordered sequence of nullable reflectable references
    ReflectablePointerArray,
}

impl FieldKind {
    pub fn tag(self) -> u8 {
        match self {
            FieldKind::Plain => 1,
            FieldKind::ReflectablePointer => 2,
            FieldKind::ReflectableValue => 3,
            FieldKind::PlainArray => 4,
            FieldKind::ReflectablePointerArray => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => FieldKind::Plain,
            2 => FieldKind::ReflectablePointer,
            3 => FieldKind::ReflectableValue,
            4 => FieldKind::PlainArray,
            5 => FieldKind::ReflectablePointerArray,
            _ => return None,
        })
    }

    pub fn is_array(self) -> bool {
        matches!(self, FieldKind::PlainArray | FieldKind::ReflectablePointerArray)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Plain => "plain",
            FieldKind::ReflectablePointer => "reflectable pointer",
            FieldKind::ReflectableValue => "reflectable value",
            FieldKind::PlainArray => "plain array",
            FieldKind::ReflectablePointerArray => "reflectable pointer array",
        };
        f.write_str(name)
    }
}

/// A type-erased field value as moved through accessors.
#[derive(Debug)]
pub enum FieldValue {
    Plain(PlainValue),
    Pointer(Option<SharedObject>),
    Value(Box<dyn Reflectable>),
    PlainArray(Vec<PlainValue>),
    PointerArray(Vec<Option<SharedObject>>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Plain(_) => FieldKind::Plain,
            FieldValue::Pointer(_) => FieldKind::ReflectablePointer,
            FieldValue::Value(_) => FieldKind::ReflectableValue,
            FieldValue::PlainArray(_) => FieldKind::PlainArray,
            FieldValue::PointerArray(_) => FieldKind::ReflectablePointerArray,
        }
    }

    /// Short description used in mismatch diagnostics.
    pub fn describe(&self) -> String {
        match self {
            FieldValue::Plain(value) => format!("plain {}", value.plain_type()),
            FieldValue::PlainArray(values) => match values.first() {
                Some(value) => format!("plain array of {}", value.plain_type()),
                None => "plain array".to_string(),
            },
            other => other.kind().to_string(),
        }
    }
}

/// Reads a field from the level view of an object.
pub type FieldGetter = dyn Fn(&dyn Reflectable) -> Result<FieldValue, RttiError> + Send + Sync;

/// Writes a field into the level view of an object.
pub type FieldSetter = dyn Fn(&mut dyn Reflectable, FieldValue) -> Result<(), RttiError> + Send + Sync;

/// Describes one reflected field of a type.
///
/// Owned by its [`RttiDescriptor`](super::RttiDescriptor). Accessors receive
/// the part of the object that the owning descriptor describes, never the
/// whole derived object.
#[derive(Clone)]
pub struct FieldDescriptor {
    id: FieldId,
    name: &'static str,
    kind: FieldKind,
    plain_type: Option<PlainType>,
    script_visible: bool,
    getter: Arc<FieldGetter>,
    setter: Arc<FieldSetter>,
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("plain_type", &self.plain_type)
            .field("script_visible", &self.script_visible)
            .finish_non_exhaustive()
    }
}

impl FieldDescriptor {
    /// Creates a field descriptor from raw accessors.
    ///
    /// `plain_type` is required for `Plain` and `PlainArray` fields and
    /// ignored otherwise. Most code uses the typed
    /// [`DescriptorBuilder`](super::DescriptorBuilder) methods instead.
    pub fn new(
        id: FieldId,
        name: &'static str,
        kind: FieldKind,
        plain_type: Option<PlainType>,
        getter: impl Fn(&dyn Reflectable) -> Result<FieldValue, RttiError> + Send + Sync + 'static,
        setter: impl Fn(&mut dyn Reflectable, FieldValue) -> Result<(), RttiError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let plain_type = match kind {
            FieldKind::Plain | FieldKind::PlainArray => plain_type,
            _ => None,
        };
        Self {
            id,
            name,
            kind,
            plain_type,
            script_visible: true,
            getter: Arc::new(getter),
            setter: Arc::new(setter),
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Element type of plain and plain-array fields.
    pub fn plain_type(&self) -> Option<PlainType> {
        self.plain_type
    }

    pub fn is_script_visible(&self) -> bool {
        self.script_visible
    }

    pub(crate) fn set_script_visible(&mut self, visible: bool) {
        self.script_visible = visible;
    }

    pub fn get(&self, object: &dyn Reflectable) -> Result<FieldValue, RttiError> {
        (self.getter)(object)
    }

    pub fn set(&self, object: &mut dyn Reflectable, value: FieldValue) -> Result<(), RttiError> {
        (self.setter)(object, value)
    }

    /// Whether `value` has the kind (and plain element type) this field holds.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        if value.kind() != self.kind {
            return false;
        }
        match value {
            FieldValue::Plain(plain) => Some(plain.plain_type()) == self.plain_type,
            FieldValue::PlainArray(values) => values
                .iter()
                .all(|plain| Some(plain.plain_type()) == self.plain_type),
            _ => true,
        }
    }
}
