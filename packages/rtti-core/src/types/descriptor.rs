use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::field::{FieldDescriptor, FieldKind, FieldValue};
use super::plain::PlainField;
use super::{FieldId, Reflectable, RttiId, SharedObject};
use crate::error::RttiError;

/// Produces a default-constructed instance of a concrete type.
pub type ObjectFactory = dyn Fn() -> Box<dyn Reflectable> + Send + Sync;

/// Per-type reflection metadata: name, id, base link, own fields and factory.
///
/// The base link is an id resolved through the registry, so descriptors
/// never own each other.
#[derive(Clone)]
pub struct RttiDescriptor {
    name: String,
    id: RttiId,
    base: Option<RttiId>,
    fields: Vec<FieldDescriptor>,
    factory: Arc<ObjectFactory>,
}

impl fmt::Debug for RttiDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RttiDescriptor")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("base", &self.base)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl RttiDescriptor {
    /// Creates a descriptor with an untyped factory and no fields.
    pub fn new(
        name: impl Into<String>,
        id: RttiId,
        factory: impl Fn() -> Box<dyn Reflectable> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            id,
            base: None,
            fields: Vec::new(),
            factory: Arc::new(factory),
        }
    }

    /// Starts a typed descriptor for `T`.
    ///
    /// `factory` is the parameterless construction path used when
    /// materializing objects during deserialization.
    pub fn builder<T: Reflectable>(
        name: impl Into<String>,
        id: RttiId,
        factory: fn() -> T,
    ) -> DescriptorBuilder<T> {
        let descriptor = Self::new(name, id, move || Box::new(factory()) as Box<dyn Reflectable>);
        DescriptorBuilder {
            descriptor,
            _marker: PhantomData,
        }
    }

    pub fn with_base(mut self, base: RttiId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Stable human-readable type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> RttiId {
        self.id
    }

    pub fn base_id(&self) -> Option<RttiId> {
        self.base
    }

    /// Allocates an empty instance, ready to receive field sets.
    pub fn new_object(&self) -> Box<dyn Reflectable> {
        (self.factory)()
    }

    /// Number of fields declared by this type itself.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_by_id(&self, id: FieldId) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.id() == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Validates that the descriptor is consistent.
    pub fn validate(&self) -> Result<(), RttiError> {
        if self.id.is_null() {
            return Err(RttiError::ReservedTypeId { type_id: self.id });
        }
        if self.base == Some(self.id) {
            return Err(RttiError::CyclicBaseChain { type_id: self.id });
        }
        if self.fields.len() > u16::MAX as usize {
            return Err(RttiError::InvalidDescriptor {
                type_id: self.id,
                message: format!("{} fields exceed the per-type limit", self.fields.len()),
            });
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !seen.insert(field.id()) {
                return Err(RttiError::DuplicateFieldId {
                    type_id: self.id,
                    field_id: field.id(),
                });
            }
            let needs_plain_type = matches!(field.kind(), FieldKind::Plain | FieldKind::PlainArray);
            if needs_plain_type && field.plain_type().is_none() {
                return Err(RttiError::InvalidDescriptor {
                    type_id: self.id,
                    message: format!("plain field '{}' has no value type", field.name()),
                });
            }
        }
        Ok(())
    }
}

/// Typed builder binding field accessors of `T` at registration time.
pub struct DescriptorBuilder<T> {
    descriptor: RttiDescriptor,
    _marker: PhantomData<fn() -> T>,
}

fn view<T: Reflectable>(
    object: &dyn Reflectable,
    type_id: RttiId,
    field_id: FieldId,
) -> Result<&T, RttiError> {
    object
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| RttiError::AccessorMismatch {
            type_id,
            field_id,
            message: format!("object is not a {}", std::any::type_name::<T>()),
        })
}

fn view_mut<T: Reflectable>(
    object: &mut dyn Reflectable,
    type_id: RttiId,
    field_id: FieldId,
) -> Result<&mut T, RttiError> {
    object
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| RttiError::AccessorMismatch {
            type_id,
            field_id,
            message: format!("object is not a {}", std::any::type_name::<T>()),
        })
}

fn rejected(type_id: RttiId, field_id: FieldId, expected: &str, value: &FieldValue) -> RttiError {
    RttiError::AccessorMismatch {
        type_id,
        field_id,
        message: format!("expected {}, got {}", expected, value.describe()),
    }
}

impl<T: Reflectable> DescriptorBuilder<T> {
    pub fn base(mut self, base: RttiId) -> Self {
        self.descriptor.base = Some(base);
        self
    }

    /// Adds a plain field.
    pub fn plain<V: PlainField>(
        self,
        id: u16,
        name: &'static str,
        get: fn(&T) -> &V,
        set: fn(&mut T) -> &mut V,
    ) -> Self {
        let type_id = self.descriptor.id;
        let field_id = FieldId(id);
        let field = FieldDescriptor::new(
            field_id,
            name,
            FieldKind::Plain,
            Some(V::PLAIN_TYPE),
            move |object| {
                let this = view::<T>(object, type_id, field_id)?;
                Ok(FieldValue::Plain(get(this).to_plain()))
            },
            move |object, value| {
                let this = view_mut::<T>(object, type_id, field_id)?;
                let converted = match value {
                    FieldValue::Plain(plain) => {
                        let found = FieldValue::Plain(plain.clone());
                        V::from_plain(plain).ok_or_else(|| {
                            rejected(type_id, field_id, &V::PLAIN_TYPE.to_string(), &found)
                        })?
                    }
                    other => {
                        return Err(rejected(type_id, field_id, &V::PLAIN_TYPE.to_string(), &other))
                    }
                };
                *set(this) = converted;
                Ok(())
            },
        );
        self.push(field)
    }

    /// Adds a field holding a sequence of plain values.
    pub fn plain_array<V: PlainField>(
        self,
        id: u16,
        name: &'static str,
        get: fn(&T) -> &Vec<V>,
        set: fn(&mut T) -> &mut Vec<V>,
    ) -> Self {
        let type_id = self.descriptor.id;
        let field_id = FieldId(id);
        let field = FieldDescriptor::new(
            field_id,
            name,
            FieldKind::PlainArray,
            Some(V::PLAIN_TYPE),
            move |object| {
                let this = view::<T>(object, type_id, field_id)?;
                Ok(FieldValue::PlainArray(
                    get(this).iter().map(V::to_plain).collect(),
                ))
            },
            move |object, value| {
                let this = view_mut::<T>(object, type_id, field_id)?;
                let expected = format!("array of {}", V::PLAIN_TYPE);
                let values = match value {
                    FieldValue::PlainArray(values) => values,
                    other => return Err(rejected(type_id, field_id, &expected, &other)),
                };
                let mut converted = Vec::with_capacity(values.len());
                for plain in values {
                    let found = FieldValue::Plain(plain.clone());
                    let element = V::from_plain(plain)
                        .ok_or_else(|| rejected(type_id, field_id, &expected, &found))?;
                    converted.push(element);
                }
                *set(this) = converted;
                Ok(())
            },
        );
        self.push(field)
    }

    /// Adds a nullable shared reference to another reflectable object.
    pub fn pointer(
        self,
        id: u16,
        name: &'static str,
        get: fn(&T) -> &Option<SharedObject>,
        set: fn(&mut T) -> &mut Option<SharedObject>,
    ) -> Self {
        let type_id = self.descriptor.id;
        let field_id = FieldId(id);
        let field = FieldDescriptor::new(
            field_id,
            name,
            FieldKind::ReflectablePointer,
            None,
            move |object| {
                let this = view::<T>(object, type_id, field_id)?;
                Ok(FieldValue::Pointer(get(this).clone()))
            },
            move |object, value| {
                let this = view_mut::<T>(object, type_id, field_id)?;
                match value {
                    FieldValue::Pointer(pointer) => {
                        *set(this) = pointer;
                        Ok(())
                    }
                    other => Err(rejected(type_id, field_id, "reflectable pointer", &other)),
                }
            },
        );
        self.push(field)
    }

    /// Adds an embedded reflectable value.
    pub fn value<V: Reflectable + Clone>(
        self,
        id: u16,
        name: &'static str,
        get: fn(&T) -> &V,
        set: fn(&mut T) -> &mut V,
    ) -> Self {
        let type_id = self.descriptor.id;
        let field_id = FieldId(id);
        let field = FieldDescriptor::new(
            field_id,
            name,
            FieldKind::ReflectableValue,
            None,
            move |object| {
                let this = view::<T>(object, type_id, field_id)?;
                Ok(FieldValue::Value(Box::new(get(this).clone())))
            },
            move |object, value| {
                let this = view_mut::<T>(object, type_id, field_id)?;
                let boxed = match value {
                    FieldValue::Value(boxed) => boxed,
                    other => {
                        return Err(rejected(type_id, field_id, "reflectable value", &other))
                    }
                };
                let nested_id = boxed.rtti_id();
                let concrete = boxed.into_any().downcast::<V>().map_err(|_| {
                    RttiError::AccessorMismatch {
                        type_id,
                        field_id,
                        message: format!(
                            "value of type {} is not a {}",
                            nested_id,
                            std::any::type_name::<V>()
                        ),
                    }
                })?;
                *set(this) = *concrete;
                Ok(())
            },
        );
        self.push(field)
    }

    /// Adds a sequence of nullable shared references.
    pub fn pointer_array(
        self,
        id: u16,
        name: &'static str,
        get: fn(&T) -> &Vec<Option<SharedObject>>,
        set: fn(&mut T) -> &mut Vec<Option<SharedObject>>,
    ) -> Self {
        let type_id = self.descriptor.id;
        let field_id = FieldId(id);
        let field = FieldDescriptor::new(
            field_id,
            name,
            FieldKind::ReflectablePointerArray,
            None,
            move |object| {
                let this = view::<T>(object, type_id, field_id)?;
                Ok(FieldValue::PointerArray(get(this).clone()))
            },
            move |object, value| {
                let this = view_mut::<T>(object, type_id, field_id)?;
                match value {
                    FieldValue::PointerArray(pointers) => {
                        *set(this) = pointers;
                        Ok(())
                    }
                    other => Err(rejected(
                        type_id,
                        field_id,
                        "reflectable pointer array",
                        &other,
                    )),
                }
            },
        );
        self.push(field)
    }

    /// Hides the most recently added field from script proxies.
    pub fn script_hidden(mut self) -> Self {
        if let Some(field) = self.descriptor.fields.last_mut() {
            field.set_script_visible(false);
        }
        self
    }

    pub fn build(self) -> RttiDescriptor {
        self.descriptor
    }

    fn push(mut self, field: FieldDescriptor) -> Self {
        self.descriptor.fields.push(field);
        self
    }
}
