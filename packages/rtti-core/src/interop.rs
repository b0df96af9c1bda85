//! Narrow marshaling surface for a scripting layer.
//!
//! Scripts see objects only through opaque handles and reach fields by
//! name. Fields marked script-hidden in their descriptor are not reachable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::RttiError;
use crate::types::{
    level_view, level_view_mut, share_boxed, FieldDescriptor, FieldValue, RttiDescriptor, RttiId,
    SharedObject, TypeRegistry,
};

/// Opaque reference to an object owned by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptHandle(pub u64);

/// Handle table mapping script handles to shared objects.
#[derive(Debug)]
pub struct InteropBridge {
    registry: Arc<TypeRegistry>,
    handles: RwLock<HashMap<u64, SharedObject>>,
    next_handle: AtomicU64,
}

impl InteropBridge {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            handles: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Instantiates a default object of the named type.
    pub fn construct(&self, type_name: &str) -> Result<ScriptHandle, RttiError> {
        let descriptor = self.registry.find_by_name(type_name)?;
        self.wrap(share_boxed(descriptor.new_object()))
    }

    /// Hands an existing object to scripts.
    pub fn wrap(&self, object: SharedObject) -> Result<ScriptHandle, RttiError> {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let mut handles = self.handles.write().map_err(|_| RttiError::LockPoisoned)?;
        handles.insert(handle, object);
        Ok(ScriptHandle(handle))
    }

    pub fn object(&self, handle: ScriptHandle) -> Result<SharedObject, RttiError> {
        let handles = self.handles.read().map_err(|_| RttiError::LockPoisoned)?;
        handles
            .get(&handle.0)
            .cloned()
            .ok_or(RttiError::UnknownHandle(handle.0))
    }

    /// RTTI name of the object behind `handle`.
    pub fn type_name(&self, handle: ScriptHandle) -> Result<String, RttiError> {
        let object = self.object(handle)?;
        let type_id = object.read().map_err(|_| RttiError::LockPoisoned)?.rtti_id();
        Ok(self.registry.resolve(type_id)?.name().to_string())
    }

    pub fn get_field(&self, handle: ScriptHandle, name: &str) -> Result<FieldValue, RttiError> {
        let object = self.object(handle)?;
        let guard = object.read().map_err(|_| RttiError::LockPoisoned)?;
        let (level, field) = self.visible_field(guard.rtti_id(), name)?;
        let view = level_view(guard.as_ref(), level.id()).ok_or_else(|| {
            RttiError::InvalidDescriptor {
                type_id: guard.rtti_id(),
                message: format!("object exposes no base part for type {}", level.id()),
            }
        })?;
        field.get(view).map_err(|e| e.in_field(level.id(), field.id()))
    }

    pub fn set_field(
        &self,
        handle: ScriptHandle,
        name: &str,
        value: FieldValue,
    ) -> Result<(), RttiError> {
        let object = self.object(handle)?;
        let mut guard = object.write().map_err(|_| RttiError::LockPoisoned)?;
        let type_id = guard.rtti_id();
        let (level, field) = self.visible_field(type_id, name)?;
        if !field.accepts(&value) {
            return Err(RttiError::FieldTypeMismatch {
                type_id: level.id(),
                field_id: field.id(),
                expected: field.kind(),
                found: value.describe(),
            });
        }
        let view = level_view_mut(guard.as_mut(), level.id()).ok_or_else(|| {
            RttiError::InvalidDescriptor {
                type_id,
                message: format!("object exposes no base part for type {}", level.id()),
            }
        })?;
        field
            .set(view, value)
            .map_err(|e| e.in_field(level.id(), field.id()))
    }

    /// Drops the bridge's reference, returning the object.
    pub fn release(&self, handle: ScriptHandle) -> Result<SharedObject, RttiError> {
        let mut handles = self.handles.write().map_err(|_| RttiError::LockPoisoned)?;
        handles
            .remove(&handle.0)
            .ok_or(RttiError::UnknownHandle(handle.0))
    }

    pub fn handle_count(&self) -> usize {
        self.handles.read().map(|handles| handles.len()).unwrap_or(0)
    }

    fn visible_field(
        &self,
        type_id: RttiId,
        name: &str,
    ) -> Result<(Arc<RttiDescriptor>, FieldDescriptor), RttiError> {
        let chain = self.registry.chain(type_id)?;
        let (level, field) = chain
            .field_by_name(name)
            .ok_or_else(|| RttiError::UnknownField {
                type_id,
                name: name.to_string(),
            })?;
        if !field.is_script_visible() {
            return Err(RttiError::FieldNotExposed {
                type_id,
                name: name.to_string(),
            });
        }
        Ok((Arc::clone(level), field.clone()))
    }
}
