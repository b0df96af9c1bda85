//! Serialization engine walking object graphs through their descriptors.
//!
//! The engine is stateless between calls. Object graphs must not be mutated
//! by other threads while a walk is in progress; shared objects are only
//! read-locked for the duration of their own record.

use std::sync::Arc;

use crate::config::{RttiConfig, UnknownTypePolicy};
use crate::error::RttiError;
use crate::types::{
    level_view, level_view_mut, object_identity, share_boxed, FieldDescriptor, FieldKind,
    FieldValue, PlainValue, Reflectable, RttiId, SharedObject, TypeRegistry,
};

pub mod inspect;
pub mod stream;
pub mod text;

use stream::{patch_u32, put_u16, put_u32, write_header, StreamReader};

/// Smallest encoded object record (a null type id).
const MIN_OBJECT_LEN: usize = 4;

/// Smallest encoded plain value (tag plus bool byte).
const MIN_PLAIN_LEN: usize = 2;

/// Serializes and deserializes reflectable object graphs.
#[derive(Debug, Clone)]
pub struct Serializer {
    registry: Arc<TypeRegistry>,
    config: RttiConfig,
}

/// Objects on the current walk path: (identity, type id).
type WalkPath = Vec<(usize, RttiId)>;

impl Serializer {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(registry, RttiConfig::default())
    }

    pub fn with_config(registry: Arc<TypeRegistry>, config: RttiConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RttiConfig {
        &self.config
    }

    /// Serializes `object` and everything reachable from it.
    ///
    /// Fails with `CyclicGraph` if a reflectable pointer leads back to an
    /// object already on the current path.
    pub fn serialize(&self, object: &dyn Reflectable) -> Result<Vec<u8>, RttiError> {
        let mut out = Vec::with_capacity(256);
        write_header(&mut out);
        let mut path = WalkPath::new();
        self.write_object(object, &mut out, &mut path, 0)?;
        Ok(out)
    }

    /// Serializes a shared root, tracking its identity for cycle detection.
    pub fn serialize_shared(&self, object: &SharedObject) -> Result<Vec<u8>, RttiError> {
        let mut out = Vec::with_capacity(256);
        write_header(&mut out);
        let mut path = WalkPath::new();
        self.write_pointer(Some(object), &mut out, &mut path, 0)?;
        Ok(out)
    }

    /// Serializes independent roots, in parallel with the `parallel` feature.
    pub fn serialize_batch(
        &self,
        objects: &[&dyn Reflectable],
    ) -> Vec<Result<Vec<u8>, RttiError>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            objects
                .par_iter()
                .map(|object| self.serialize(*object))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            objects.iter().map(|object| self.serialize(*object)).collect()
        }
    }

    /// Reconstructs the object graph stored in `bytes`.
    ///
    /// Nothing partially populated is returned: any failure drops the
    /// objects built so far.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Box<dyn Reflectable>, RttiError> {
        let mut reader = StreamReader::new(bytes);
        reader.read_header()?;
        let offset = reader.offset();
        let object = self
            .read_object(&mut reader, 0)?
            .ok_or_else(|| RttiError::Malformed {
                offset,
                message: "root object is null".to_string(),
            })?;
        if !reader.is_empty() {
            return Err(RttiError::Malformed {
                offset: reader.offset(),
                message: format!("{} trailing bytes after root object", reader.remaining()),
            });
        }
        Ok(object)
    }

    /// Deserializes and downcasts the root to `T`.
    pub fn deserialize_as<T: Reflectable>(&self, bytes: &[u8]) -> Result<T, RttiError> {
        let object = self.deserialize(bytes)?;
        let type_id = object.rtti_id();
        object
            .into_any()
            .downcast::<T>()
            .map(|concrete| *concrete)
            .map_err(|_| RttiError::DowncastFailed {
                type_id,
                expected: std::any::type_name::<T>(),
            })
    }

    fn check_depth(&self, depth: usize) -> Result<(), RttiError> {
        if depth > self.config.max_depth {
            return Err(RttiError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        Ok(())
    }

    fn write_object(
        &self,
        object: &dyn Reflectable,
        out: &mut Vec<u8>,
        path: &mut WalkPath,
        depth: usize,
    ) -> Result<(), RttiError> {
        self.check_depth(depth)?;
        let type_id = object.rtti_id();
        let chain = self.registry.chain(type_id)?;
        let level_count = u8::try_from(chain.levels().len()).map_err(|_| {
            RttiError::InvalidDescriptor {
                type_id,
                message: "type chain deeper than 255 levels".to_string(),
            }
        })?;

        put_u32(out, type_id.0);
        out.push(level_count);
        for level in chain.levels() {
            let view = level_view(object, level.id()).ok_or_else(|| {
                RttiError::InvalidDescriptor {
                    type_id,
                    message: format!("object exposes no base part for type {}", level.id()),
                }
            })?;
            put_u32(out, level.id().0);
            put_u16(out, level.field_count() as u16);

            for field in level.fields() {
                let value = field
                    .get(view)
                    .map_err(|e| e.in_field(level.id(), field.id()))?;
                put_u16(out, field.id().0);
                out.push(field.kind().tag());
                let len_at = out.len();
                put_u32(out, 0);
                self.write_value(&value, out, path, depth)
                    .map_err(|e| e.in_field(level.id(), field.id()))?;
                let len = out.len() - len_at - 4;
                patch_u32(out, len_at, len as u32);
            }
        }
        Ok(())
    }

    fn write_value(
        &self,
        value: &FieldValue,
        out: &mut Vec<u8>,
        path: &mut WalkPath,
        depth: usize,
    ) -> Result<(), RttiError> {
        match value {
            FieldValue::Plain(plain) => plain.encode(out),
            FieldValue::PlainArray(values) => {
                put_u32(out, values.len() as u32);
                for plain in values {
                    plain.encode(out);
                }
            }
            FieldValue::Pointer(pointer) => {
                self.write_pointer(pointer.as_ref(), out, path, depth + 1)?
            }
            FieldValue::Value(nested) => self.write_object(nested.as_ref(), out, path, depth + 1)?,
            FieldValue::PointerArray(pointers) => {
                put_u32(out, pointers.len() as u32);
                for pointer in pointers {
                    let len_at = out.len();
                    put_u32(out, 0);
                    self.write_pointer(pointer.as_ref(), out, path, depth + 1)?;
                    let len = out.len() - len_at - 4;
                    patch_u32(out, len_at, len as u32);
                }
            }
        }
        Ok(())
    }

    fn write_pointer(
        &self,
        pointer: Option<&SharedObject>,
        out: &mut Vec<u8>,
        path: &mut WalkPath,
        depth: usize,
    ) -> Result<(), RttiError> {
        let Some(shared) = pointer else {
            put_u32(out, RttiId::NULL.0);
            return Ok(());
        };

        let identity = object_identity(shared);
        if let Some((_, type_id)) = path.iter().find(|(seen, _)| *seen == identity) {
            return Err(RttiError::CyclicGraph { type_id: *type_id });
        }

        let guard = shared.read().map_err(|_| RttiError::LockPoisoned)?;
        path.push((identity, guard.rtti_id()));
        let result = self.write_object(guard.as_ref(), out, path, depth);
        path.pop();
        result
    }

    fn read_object(
        &self,
        reader: &mut StreamReader<'_>,
        depth: usize,
    ) -> Result<Option<Box<dyn Reflectable>>, RttiError> {
        self.check_depth(depth)?;
        let type_id = RttiId(reader.read_u32()?);
        if type_id.is_null() {
            return Ok(None);
        }

        let chain = self.registry.chain(type_id)?;
        let mut object = chain.concrete().new_object();

        let level_count = reader.read_u8()?;
        for _ in 0..level_count {
            let level_id = RttiId(reader.read_u32()?);
            let field_count = reader.read_u16()?;
            let level = chain.level(level_id);
            if level.is_none() {
                tracing::debug!(
                    %type_id,
                    %level_id,
                    "skipping fields of a base type no longer in the chain"
                );
            }

            for _ in 0..field_count {
                let field_id = crate::types::FieldId(reader.read_u16()?);
                let kind_tag = reader.read_u8()?;
                let payload_len = reader.read_u32()? as usize;
                let mut payload = reader.sub_reader(payload_len)?;

                let Some(level) = level else { continue };
                let Some(field) = level.field_by_id(field_id) else {
                    tracing::debug!(%level_id, %field_id, "skipping unknown field");
                    continue;
                };

                let found_kind = FieldKind::from_tag(kind_tag);
                if found_kind != Some(field.kind()) {
                    let found = match found_kind {
                        Some(kind) => kind.to_string(),
                        None => format!("unknown kind tag {}", kind_tag),
                    };
                    self.kind_mismatch(level_id, field, found)?;
                    continue;
                }

                let value = self
                    .read_value(field, &mut payload, depth)
                    .map_err(|e| e.in_field(level_id, field_id))?;
                if !payload.is_empty() {
                    return Err(RttiError::Malformed {
                        offset: payload.offset(),
                        message: format!("{} unread payload bytes", payload.remaining()),
                    }
                    .in_field(level_id, field_id));
                }
                if !field.accepts(&value) {
                    self.kind_mismatch(level_id, field, value.describe())?;
                    continue;
                }

                let view = level_view_mut(object.as_mut(), level_id).ok_or_else(|| {
                    RttiError::InvalidDescriptor {
                        type_id,
                        message: format!("object exposes no base part for type {}", level_id),
                    }
                })?;
                field
                    .set(view, value)
                    .map_err(|e| e.in_field(level_id, field_id))?;
            }
        }
        Ok(Some(object))
    }

    /// Skips (and logs) a field whose stream kind disagrees with the
    /// descriptor, or fails in strict mode.
    fn kind_mismatch(
        &self,
        level_id: RttiId,
        field: &FieldDescriptor,
        found: String,
    ) -> Result<(), RttiError> {
        let err = RttiError::FieldTypeMismatch {
            type_id: level_id,
            field_id: field.id(),
            expected: field.kind(),
            found,
        };
        if self.config.strict_field_kinds {
            return Err(err);
        }
        tracing::warn!("Skipping field: {}", err);
        Ok(())
    }

    fn read_value(
        &self,
        field: &FieldDescriptor,
        reader: &mut StreamReader<'_>,
        depth: usize,
    ) -> Result<FieldValue, RttiError> {
        Ok(match field.kind() {
            FieldKind::Plain => FieldValue::Plain(PlainValue::decode(reader)?),
            FieldKind::PlainArray => {
                let count = reader.read_count(MIN_PLAIN_LEN)?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(PlainValue::decode(reader)?);
                }
                FieldValue::PlainArray(values)
            }
            FieldKind::ReflectablePointer => {
                FieldValue::Pointer(self.read_pointer(reader, depth + 1)?)
            }
            FieldKind::ReflectableValue => {
                let offset = reader.offset();
                let nested = self
                    .read_object(reader, depth + 1)?
                    .ok_or_else(|| RttiError::Malformed {
                        offset,
                        message: "null reflectable value".to_string(),
                    })?;
                FieldValue::Value(nested)
            }
            FieldKind::ReflectablePointerArray => {
                let count = reader.read_count(MIN_OBJECT_LEN + 4)?;
                let mut pointers = Vec::with_capacity(count);
                for _ in 0..count {
                    let len = reader.read_u32()? as usize;
                    let mut element = reader.sub_reader(len)?;
                    pointers.push(self.read_pointer(&mut element, depth + 1)?);
                }
                FieldValue::PointerArray(pointers)
            }
        })
    }

    /// Reads one pointer payload, applying the unknown-type policy.
    ///
    /// The reader must cover exactly this object record so that a
    /// substituted record can be abandoned without desynchronizing the stream.
    fn read_pointer(
        &self,
        reader: &mut StreamReader<'_>,
        depth: usize,
    ) -> Result<Option<SharedObject>, RttiError> {
        match self.read_object(reader, depth) {
            Ok(object) => Ok(object.map(share_boxed)),
            Err(RttiError::UnknownType { type_id })
                if self.config.unknown_type_policy == UnknownTypePolicy::SubstituteNull =>
            {
                tracing::warn!(%type_id, "Unknown type in reference, substituting null");
                reader.take(reader.remaining())?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
