//! Human-readable JSON rendering of object graphs.
//!
//! ```json
//! {
//!   "$type": "SphereCollider",
//!   "GameObject": { "name": "ball", "instance_id": 7 },
//!   "Collider": { "mass": 2.0 },
//!   "SphereCollider": { "radius": 0.5 }
//! }
//! ```
//!
//! Fields are grouped per type-chain level, so a derived type may reuse a
//! base field name. Missing levels and fields keep their defaults on load.
//! Non-finite floats are written as the strings `"NaN"`, `"inf"` and `"-inf"`.

use serde_json::{Map, Number, Value};

use super::{Serializer, WalkPath};
use crate::config::UnknownTypePolicy;
use crate::error::RttiError;
use crate::types::{
    level_view, level_view_mut, object_identity, share_boxed, FieldDescriptor, FieldKind,
    FieldValue, PlainType, PlainValue, Reflectable, SharedObject,
};

/// Key holding the concrete type name of a JSON object.
pub const TYPE_KEY: &str = "$type";

const NAN: &str = "NaN";
const INFINITY: &str = "inf";
const NEG_INFINITY: &str = "-inf";

impl Serializer {
    /// Renders `object` and everything reachable from it as JSON.
    pub fn to_json(&self, object: &dyn Reflectable) -> Result<Value, RttiError> {
        let mut path = WalkPath::new();
        self.object_to_json(object, &mut path, 0)
    }

    /// Builds an object graph from its JSON rendering.
    pub fn from_json(&self, value: &Value) -> Result<Box<dyn Reflectable>, RttiError> {
        self.object_from_json(value, 0)?
            .ok_or_else(|| RttiError::SerializationError("root object is null".to_string()))
    }

    fn object_to_json(
        &self,
        object: &dyn Reflectable,
        path: &mut WalkPath,
        depth: usize,
    ) -> Result<Value, RttiError> {
        self.check_depth(depth)?;
        let type_id = object.rtti_id();
        let chain = self.registry.chain(type_id)?;

        let mut json = Map::new();
        json.insert(
            TYPE_KEY.to_string(),
            Value::String(chain.concrete().name().to_string()),
        );
        for level in chain.levels() {
            let view = level_view(object, level.id()).ok_or_else(|| {
                RttiError::InvalidDescriptor {
                    type_id,
                    message: format!("object exposes no base part for type {}", level.id()),
                }
            })?;
            let mut fields = Map::new();
            for field in level.fields() {
                let value = field
                    .get(view)
                    .and_then(|value| self.value_to_json(&value, path, depth))
                    .map_err(|e| e.in_field(level.id(), field.id()))?;
                fields.insert(field.name().to_string(), value);
            }
            json.insert(level.name().to_string(), Value::Object(fields));
        }
        Ok(Value::Object(json))
    }

    fn value_to_json(
        &self,
        value: &FieldValue,
        path: &mut WalkPath,
        depth: usize,
    ) -> Result<Value, RttiError> {
        Ok(match value {
            FieldValue::Plain(plain) => plain_to_json(plain),
            FieldValue::PlainArray(values) => Value::Array(values.iter().map(plain_to_json).collect()),
            FieldValue::Pointer(pointer) => self.pointer_to_json(pointer.as_ref(), path, depth + 1)?,
            FieldValue::Value(nested) => self.object_to_json(nested.as_ref(), path, depth + 1)?,
            FieldValue::PointerArray(pointers) => Value::Array(
                pointers
                    .iter()
                    .map(|pointer| self.pointer_to_json(pointer.as_ref(), path, depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    fn pointer_to_json(
        &self,
        pointer: Option<&SharedObject>,
        path: &mut WalkPath,
        depth: usize,
    ) -> Result<Value, RttiError> {
        let Some(shared) = pointer else {
            return Ok(Value::Null);
        };
        let identity = object_identity(shared);
        if let Some((_, type_id)) = path.iter().find(|(seen, _)| *seen == identity) {
            return Err(RttiError::CyclicGraph { type_id: *type_id });
        }
        let guard = shared.read().map_err(|_| RttiError::LockPoisoned)?;
        path.push((identity, guard.rtti_id()));
        let result = self.object_to_json(guard.as_ref(), path, depth);
        path.pop();
        result
    }

    fn object_from_json(
        &self,
        value: &Value,
        depth: usize,
    ) -> Result<Option<Box<dyn Reflectable>>, RttiError> {
        self.check_depth(depth)?;
        let json = match value {
            Value::Null => return Ok(None),
            Value::Object(json) => json,
            other => {
                return Err(RttiError::SerializationError(format!(
                    "expected an object, found {}",
                    other
                )))
            }
        };
        let type_name = json.get(TYPE_KEY).and_then(Value::as_str).ok_or_else(|| {
            RttiError::SerializationError(format!("object without a \"{}\" key", TYPE_KEY))
        })?;

        let descriptor = self.registry.find_by_name(type_name)?;
        let chain = self.registry.chain(descriptor.id())?;
        let mut object = chain.concrete().new_object();

        for key in json.keys() {
            if key != TYPE_KEY && chain.levels().iter().all(|level| level.name() != key) {
                tracing::debug!(type_name, level = %key, "skipping unknown level");
            }
        }

        // Base levels are applied first, as in the binary stream.
        for level in chain.levels() {
            let Some(level_json) = json.get(level.name()) else {
                continue;
            };
            let Some(fields) = level_json.as_object() else {
                return Err(RttiError::SerializationError(format!(
                    "level {} of {} is not an object",
                    level.name(),
                    type_name
                )));
            };

            for (name, field_json) in fields {
                let Some(field) = level.field_by_name(name) else {
                    tracing::debug!(level = level.name(), field = %name, "skipping unknown field");
                    continue;
                };
                let value = match self.value_from_json(field, field_json, depth) {
                    Ok(Some(value)) => value,
                    Ok(None) => {
                        self.kind_mismatch(level.id(), field, json_shape(field_json))?;
                        continue;
                    }
                    Err(e) => return Err(e.in_field(level.id(), field.id())),
                };
                let view = level_view_mut(object.as_mut(), level.id()).ok_or_else(|| {
                    RttiError::InvalidDescriptor {
                        type_id: descriptor.id(),
                        message: format!("object exposes no base part for type {}", level.id()),
                    }
                })?;
                field
                    .set(view, value)
                    .map_err(|e| e.in_field(level.id(), field.id()))?;
            }
        }
        Ok(Some(object))
    }

    /// Converts one field; `Ok(None)` means the JSON shape does not fit the field.
    fn value_from_json(
        &self,
        field: &FieldDescriptor,
        json: &Value,
        depth: usize,
    ) -> Result<Option<FieldValue>, RttiError> {
        Ok(match field.kind() {
            FieldKind::Plain => field
                .plain_type()
                .and_then(|plain_type| plain_from_json(plain_type, json))
                .map(FieldValue::Plain),
            FieldKind::PlainArray => {
                let (Some(plain_type), Some(items)) = (field.plain_type(), json.as_array()) else {
                    return Ok(None);
                };
                items
                    .iter()
                    .map(|item| plain_from_json(plain_type, item))
                    .collect::<Option<Vec<_>>>()
                    .map(FieldValue::PlainArray)
            }
            FieldKind::ReflectablePointer => {
                Some(FieldValue::Pointer(self.pointer_from_json(json, depth + 1)?))
            }
            FieldKind::ReflectableValue => match self.object_from_json(json, depth + 1)? {
                Some(nested) => Some(FieldValue::Value(nested)),
                None => None,
            },
            FieldKind::ReflectablePointerArray => {
                let Some(items) = json.as_array() else {
                    return Ok(None);
                };
                let pointers = items
                    .iter()
                    .map(|item| self.pointer_from_json(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Some(FieldValue::PointerArray(pointers))
            }
        })
    }

    fn pointer_from_json(
        &self,
        json: &Value,
        depth: usize,
    ) -> Result<Option<SharedObject>, RttiError> {
        match self.object_from_json(json, depth) {
            Ok(object) => Ok(object.map(share_boxed)),
            Err(RttiError::UnknownTypeName(name))
                if self.config.unknown_type_policy == UnknownTypePolicy::SubstituteNull =>
            {
                tracing::warn!(type_name = %name, "Unknown type in reference, substituting null");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn plain_to_json(value: &PlainValue) -> Value {
    match value {
        PlainValue::F32(v) => float_to_json(f64::from(*v)),
        PlainValue::F64(v) => float_to_json(*v),
        PlainValue::Vec3(v) => f32_array_to_json(v),
        PlainValue::Quat(v) => f32_array_to_json(v),
        other => serde_json::to_value(other).unwrap_or(Value::Null),
    }
}

/// Non-finite floats have no JSON number form and are written as strings.
fn float_to_json(value: f64) -> Value {
    match Number::from_f64(value) {
        Some(number) => Value::Number(number),
        None if value.is_nan() => Value::String(NAN.to_string()),
        None if value > 0.0 => Value::String(INFINITY.to_string()),
        None => Value::String(NEG_INFINITY.to_string()),
    }
}

fn f32_array_to_json(values: &[f32]) -> Value {
    Value::Array(values.iter().map(|v| float_to_json(f64::from(*v))).collect())
}

fn float_from_json(json: &Value) -> Option<f64> {
    match json {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => match text.as_str() {
            NAN => Some(f64::NAN),
            INFINITY => Some(f64::INFINITY),
            NEG_INFINITY => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn f32_array<const N: usize>(json: &Value) -> Option<[f32; N]> {
    let items = json.as_array()?;
    if items.len() != N {
        return None;
    }
    let mut array = [0.0f32; N];
    for (slot, item) in array.iter_mut().zip(items) {
        *slot = float_from_json(item)? as f32;
    }
    Some(array)
}

fn plain_from_json(plain_type: PlainType, json: &Value) -> Option<PlainValue> {
    Some(match plain_type {
        PlainType::Bool => PlainValue::Bool(json.as_bool()?),
        PlainType::I32 => PlainValue::I32(i32::try_from(json.as_i64()?).ok()?),
        PlainType::U32 => PlainValue::U32(u32::try_from(json.as_u64()?).ok()?),
        PlainType::I64 => PlainValue::I64(json.as_i64()?),
        PlainType::U64 => PlainValue::U64(json.as_u64()?),
        PlainType::F32 => PlainValue::F32(float_from_json(json)? as f32),
        PlainType::F64 => PlainValue::F64(float_from_json(json)?),
        PlainType::Str => PlainValue::Str(json.as_str()?.to_string()),
        PlainType::Vec3 => PlainValue::Vec3(f32_array(json)?),
        PlainType::Quat => PlainValue::Quat(f32_array(json)?),
    })
}

fn json_shape(json: &Value) -> String {
    match json {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "JSON boolean".to_string(),
        Value::Number(number) if Number::is_f64(number) => "JSON float".to_string(),
        Value::Number(_) => "JSON integer".to_string(),
        Value::String(_) => "JSON string".to_string(),
        Value::Array(_) => "JSON array".to_string(),
        Value::Object(_) => "JSON object".to_string(),
    }
}
