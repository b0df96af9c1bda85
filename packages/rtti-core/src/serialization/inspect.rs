//! Registry-free structural view of a serialized stream.
//!
//! Used by tooling to look at assets whose types may not be registered in
//! the current build.

use serde::Serialize;

use super::stream::StreamReader;
use crate::config::RttiConfig;
use crate::error::RttiError;
use crate::types::{FieldId, FieldKind, PlainValue, RttiId};

/// Decoded object record.
#[derive(Debug, Clone, Serialize)]
pub struct StreamObject {
    pub type_id: RttiId,
    pub levels: Vec<StreamLevel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamLevel {
    pub type_id: RttiId,
    pub fields: Vec<StreamField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamField {
    pub field_id: FieldId,
    pub payload_len: usize,
    pub value: StreamValue,
}

/// Field payload as far as it can be decoded without descriptors.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StreamValue {
    Plain(PlainValue),
    PlainArray(Vec<PlainValue>),
    Pointer(Option<Box<StreamObject>>),
    Value(Box<StreamObject>),
    PointerArray(Vec<Option<StreamObject>>),
    /// Kind tag this build does not know
    Opaque { tag: u8 },
}

/// Decodes the whole stream into a tree of records.
///
/// Nesting is limited to the default `max_depth`.
pub fn inspect(bytes: &[u8]) -> Result<Option<StreamObject>, RttiError> {
    inspect_with_limit(bytes, RttiConfig::default().max_depth)
}

/// Like [`inspect`], failing with `DepthExceeded` past `max_depth` nested records.
pub fn inspect_with_limit(
    bytes: &[u8],
    max_depth: usize,
) -> Result<Option<StreamObject>, RttiError> {
    let mut reader = StreamReader::new(bytes);
    reader.read_header()?;
    let root = read_object(&mut reader, 0, max_depth)?;
    if !reader.is_empty() {
        return Err(RttiError::Malformed {
            offset: reader.offset(),
            message: format!("{} trailing bytes after root object", reader.remaining()),
        });
    }
    Ok(root)
}

fn read_object(
    reader: &mut StreamReader<'_>,
    depth: usize,
    max_depth: usize,
) -> Result<Option<StreamObject>, RttiError> {
    if depth > max_depth {
        return Err(RttiError::DepthExceeded { limit: max_depth });
    }
    let type_id = RttiId(reader.read_u32()?);
    if type_id.is_null() {
        return Ok(None);
    }
    let level_count = reader.read_u8()?;
    let mut levels = Vec::with_capacity(level_count as usize);
    for _ in 0..level_count {
        let level_id = RttiId(reader.read_u32()?);
        let field_count = reader.read_u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let field_id = FieldId(reader.read_u16()?);
            let tag = reader.read_u8()?;
            let payload_len = reader.read_u32()? as usize;
            let mut payload = reader.sub_reader(payload_len)?;
            let value = read_value(tag, &mut payload, depth + 1, max_depth)
                .map_err(|e| e.in_field(level_id, field_id))?;
            fields.push(StreamField {
                field_id,
                payload_len,
                value,
            });
        }
        levels.push(StreamLevel {
            type_id: level_id,
            fields,
        });
    }
    Ok(Some(StreamObject { type_id, levels }))
}

fn read_value(
    tag: u8,
    reader: &mut StreamReader<'_>,
    depth: usize,
    max_depth: usize,
) -> Result<StreamValue, RttiError> {
    let Some(kind) = FieldKind::from_tag(tag) else {
        reader.take(reader.remaining())?;
        return Ok(StreamValue::Opaque { tag });
    };
    Ok(match kind {
        FieldKind::Plain => StreamValue::Plain(PlainValue::decode(reader)?),
        FieldKind::PlainArray => {
            let count = reader.read_count(2)?;
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(PlainValue::decode(reader)?);
            }
            StreamValue::PlainArray(values)
        }
        FieldKind::ReflectablePointer => {
            StreamValue::Pointer(read_object(reader, depth, max_depth)?.map(Box::new))
        }
        FieldKind::ReflectableValue => {
            let offset = reader.offset();
            let object =
                read_object(reader, depth, max_depth)?.ok_or_else(|| RttiError::Malformed {
                    offset,
                    message: "null reflectable value".to_string(),
                })?;
            StreamValue::Value(Box::new(object))
        }
        FieldKind::ReflectablePointerArray => {
            let count = reader.read_count(8)?;
            let mut elements = Vec::with_capacity(count);
            for _ in 0..count {
                let len = reader.read_u32()? as usize;
                let mut element = reader.sub_reader(len)?;
                elements.push(read_object(&mut element, depth, max_depth)?);
            }
            StreamValue::PointerArray(elements)
        }
    })
}

impl StreamObject {
    /// Number of object records in this tree, including this one.
    pub fn object_count(&self) -> usize {
        1 + self
            .levels
            .iter()
            .flat_map(|level| &level.fields)
            .map(|field| match &field.value {
                StreamValue::Pointer(Some(object)) | StreamValue::Value(object) => {
                    object.object_count()
                }
                StreamValue::PointerArray(elements) => {
                    elements.iter().flatten().map(StreamObject::object_count).sum()
                }
                _ => 0,
            })
            .sum::<usize>()
    }
}
