use std::fmt;

use serde::Serialize;

use crate::error::RttiError;
use crate::serialization::stream::{put_u32, StreamReader};

/// Primitive value types that plain fields may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlainType {
    Bool,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Str,
    Vec3,
    Quat,
}

impl PlainType {
    /// Tag byte written in front of every plain value.
    pub fn tag(self) -> u8 {
        match self {
            PlainType::Bool => 1,
            PlainType::I32 => 2,
            PlainType::U32 => 3,
            PlainType::I64 => 4,
            PlainType::U64 => 5,
            PlainType::F32 => 6,
            PlainType::F64 => 7,
            PlainType::Str => 8,
            PlainType::Vec3 => 9,
            PlainType::Quat => 10,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => PlainType::Bool,
            2 => PlainType::I32,
            3 => PlainType::U32,
            4 => PlainType::I64,
            5 => PlainType::U64,
            6 => PlainType::F32,
            7 => PlainType::F64,
            8 => PlainType::Str,
            9 => PlainType::Vec3,
            10 => PlainType::Quat,
            _ => return None,
        })
    }
}

impl fmt::Display for PlainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlainType::Bool => "bool",
            PlainType::I32 => "i32",
            PlainType::U32 => "u32",
            PlainType::I64 => "i64",
            PlainType::U64 => "u64",
            PlainType::F32 => "f32",
            PlainType::F64 => "f64",
            PlainType::Str => "string",
            PlainType::Vec3 => "vec3",
            PlainType::Quat => "quat",
        };
        f.write_str(name)
    }
}

/// A type-erased plain value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlainValue {
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Vec3([f32; 3]),
    Quat([f32; 4]),
}

impl PlainValue {
    pub fn plain_type(&self) -> PlainType {
        match self {
            PlainValue::Bool(_) => PlainType::Bool,
            PlainValue::I32(_) => PlainType::I32,
            PlainValue::U32(_) => PlainType::U32,
            PlainValue::I64(_) => PlainType::I64,
            PlainValue::U64(_) => PlainType::U64,
            PlainValue::F32(_) => PlainType::F32,
            PlainValue::F64(_) => PlainType::F64,
            PlainValue::Str(_) => PlainType::Str,
            PlainValue::Vec3(_) => PlainType::Vec3,
            PlainValue::Quat(_) => PlainType::Quat,
        }
    }

    /// Writes the tag byte followed by the little-endian value.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.plain_type().tag());
        match self {
            PlainValue::Bool(v) => out.push(u8::from(*v)),
            PlainValue::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            PlainValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            PlainValue::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            PlainValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            PlainValue::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            PlainValue::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
            PlainValue::Str(v) => {
                put_u32(out, v.len() as u32);
                out.extend_from_slice(v.as_bytes());
            }
            PlainValue::Vec3(v) => {
                for component in v {
                    out.extend_from_slice(&component.to_le_bytes());
                }
            }
            PlainValue::Quat(v) => {
                for component in v {
                    out.extend_from_slice(&component.to_le_bytes());
                }
            }
        }
    }

    /// Reads one tagged value.
    pub fn decode(reader: &mut StreamReader<'_>) -> Result<Self, RttiError> {
        let offset = reader.offset();
        let tag = reader.read_u8()?;
        let plain_type = PlainType::from_tag(tag).ok_or_else(|| RttiError::Malformed {
            offset,
            message: format!("unknown plain value tag {}", tag),
        })?;

        Ok(match plain_type {
            PlainType::Bool => match reader.read_u8()? {
                0 => PlainValue::Bool(false),
                1 => PlainValue::Bool(true),
                other => {
                    return Err(RttiError::Malformed {
                        offset: offset + 1,
                        message: format!("invalid bool byte {}", other),
                    })
                }
            },
            PlainType::I32 => PlainValue::I32(i32::from_le_bytes(reader.read_array()?)),
            PlainType::U32 => PlainValue::U32(reader.read_u32()?),
            PlainType::I64 => PlainValue::I64(i64::from_le_bytes(reader.read_array()?)),
            PlainType::U64 => PlainValue::U64(u64::from_le_bytes(reader.read_array()?)),
            PlainType::F32 => PlainValue::F32(reader.read_f32()?),
            PlainType::F64 => PlainValue::F64(f64::from_le_bytes(reader.read_array()?)),
            PlainType::Str => {
                let len = reader.read_u32()? as usize;
                let start = reader.offset();
                let bytes = reader.take(len)?;
                let text = std::str::from_utf8(bytes).map_err(|e| RttiError::Malformed {
                    offset: start,
                    message: format!("invalid UTF-8 in string: {}", e),
                })?;
                PlainValue::Str(text.to_string())
            }
            PlainType::Vec3 => PlainValue::Vec3([
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ]),
            PlainType::Quat => PlainValue::Quat([
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ]),
        })
    }
}

/// Rust types that can back a plain field.
pub trait PlainField: Clone + Send + Sync + 'static {
    const PLAIN_TYPE: PlainType;

    fn to_plain(&self) -> PlainValue;

    /// Converts back, returning `None` when the value holds another type.
    fn from_plain(value: PlainValue) -> Option<Self>;
}

macro_rules! impl_plain_field {
    ($ty:ty, $variant:ident) => {
        impl PlainField for $ty {
            const PLAIN_TYPE: PlainType = PlainType::$variant;

            fn to_plain(&self) -> PlainValue {
                PlainValue::$variant(self.clone())
            }

            fn from_plain(value: PlainValue) -> Option<Self> {
                match value {
                    PlainValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_plain_field!(bool, Bool);
impl_plain_field!(i32, I32);
impl_plain_field!(u32, U32);
impl_plain_field!(i64, I64);
impl_plain_field!(u64, U64);
impl_plain_field!(f32, F32);
impl_plain_field!(f64, F64);
impl_plain_field!(String, Str);
impl_plain_field!([f32; 3], Vec3);
impl_plain_field!([f32; 4], Quat);
