//! Byte-level stream primitives.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! stream        := magic "RTTI" | version u16 | object
//! object        := type_id u32                       (0 = null, nothing follows)
//!                  level_count u8 | level*           (base to derived)
//! level         := level_type_id u32 | field_count u16 | field*
//! field         := field_id u16 | kind u8 | payload_len u32 | payload
//! payload       := plain                             (Plain)
//!                | count u32 | plain*                (PlainArray)
//!                | object                            (ReflectablePointer, ReflectableValue)
//!                | count u32 | (len u32 | object)*   (ReflectablePointerArray)
//! plain         := tag u8 | value bytes
//! ```

use crate::error::RttiError;

/// Leading bytes of every serialized stream.
pub const STREAM_MAGIC: [u8; 4] = *b"RTTI";

/// Format version written by this build.
pub const STREAM_VERSION: u16 = 1;

/// Size of the magic plus version header.
pub const HEADER_LEN: usize = 6;

pub fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Overwrites a previously reserved u32 at `at`.
pub fn patch_u32(out: &mut [u8], at: usize, value: u32) {
    out[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn write_header(out: &mut Vec<u8>) {
    out.extend_from_slice(&STREAM_MAGIC);
    put_u16(out, STREAM_VERSION);
}

/// Cursor over a byte slice that reports absolute offsets in errors.
#[derive(Debug, Clone)]
pub struct StreamReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], RttiError> {
        if len > self.remaining() {
            return Err(RttiError::Truncated {
                offset: self.offset(),
                needed: len - self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Splits off the next `len` bytes as their own reader.
    pub fn sub_reader(&mut self, len: usize) -> Result<StreamReader<'a>, RttiError> {
        let base = self.offset();
        let bytes = self.take(len)?;
        Ok(StreamReader {
            bytes,
            pos: 0,
            base,
        })
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], RttiError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8, RttiError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, RttiError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, RttiError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, RttiError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Reads an element count, rejecting counts the remaining bytes cannot hold.
    pub fn read_count(&mut self, min_element_size: usize) -> Result<usize, RttiError> {
        let offset = self.offset();
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_element_size) > self.remaining() {
            return Err(RttiError::Malformed {
                offset,
                message: format!(
                    "element count {} exceeds remaining {} bytes",
                    count,
                    self.remaining()
                ),
            });
        }
        Ok(count)
    }

    /// Validates the magic and version header.
    pub fn read_header(&mut self) -> Result<u16, RttiError> {
        let magic: [u8; 4] = self.read_array()?;
        if magic != STREAM_MAGIC {
            return Err(RttiError::Malformed {
                offset: 0,
                message: "missing RTTI stream magic".to_string(),
            });
        }
        let version = self.read_u16()?;
        if version != STREAM_VERSION {
            return Err(RttiError::UnsupportedVersion { found: version });
        }
        Ok(version)
    }
}
