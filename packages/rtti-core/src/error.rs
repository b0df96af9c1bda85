//! Reflection and serialization error types.

use thiserror::Error;

use crate::types::{FieldId, FieldKind, RttiId};

/// Errors raised by the type registry, the serialization engine and the
/// layers built on top of them.
#[derive(Error, Debug, Clone)]
pub enum RttiError {
    /// Type id was never registered
    #[error("Unknown type id {type_id}")]
    UnknownType { type_id: RttiId },

    /// No registered type carries this name
    #[error("Unknown type name '{0}'")]
    UnknownTypeName(String),

    /// Type id 0 is the null-object sentinel
    #[error("Type id {type_id} is reserved")]
    ReservedTypeId { type_id: RttiId },

    /// Two different native types registered under the same id
    #[error("Type id {type_id} already registered for native type {existing}")]
    DuplicateTypeId {
        type_id: RttiId,
        existing: &'static str,
    },

    /// Descriptor factory produced a descriptor for another id
    #[error("Descriptor registered as {registered} declares id {declared}")]
    DescriptorIdMismatch { registered: RttiId, declared: RttiId },

    /// Field id declared twice in one type's own field list
    #[error("Field id {field_id} declared twice in type {type_id}")]
    DuplicateFieldId { type_id: RttiId, field_id: FieldId },

    /// Invalid descriptor shape
    #[error("Invalid descriptor for type {type_id}: {message}")]
    InvalidDescriptor { type_id: RttiId, message: String },

    /// Base links loop back onto themselves
    #[error("Base chain of type {type_id} is cyclic")]
    CyclicBaseChain { type_id: RttiId },

    /// Back-reference found while walking an object graph
    #[error("Cyclic object graph through an object of type {type_id}")]
    CyclicGraph { type_id: RttiId },

    /// Stream kind disagrees with the live descriptor
    #[error("Field {field_id} of type {type_id}: expected {expected}, stream has {found}")]
    FieldTypeMismatch {
        type_id: RttiId,
        field_id: FieldId,
        expected: FieldKind,
        found: String,
    },

    /// Accessor was handed an object or value of the wrong type
    #[error("Field {field_id} of type {type_id}: {message}")]
    AccessorMismatch {
        type_id: RttiId,
        field_id: FieldId,
        message: String,
    },

    /// Failure while processing one field, with the offending ids attached
    #[error("In field {field_id} of type {type_id}: {source}")]
    InField {
        type_id: RttiId,
        field_id: FieldId,
        #[source]
        source: Box<RttiError>,
    },

    /// Deserialized root is not of the requested concrete type
    #[error("Object of type {type_id} is not a {expected}")]
    DowncastFailed {
        type_id: RttiId,
        expected: &'static str,
    },

    /// Stream does not follow the record layout
    #[error("Malformed stream at offset {offset}: {message}")]
    Malformed { offset: usize, message: String },

    /// Stream ended before a complete record was read
    #[error("Truncated stream at offset {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    /// Stream header names a version this build cannot read
    #[error("Unsupported stream version {found}")]
    UnsupportedVersion { found: u16 },

    /// Nesting went deeper than the configured limit
    #[error("Object graph deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,

    /// No object behind a script handle
    #[error("Unknown script handle {0}")]
    UnknownHandle(u64),

    /// No field with this name along the type chain
    #[error("Type {type_id} has no field named '{name}'")]
    UnknownField { type_id: RttiId, name: String },

    /// Field exists but is not visible to scripts
    #[error("Field '{name}' of type {type_id} is not exposed to scripts")]
    FieldNotExposed { type_id: RttiId, name: String },

    /// Text format conversion error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Checksum or manifest mismatch
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    /// Disk full error during persistence
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// I/O error during persistence
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transient I/O error that may succeed on retry
    #[error("Transient I/O error: {0}")]
    TransientIoError(String),
}

impl RttiError {
    /// Wraps this error with the type and field it occurred in.
    pub fn in_field(self, type_id: RttiId, field_id: FieldId) -> Self {
        RttiError::InField {
            type_id,
            field_id,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping `InField` context layers.
    pub fn root_cause(&self) -> &RttiError {
        let mut current = self;
        while let RttiError::InField { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns the (type, field) path from the outermost field to the failure.
    pub fn field_path(&self) -> Vec<(RttiId, FieldId)> {
        let mut path = Vec::new();
        let mut current = self;
        while let RttiError::InField {
            type_id,
            field_id,
            source,
        } = current
        {
            path.push((*type_id, *field_id));
            current = source;
        }
        path
    }
}
