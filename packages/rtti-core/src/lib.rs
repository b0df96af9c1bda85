//! Runtime type information and reflection-driven serialization.
//!
//! Provides a type registry of lazily built descriptors, a versioned binary
//! stream format for object graphs, a JSON text rendering, checksummed asset
//! persistence and a handle-based bridge for scripting layers.

pub mod config;
pub mod context;
pub mod error;
pub mod interop;
pub mod persistence;
pub mod serialization;
pub mod types;

pub use config::{RttiConfig, UnknownTypePolicy};
pub use context::{Registration, RttiContext};
pub use error::RttiError;
pub use interop::{InteropBridge, ScriptHandle};
pub use persistence::AssetStore;
pub use serialization::Serializer;
pub use types::{
    share, FieldDescriptor, FieldKind, FieldValue, PlainValue, Reflectable, RttiDescriptor,
    RttiId, RttiType, SharedObject, TypeRegistry,
};
