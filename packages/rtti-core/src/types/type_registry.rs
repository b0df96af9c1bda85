use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use super::descriptor::RttiDescriptor;
use super::field::FieldDescriptor;
use super::{RttiId, RttiType};
use crate::error::RttiError;

/// Entry point that builds a type's descriptor on first resolve.
pub type DescriptorFactory = dyn Fn() -> RttiDescriptor + Send + Sync;

/// The resolved type hierarchy of one concrete type, base first.
#[derive(Debug)]
pub struct TypeChain {
    levels: Vec<Arc<RttiDescriptor>>,
}

impl TypeChain {
    /// Descriptors from the root base down to the concrete type.
    pub fn levels(&self) -> &[Arc<RttiDescriptor>] {
        &self.levels
    }

    /// Descriptor of the concrete (most derived) type.
    pub fn concrete(&self) -> &Arc<RttiDescriptor> {
        // A chain always holds at least the concrete descriptor.
        &self.levels[self.levels.len() - 1]
    }

    pub fn level(&self, id: RttiId) -> Option<&Arc<RttiDescriptor>> {
        self.levels.iter().find(|level| level.id() == id)
    }

    pub fn contains(&self, id: RttiId) -> bool {
        self.level(id).is_some()
    }

    /// Inherited plus own fields, base fields first.
    pub fn fields(&self) -> impl Iterator<Item = (&Arc<RttiDescriptor>, &FieldDescriptor)> {
        self.levels
            .iter()
            .flat_map(|level| level.fields().iter().map(move |field| (level, field)))
    }

    pub fn field_count(&self) -> usize {
        self.levels.iter().map(|level| level.field_count()).sum()
    }

    /// Looks a field up by name, most derived level first.
    pub fn field_by_name(&self, name: &str) -> Option<(&Arc<RttiDescriptor>, &FieldDescriptor)> {
        self.levels
            .iter()
            .rev()
            .find_map(|level| level.field_by_name(name).map(|field| (level, field)))
    }
}

struct RegistryEntry {
    native: Option<(TypeId, &'static str)>,
    factory: Arc<DescriptorFactory>,
    descriptor: OnceLock<Result<Arc<RttiDescriptor>, RttiError>>,
    chain: OnceLock<Arc<TypeChain>>,
}

/// Registry mapping type ids to lazily created descriptors.
///
/// Registration only stores the factory, so types may be registered in any
/// order; base links are resolved when a chain is first requested. Descriptor
/// creation runs exactly once per entry and later resolves return the cached
/// descriptor.
#[derive(Default)]
pub struct TypeRegistry {
    entries: RwLock<HashMap<RttiId, Arc<RegistryEntry>>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("type_ids", &self.type_ids())
            .finish()
    }
}

impl TypeRegistry {
    /// Creates a new empty type registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a descriptor factory under `type_id`.
    ///
    /// Idempotent: registering an id again keeps the first factory.
    pub fn register(
        &self,
        type_id: RttiId,
        factory: impl Fn() -> RttiDescriptor + Send + Sync + 'static,
    ) -> Result<(), RttiError> {
        self.insert(type_id, None, Arc::new(factory))
    }

    /// Registers a statically typed reflectable.
    ///
    /// Registering the same type twice is a no-op; registering a different
    /// Rust type under an id already in use fails.
    pub fn register_type<T: RttiType>(&self) -> Result<(), RttiError> {
        let native = (TypeId::of::<T>(), std::any::type_name::<T>());
        self.insert(T::RTTI_ID, Some(native), Arc::new(T::rtti_descriptor))
    }

    fn insert(
        &self,
        type_id: RttiId,
        native: Option<(TypeId, &'static str)>,
        factory: Arc<DescriptorFactory>,
    ) -> Result<(), RttiError> {
        if type_id.is_null() {
            return Err(RttiError::ReservedTypeId { type_id });
        }

        let mut entries = self.entries.write().map_err(|_| RttiError::LockPoisoned)?;
        if let Some(existing) = entries.get(&type_id) {
            if let (Some((existing_native, existing_name)), Some((native, _))) =
                (existing.native, native)
            {
                if existing_native != native {
                    return Err(RttiError::DuplicateTypeId {
                        type_id,
                        existing: existing_name,
                    });
                }
            }
            tracing::debug!(%type_id, "type already registered");
            return Ok(());
        }

        entries.insert(
            type_id,
            Arc::new(RegistryEntry {
                native,
                factory,
                descriptor: OnceLock::new(),
                chain: OnceLock::new(),
            }),
        );
        Ok(())
    }

    fn entry(&self, type_id: RttiId) -> Result<Arc<RegistryEntry>, RttiError> {
        let entries = self.entries.read().map_err(|_| RttiError::LockPoisoned)?;
        entries
            .get(&type_id)
            .cloned()
            .ok_or(RttiError::UnknownType { type_id })
    }

    /// Returns the descriptor for `type_id`, creating it on first use.
    pub fn resolve(&self, type_id: RttiId) -> Result<Arc<RttiDescriptor>, RttiError> {
        let entry = self.entry(type_id)?;
        entry
            .descriptor
            .get_or_init(|| {
                let descriptor = (entry.factory)();
                if descriptor.id() != type_id {
                    return Err(RttiError::DescriptorIdMismatch {
                        registered: type_id,
                        declared: descriptor.id(),
                    });
                }
                descriptor.validate()?;
                tracing::debug!(
                    %type_id,
                    name = descriptor.name(),
                    fields = descriptor.field_count(),
                    "instantiated RTTI descriptor"
                );
                Ok(Arc::new(descriptor))
            })
            .clone()
    }

    /// Returns the cached base-first chain for `type_id`.
    pub fn chain(&self, type_id: RttiId) -> Result<Arc<TypeChain>, RttiError> {
        let entry = self.entry(type_id)?;
        if let Some(chain) = entry.chain.get() {
            return Ok(Arc::clone(chain));
        }

        let built = Arc::new(self.build_chain(type_id)?);
        Ok(Arc::clone(entry.chain.get_or_init(|| built)))
    }

    fn build_chain(&self, type_id: RttiId) -> Result<TypeChain, RttiError> {
        let mut levels = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(type_id);

        while let Some(current) = next {
            if !seen.insert(current) {
                return Err(RttiError::CyclicBaseChain { type_id });
            }
            let descriptor = self.resolve(current)?;
            next = descriptor.base_id();
            levels.push(descriptor);
        }

        levels.reverse();
        Ok(TypeChain { levels })
    }

    /// Checks if a type is registered.
    pub fn contains(&self, type_id: RttiId) -> bool {
        match self.entries.read() {
            Ok(entries) => entries.contains_key(&type_id),
            Err(_) => false,
        }
    }

    /// Returns all registered type ids in ascending order.
    pub fn type_ids(&self) -> Vec<RttiId> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };
        let mut ids: Vec<RttiId> = entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds a descriptor by its RTTI name.
    ///
    /// Resolves every registered type, so this is meant for text formats and
    /// tooling rather than hot paths.
    pub fn find_by_name(&self, name: &str) -> Result<Arc<RttiDescriptor>, RttiError> {
        for type_id in self.type_ids() {
            let descriptor = self.resolve(type_id)?;
            if descriptor.name() == name {
                return Ok(descriptor);
            }
        }
        Err(RttiError::UnknownTypeName(name.to_string()))
    }

    /// Whether `type_id` is `base` or derives from it.
    pub fn is_subclass(&self, type_id: RttiId, base: RttiId) -> Result<bool, RttiError> {
        Ok(self.chain(type_id)?.contains(base))
    }

    /// Drops every registration. Descriptors still held elsewhere stay valid.
    pub fn clear(&self) -> Result<(), RttiError> {
        let mut entries = self.entries.write().map_err(|_| RttiError::LockPoisoned)?;
        entries.clear();
        Ok(())
    }
}
