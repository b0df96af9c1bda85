//! Process-wide reflection context with explicit startup and shutdown.

use std::sync::Arc;

use crate::config::RttiConfig;
use crate::error::RttiError;
use crate::interop::InteropBridge;
use crate::persistence::AssetStore;
use crate::serialization::Serializer;
use crate::types::TypeRegistry;

/// Registration function run at startup, e.g. [`register_engine_types`].
///
/// [`register_engine_types`]: crate::types::register_engine_types
pub type Registration = fn(&TypeRegistry) -> Result<(), RttiError>;

/// Owns the type registry and configuration shared by all reflection users.
#[derive(Debug, Clone)]
pub struct RttiContext {
    registry: Arc<TypeRegistry>,
    config: RttiConfig,
}

impl RttiContext {
    /// Creates the registry and runs every registration function in order.
    pub fn init(config: RttiConfig, registrations: &[Registration]) -> Result<Self, RttiError> {
        let registry = Arc::new(TypeRegistry::new());
        for register in registrations {
            register(&registry)?;
        }
        tracing::debug!("Reflection context initialized with {} types", registry.len());
        Ok(Self { registry, config })
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RttiConfig {
        &self.config
    }

    pub fn serializer(&self) -> Serializer {
        Serializer::with_config(Arc::clone(&self.registry), self.config.clone())
    }

    pub fn asset_store(&self) -> AssetStore {
        AssetStore::new(self.serializer())
    }

    pub fn bridge(&self) -> InteropBridge {
        InteropBridge::new(Arc::clone(&self.registry))
    }

    /// Drops every registration. Descriptors held elsewhere stay valid.
    pub fn shutdown(self) -> Result<(), RttiError> {
        let count = self.registry.len();
        self.registry.clear()?;
        tracing::debug!("Reflection context shut down, {} types unregistered", count);
        Ok(())
    }
}
