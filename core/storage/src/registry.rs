//! Remote registry for resolving a backend by scheme name.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use driveremote_common::{Error, Result};

use crate::gdrive::provider::parse_remote_url;
use crate::gdrive::{create_gdrive_provider, GDriveProvider};
use crate::memory::MemoryTransport;
use crate::provider::Remote;

/// Factory function type for creating remotes.
pub type ProviderFactory = Box<dyn Fn(Value) -> Result<Arc<dyn Remote>> + Send + Sync>;

/// Registry for remote factories.
///
/// Allows dynamic registration and resolution of remotes by name and
/// configuration.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a remote factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::InvalidInput(format!(
                "Remote '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a remote by name and configuration.
    ///
    /// # Errors
    /// - Remote not found
    /// - Configuration invalid
    pub fn resolve(&self, name: &str, config: Value) -> Result<Arc<dyn Remote>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Remote '{}' is not registered", name)))?;
        factory(config)
    }

    /// Get list of registered remote names.
    pub fn providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check if a remote is registered.
    pub fn has_provider(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Remote over a fresh in-memory drive. Expects `{"url": "gdrive://..."}`.
fn create_memory_provider(config: Value) -> Result<Arc<dyn Remote>> {
    let url = config
        .get("url")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::InvalidInput("Memory remote requires 'url'".to_string()))?;

    Ok(Arc::new(GDriveProvider::with_transport(
        parse_remote_url(url)?,
        Arc::new(MemoryTransport::new()),
    )))
}

/// Create a registry with the built-in remotes.
pub fn create_default_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry
        .factories
        .insert("gdrive".to_string(), Box::new(create_gdrive_provider));
    registry
        .factories
        .insert("memory".to_string(), Box::new(create_memory_provider));
    registry
}
