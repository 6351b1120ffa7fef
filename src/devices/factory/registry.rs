//! Builder registry
//!
//! The registry holds the static builders of every driver that takes part in
//! discovery, in registration order. Builders are `'static` and only
//! referenced here, so the registry itself needs no heap allocation.

use super::builder::DeviceBuilder;
use super::FactoryError;
use heapless::Vec;

/// Maximum number of builders that can be registered
pub const MAX_BUILDERS: usize = 32;

/// Ordered list of registered device builders
#[derive(Debug, Clone, Default)]
pub struct BuilderRegistry {
    builders: Vec<&'static DeviceBuilder, MAX_BUILDERS>,
}

impl BuilderRegistry {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            builders: Vec::new(),
        }
    }

    /// Append a builder
    ///
    /// # Returns
    ///
    /// Index of the builder in registration order.
    ///
    /// # Errors
    ///
    /// `DuplicateBuilder` if a builder with the same name is registered,
    /// `RegistryFull` past `MAX_BUILDERS`.
    pub fn register(&mut self, builder: &'static DeviceBuilder) -> Result<usize, FactoryError> {
        if self.find(builder.name).is_some() {
            return Err(FactoryError::DuplicateBuilder);
        }

        let index = self.builders.len();
        self.builders
            .push(builder)
            .map_err(|_| FactoryError::RegistryFull)?;
        Ok(index)
    }

    /// Get builder by name
    ///
    /// Performs a linear search through the registry.
    pub fn find(&self, name: &str) -> Option<&'static DeviceBuilder> {
        self.builders.iter().copied().find(|b| b.name == name)
    }

    /// Iterate over builders in registration order
    pub fn iter(&self) -> impl Iterator<Item = &'static DeviceBuilder> + '_ {
        self.builders.iter().copied()
    }

    /// Get total number of registered builders
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Check if no builders are registered
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Remove every builder (after a discovery pass completes)
    pub fn clear(&mut self) {
        self.builders.clear();
    }
}
