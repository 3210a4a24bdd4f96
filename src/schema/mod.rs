//! Schema construction: definitions in, an accepted registry out.
//!
//! [`Schema::new`] (or the fluent [`SchemaBuilder`]) runs the definition
//! legality checker over the raw rule map and, on success, classifies the
//! properties into an immutable [`PropertyRegistry`]. A schema is the
//! blueprint; call [`Schema::model`] to obtain the [`Model`](crate::Model)
//! that performs operations.

pub mod checks;
pub mod property;
pub mod registry;

use crate::error::SchemaResult;
use crate::model::Model;
use checks::check_definitions;
use property::Property;
use registry::{Definitions, PropertyRegistry};

/// Behavioral options of a schema.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Append `createdAt`/`updatedAt` (RFC 3339 UTC) to operation results.
    pub timestamps: bool,
    /// Upper bound on cascade recursion before the operation is aborted
    /// with a configuration error.
    pub max_resolve_depth: usize,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            timestamps: false,
            max_resolve_depth: 64,
        }
    }
}

/// Options for extending a parent schema.
#[derive(Debug, Clone, Default)]
pub struct ExtendOptions {
    /// Parent properties to drop from the child schema.
    pub remove: Vec<String>,
}

/// An accepted schema: checked definitions plus options.
#[derive(Debug)]
pub struct Schema {
    registry: PropertyRegistry,
    options: ModelOptions,
}

impl Schema {
    /// Check and classify a definition map.
    pub fn new(definitions: Definitions, options: ModelOptions) -> SchemaResult<Self> {
        check_definitions(&definitions)?;
        Ok(Self {
            registry: PropertyRegistry::new(definitions),
            options,
        })
    }

    /// Start a fluent schema builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Derive a child schema: parent definitions merged under child
    /// overrides, minus the removed names. The merged map is re-checked.
    pub fn extend(
        &self,
        child: Definitions,
        options: ExtendOptions,
        model_options: ModelOptions,
    ) -> SchemaResult<Self> {
        let mut merged = self.registry.definitions().clone();
        for (name, def) in child {
            merged.insert(name, def);
        }
        for name in &options.remove {
            merged.remove(name);
        }
        Self::new(merged, model_options)
    }

    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn definitions(&self) -> &Definitions {
        self.registry.definitions()
    }

    /// Consume the schema into an operating model.
    pub fn model(self) -> Model {
        Model::new(self)
    }
}

/// Fluent builder for [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    definitions: Definitions,
    options: ModelOptions,
}

impl SchemaBuilder {
    /// Add one property definition.
    pub fn property(mut self, name: impl Into<String>, definition: Property) -> Self {
        self.definitions.insert(name.into(), definition);
        self
    }

    /// Enable timestamping of operation results.
    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.options.timestamps = timestamps;
        self
    }

    /// Override the cascade recursion bound.
    pub fn max_resolve_depth(mut self, depth: usize) -> Self {
        self.options.max_resolve_depth = depth;
        self
    }

    /// Check and build the schema.
    pub fn build(self) -> SchemaResult<Schema> {
        Schema::new(self.definitions, self.options)
    }
}
