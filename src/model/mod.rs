//! The operating model built from an accepted schema.
//!
//! A [`Model`] is stateless between operations: every create, clone and
//! update constructs its own resolution state, so a single model can serve
//! concurrent operations safely. Operations return either the committed
//! record or a structured [`OperationError`](crate::OperationError); no
//! partial object is ever returned alongside an error.

pub mod context;
pub mod invoker;
pub(crate) mod operations;
pub(crate) mod resolver;

use crate::error::OperationResult;
use crate::schema::registry::PropertyRegistry;
use crate::schema::{ModelOptions, Schema};
use context::{Context, Record};
use invoker::Validation;
use log::debug;
use serde_json::Value;

/// Options for [`Model::clone_record`].
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    /// Properties forced back to their default (or kept at their current
    /// value when no default exists) instead of replaying the seed value.
    pub reset: Vec<String>,
}

impl CloneOptions {
    /// Reset the named properties while cloning.
    pub fn reset<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reset: properties.into_iter().map(Into::into).collect(),
        }
    }
}

/// A model capable of constructing, cloning and updating records while
/// enforcing its schema's validation, dependency resolution and lifecycle
/// hooks.
#[derive(Debug)]
pub struct Model {
    schema: Schema,
}

impl Model {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &PropertyRegistry {
        self.schema.registry()
    }

    pub fn options(&self) -> &ModelOptions {
        self.schema.options()
    }

    /// Build a record from caller input.
    ///
    /// Creatable and lax properties take the supplied value when present and
    /// valid, otherwise their default; dependent properties always take
    /// their default (or their resolver's output when a trigger diverged);
    /// side-effect inputs are validated and drive their listener chains but
    /// never appear in the result.
    pub async fn create(&self, input: Record) -> OperationResult<Record> {
        operations::create(self, &input).await
    }

    /// Replay an existing record into a fresh one, optionally resetting
    /// named properties back to their defaults.
    pub async fn clone_record(
        &self,
        seed: &Record,
        options: CloneOptions,
    ) -> OperationResult<Record> {
        operations::clone_record(self, seed, &options).await
    }

    /// Apply a partial set of proposed changes to a current record.
    ///
    /// Returns only the changed-field subset (plus `updatedAt` when
    /// timestamping is enabled). An update that resolves zero changes fails
    /// with "Nothing to update".
    pub async fn update(&self, current: &Record, changes: Record) -> OperationResult<Record> {
        operations::update(self, current, &changes).await
    }

    /// Validate a single property value without running a full pipeline,
    /// e.g. for form-level checks. `None` means no value was supplied.
    pub async fn validate(&self, property: &str, value: Option<Value>) -> Validation {
        let invoked =
            invoker::invoke(self.registry(), Context::default(), property, value).await;
        if !invoked.other_reasons.is_empty() {
            debug!("validate('{property}'): discarding cross-field reasons");
        }
        invoked.validation
    }

    /// Run every registered deletion hook against the record snapshot.
    pub async fn delete(&self, record: &Record) {
        operations::delete(self, record).await;
    }
}
