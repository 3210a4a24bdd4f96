//! Error types for schema and model operations.
//!
//! Two failure domains exist: definition failures raised while a schema is
//! being built ([`SchemaError`]), and per-operation validation failures
//! aggregated across every property before an operation decides pass/fail
//! ([`OperationError`]). Both carry the same per-property payload shape so
//! callers can render them uniformly.

use serde::Serialize;
use std::collections::BTreeMap;

/// Per-property failure payload: property name to ordered reason list.
pub type ErrorPayload = BTreeMap<String, Vec<String>>;

/// Error raised when a schema definition is rejected at build time.
///
/// Definition failures are fatal and never reach the per-operation path.
/// The payload lists every offending rule combination per property, so a
/// schema author sees all problems in one pass.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct SchemaError {
    pub message: String,
    pub payload: ErrorPayload,
    #[serde(rename = "statusCode")]
    pub status: u16,
}

impl SchemaError {
    /// Create a definition error with the standard message and status.
    pub fn invalid_schema(payload: ErrorPayload) -> Self {
        Self {
            message: "Invalid Schema".into(),
            payload,
            status: 500,
        }
    }
}

/// Error returned by a failed create/clone/update operation.
///
/// `payload` maps each rejected property to its ordered reasons. No partial
/// object is ever returned alongside this error.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct OperationError {
    pub message: String,
    pub payload: ErrorPayload,
    #[serde(rename = "statusCode")]
    pub status: u16,
}

impl OperationError {
    /// Aggregated validation failure.
    pub fn validation(payload: ErrorPayload) -> Self {
        Self {
            message: "Validation Error".into(),
            payload,
            status: 400,
        }
    }

    /// An update that resolved zero changes. Always an error, so callers
    /// cannot mistake an empty mutation for a successful one.
    pub fn nothing_to_update() -> Self {
        Self {
            message: "Nothing to update".into(),
            payload: ErrorPayload::new(),
            status: 400,
        }
    }

    /// A listener chain recursed past the configured depth bound.
    ///
    /// This is a configuration fault in the schema (a cascade reintroducing
    /// its own trigger), not a bad input, hence the 500 status.
    pub fn resolve_depth_exceeded(property: impl Into<String>, limit: usize) -> Self {
        let property = property.into();
        let mut payload = ErrorPayload::new();
        payload.insert(
            property,
            vec![format!(
                "Cascade exceeded the maximum resolution depth of {limit}"
            )],
        );
        Self {
            message: "Maximum resolution depth exceeded".into(),
            payload,
            status: 500,
        }
    }
}

/// Result alias for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;
/// Result alias for model operations.
pub type OperationResult<T> = Result<T, OperationError>;

/// Per-operation aggregator of validation failures.
///
/// A fresh bag is constructed for every pipeline invocation and consumed as
/// data when the operation decides pass/fail; it is never retained as shared
/// state between operations.
#[derive(Debug, Clone, Default)]
pub struct ErrorBag {
    entries: ErrorPayload,
}

impl ErrorBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one reason against a property.
    pub fn add(&mut self, property: impl Into<String>, reason: impl Into<String>) {
        self.entries
            .entry(property.into())
            .or_default()
            .push(reason.into());
    }

    /// Record several reasons against a property, preserving order.
    pub fn extend(&mut self, property: impl Into<String>, reasons: Vec<String>) {
        self.entries
            .entry(property.into())
            .or_default()
            .extend(reasons);
    }

    /// Merge cross-field reasons reported by another property's validator.
    pub fn merge(&mut self, other: ErrorPayload) {
        for (property, reasons) in other {
            self.entries.entry(property).or_default().extend(reasons);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn payload(&self) -> &ErrorPayload {
        &self.entries
    }

    /// Consume the bag into the aggregated validation error.
    pub fn into_validation_error(self) -> OperationError {
        OperationError::validation(self.entries)
    }
}
