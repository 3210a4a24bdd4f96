//! Resolution context and per-operation scratch state.
//!
//! A [`Context`] is the flat, point-in-time value snapshot handed to every
//! validator, resolver and listener: the model's stored values, overlaid
//! with staged side-effect values, overlaid with whatever the in-flight
//! operation has already resolved. It is rebuilt on demand so cascades
//! always read a live view, never a stale snapshot.
//!
//! [`ResolutionState`] is that scratch state, constructed fresh per
//! operation and threaded explicitly through every recursive call. Nothing
//! mutable lives on the model itself, so concurrent operations on one model
//! are safe.

use crate::equality::is_equal;
use crate::error::ErrorBag;
use crate::model::Model;
use serde_json::Value;
use std::collections::BTreeMap;

/// A structured record: property name to JSON value, lexicographically
/// ordered.
pub type Record = BTreeMap<String, Value>;

/// Point-in-time snapshot of all visible property values plus in-flight
/// pending values, passed to validators, resolvers and hooks.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: Record,
}

impl Context {
    pub(crate) fn from_values(values: Record) -> Self {
        Self { values }
    }

    /// The raw value for a property, if present.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    /// The value for a property, cloned; `Null` when absent.
    pub fn value(&self, property: &str) -> Value {
        self.values.get(property).cloned().unwrap_or(Value::Null)
    }

    /// True when the property is absent or null.
    pub fn is_missing(&self, property: &str) -> bool {
        matches!(self.values.get(property), None | Some(Value::Null))
    }

    pub fn bool_of(&self, property: &str) -> Option<bool> {
        self.values.get(property).and_then(Value::as_bool)
    }

    pub fn i64_of(&self, property: &str) -> Option<i64> {
        self.values.get(property).and_then(Value::as_i64)
    }

    pub fn f64_of(&self, property: &str) -> Option<f64> {
        self.values.get(property).and_then(Value::as_f64)
    }

    pub fn str_of(&self, property: &str) -> Option<&str> {
        self.values.get(property).and_then(Value::as_str)
    }

    /// All values in the snapshot.
    pub fn values(&self) -> &Record {
        &self.values
    }
}

/// Per-operation scratch state: the stored snapshot, the staged side-effect
/// overlay, the pending-updates accumulator and the error aggregator.
pub(crate) struct ResolutionState<'m> {
    pub(crate) model: &'m Model,
    /// Stored values the operation started from (current record for update,
    /// caller input for create, seed for clone).
    pub(crate) base: Record,
    /// Validated side-effect values, visible to downstream resolvers but
    /// never emitted.
    pub(crate) overlay: Record,
    /// Newly resolved values; the authoritative result of the operation.
    pub(crate) acc: Record,
    pub(crate) errors: ErrorBag,
}

impl<'m> ResolutionState<'m> {
    pub(crate) fn new(model: &'m Model, base: Record) -> Self {
        Self {
            model,
            base,
            overlay: Record::new(),
            acc: Record::new(),
            errors: ErrorBag::new(),
        }
    }

    /// Rebuild the live context: base, then staged side effects, then the
    /// accumulator. Later layers shadow earlier ones.
    pub(crate) fn context(&self) -> Context {
        let mut values = self.base.clone();
        for (k, v) in &self.overlay {
            values.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.acc {
            values.insert(k.clone(), v.clone());
        }
        Context::from_values(values)
    }

    /// The value stored for a property before this operation began.
    pub(crate) fn stored(&self, property: &str) -> Value {
        self.base.get(property).cloned().unwrap_or(Value::Null)
    }

    /// Whether a listener-contributed value is worth staging: the property
    /// must be visible and the value must differ from the live context.
    pub(crate) fn updatable_in_context(&self, property: &str, value: &Value) -> bool {
        if !self.model.registry().is_visible_property(property) {
            return false;
        }
        !is_equal(value, &self.context().value(property), 1)
    }
}
