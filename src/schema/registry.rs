//! Property registry: classification and role predicates.
//!
//! The registry owns the immutable per-schema definition map and performs a
//! single classification pass at build time, producing a tagged
//! [`PropertyRole`] per property. Every role predicate afterwards is a
//! switch on that tag; rule shapes are never re-derived at call sites.
//!
//! Property-name listings are sorted lexicographically, which makes output
//! ordering reproducible and the "update produced at least one field" check
//! well-defined.

use super::property::{
    ConstantValue, DefaultValue, ListenerFn, Property, Readonly, Required, ShouldInit,
};
use crate::model::context::Context;
use serde_json::Value;
use std::collections::BTreeMap;

/// Definition map a schema is built from.
pub type Definitions = BTreeMap<String, Property>;

/// Tagged classification of a property, computed once at registry build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRole {
    /// Fixed value or generator output; immune to all caller input.
    Constant,
    /// Derived only; never directly settable. May also be readonly.
    Dependent { readonly: bool },
    /// Virtual trigger: validated but never stored or emitted.
    SideEffect,
    /// Settable at most once across the record's lifetime.
    Readonly { lax: bool },
    /// Must be supplied at creation.
    Required,
    /// Has a default, freely settable.
    Lax,
}

/// Immutable per-schema map from property name to its rule set, with
/// precomputed roles and indexes.
#[derive(Debug)]
pub struct PropertyRegistry {
    definitions: Definitions,
    roles: BTreeMap<String, PropertyRole>,
    visible: Vec<String>,
    side_effects: Vec<String>,
    /// Trigger property -> sorted dependent properties resolving off it.
    dependents: BTreeMap<String, Vec<String>>,
}

impl PropertyRegistry {
    /// Classify a pre-checked definition map.
    ///
    /// Assumes the definition checker already accepted the map; the
    /// classification here is total for any map that passed it.
    pub(crate) fn new(definitions: Definitions) -> Self {
        let mut roles = BTreeMap::new();
        let mut visible = Vec::new();
        let mut side_effects = Vec::new();
        let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (name, def) in &definitions {
            let role = classify(def);
            if role == PropertyRole::SideEffect {
                side_effects.push(name.clone());
            } else {
                visible.push(name.clone());
            }
            if def.dependent {
                for trigger in &def.depends_on {
                    dependents.entry(trigger.clone()).or_default().push(name.clone());
                }
            }
            roles.insert(name.clone(), role);
        }
        for group in dependents.values_mut() {
            group.sort();
        }

        Self {
            definitions,
            roles,
            visible,
            side_effects,
            dependents,
        }
    }

    pub fn definition_of(&self, property: &str) -> Option<&Property> {
        self.definitions.get(property)
    }

    /// The full definition map, in sorted property order.
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    pub fn role_of(&self, property: &str) -> Option<PropertyRole> {
        self.roles.get(property).copied()
    }

    /// Sorted names of all visible (emittable) properties.
    pub fn visible_properties(&self) -> &[String] {
        &self.visible
    }

    /// Sorted names of all side-effect properties.
    pub fn side_effect_properties(&self) -> &[String] {
        &self.side_effects
    }

    /// Sorted names of properties accepted at creation time.
    pub fn creatable_properties(&self) -> Vec<String> {
        self.visible
            .iter()
            .filter(|p| self.is_creatable(p))
            .cloned()
            .collect()
    }

    /// Sorted names of lax properties.
    pub fn lax_properties(&self) -> Vec<String> {
        self.visible.iter().filter(|p| self.is_lax(p)).cloned().collect()
    }

    /// Sorted names of dependent properties.
    pub fn dependent_properties(&self) -> Vec<String> {
        self.visible
            .iter()
            .filter(|p| self.is_dependent(p))
            .cloned()
            .collect()
    }

    /// Dependent properties that resolve off the given trigger, sorted.
    pub fn dependents_of(&self, trigger: &str) -> &[String] {
        self.dependents.get(trigger).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Trigger-to-dependents index, sorted both ways.
    pub(crate) fn dependents_index(&self) -> &BTreeMap<String, Vec<String>> {
        &self.dependents
    }

    pub fn is_constant(&self, property: &str) -> bool {
        matches!(self.role_of(property), Some(PropertyRole::Constant))
    }

    pub fn is_dependent(&self, property: &str) -> bool {
        matches!(self.role_of(property), Some(PropertyRole::Dependent { .. }))
    }

    pub fn is_side_effect(&self, property: &str) -> bool {
        matches!(self.role_of(property), Some(PropertyRole::SideEffect))
    }

    /// Side-effect property that participates at creation time.
    pub fn is_side_effect_initializable(&self, property: &str) -> bool {
        self.is_side_effect(property)
            && self
                .definition_of(property)
                .is_some_and(|d| d.should_init.is_not_blocked())
    }

    /// Accepted at creation: dependent, or readonly/required with
    /// initialization not explicitly blocked.
    pub fn is_creatable(&self, property: &str) -> bool {
        let Some(role) = self.role_of(property) else {
            return false;
        };
        let init_open = self
            .definition_of(property)
            .is_some_and(|d| d.should_init.is_not_blocked());
        match role {
            PropertyRole::Dependent { .. } => true,
            PropertyRole::Readonly { .. } | PropertyRole::Required => init_open,
            _ => false,
        }
    }

    /// Freely settable with a default, initialization not blocked.
    pub fn is_lax(&self, property: &str) -> bool {
        matches!(self.role_of(property), Some(PropertyRole::Lax))
            && self
                .definition_of(property)
                .is_some_and(|d| d.should_init.is_not_blocked())
    }

    /// Emittable: everything that is not a side-effect trigger.
    pub fn is_visible_property(&self, property: &str) -> bool {
        self.roles.contains_key(property) && !self.is_side_effect(property)
    }

    /// Carries at least one change listener (side effects excluded; their
    /// listeners run through the side-effect path).
    pub fn is_linked(&self, property: &str) -> bool {
        !self.is_side_effect(property)
            && self
                .definition_of(property)
                .is_some_and(Property::has_change_listeners)
    }

    /// The change listeners that fire when this property changes. For a
    /// side-effect property and a plain linked property alike, these are its
    /// registered `on_update` listeners.
    pub(crate) fn change_listeners(&self, property: &str) -> &[ListenerFn] {
        self.definition_of(property)
            .map(|d| d.on_update.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve a property's default against the given context, if it has
    /// one. Computed defaults are resolved lazily, never at registry build
    /// time.
    pub async fn default_of(&self, property: &str, ctx: &Context) -> Option<Value> {
        match &self.definition_of(property)?.default {
            Some(DefaultValue::Fixed(v)) => Some(v.clone()),
            Some(DefaultValue::Computed(producer)) => Some(producer(ctx.clone()).await),
            None => None,
        }
    }

    /// Resolve a constant property's value against the given context.
    pub(crate) async fn constant_of(&self, property: &str, ctx: &Context) -> Option<Value> {
        match &self.definition_of(property)?.constant {
            Some(ConstantValue::Fixed(v)) => Some(v.clone()),
            Some(ConstantValue::Computed(generator)) => Some(generator(ctx.clone()).await),
            None => None,
        }
    }

    /// Whether the property participates at creation, evaluating a
    /// conditional gate against the live context when present.
    pub(crate) async fn init_allowed(&self, property: &str, ctx: &Context) -> bool {
        match self.definition_of(property).map(|d| &d.should_init) {
            Some(ShouldInit::Never) => false,
            Some(ShouldInit::When(gate)) => gate(ctx.clone()).await,
            Some(ShouldInit::Unset | ShouldInit::Always) => true,
            None => false,
        }
    }
}

fn classify(def: &Property) -> PropertyRole {
    if def.constant.is_some() {
        PropertyRole::Constant
    } else if def.dependent {
        PropertyRole::Dependent {
            readonly: def.readonly != Readonly::No,
        }
    } else if def.side_effect {
        PropertyRole::SideEffect
    } else if def.readonly != Readonly::No {
        PropertyRole::Readonly {
            lax: def.readonly == Readonly::Lax,
        }
    } else if matches!(def.required, Required::Always) {
        PropertyRole::Required
    } else {
        PropertyRole::Lax
    }
}
