//! Operation pipelines: create, clone and update.
//!
//! Each pipeline constructs a fresh [`ResolutionState`], classifies the
//! caller input through the registry, validates in deterministic sorted
//! order, feeds resolved values through the resolution engine, and gates
//! the commit on the error aggregator. Failed operations never return a
//! partial object.

use crate::equality::is_equal;
use crate::error::{OperationError, OperationResult};
use crate::model::context::{Context, Record, ResolutionState};
use crate::model::invoker;
use crate::model::resolver::{
    resolve_linked, run_dependent_resolvers, run_listener_chain,
};
use crate::model::{CloneOptions, Model};
use crate::schema::property::Required;
use crate::schema::registry::{PropertyRegistry, PropertyRole};
use log::{debug, warn};
use serde_json::Value;

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

fn now_value() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

/// Which main-pass flavor is running.
#[derive(Clone, Copy)]
enum AssembleMode<'r> {
    Create,
    Clone { reset: &'r [String] },
}

impl AssembleMode<'_> {
    fn is_clone(&self) -> bool {
        matches!(self, Self::Clone { .. })
    }

    fn resets(&self, property: &str) -> bool {
        match self {
            Self::Clone { reset } => reset.iter().any(|p| p == property),
            Self::Create => false,
        }
    }
}

pub(crate) async fn create(model: &Model, input: &Record) -> OperationResult<Record> {
    debug!("create: {} input properties", input.len());
    let mut state = ResolutionState::new(model, known_subset(model.registry(), input));
    assemble(&mut state, input, AssembleMode::Create).await?;
    finish_build(state, input, AssembleMode::Create).await
}

pub(crate) async fn clone_record(
    model: &Model,
    seed: &Record,
    options: &CloneOptions,
) -> OperationResult<Record> {
    debug!(
        "clone: {} seed properties, {} reset",
        seed.len(),
        options.reset.len()
    );
    let mode = AssembleMode::Clone {
        reset: &options.reset,
    };
    let mut state = ResolutionState::new(model, known_subset(model.registry(), seed));
    assemble(&mut state, seed, mode).await?;
    finish_build(state, seed, mode).await
}

/// Shared tail of create and clone: side-effect initialization, initial
/// dependent resolution, conditional requireds, the aggregator gate,
/// creation hooks, timestamps and success hooks.
async fn finish_build(
    mut state: ResolutionState<'_>,
    input: &Record,
    mode: AssembleMode<'_>,
) -> OperationResult<Record> {
    let model = state.model;
    side_effect_init(&mut state, input).await?;
    resolve_initial_dependents(&mut state).await?;
    enforce_conditional_requireds(&mut state).await;

    if !state.errors.is_empty() {
        return Err(state.errors.into_validation_error());
    }

    run_create_hooks(&mut state).await?;
    if !state.errors.is_empty() {
        // the commit gate sits before the creation hooks; cascade failures
        // raised by hook-injected values do not fail a committed build
        warn!(
            "{}: discarding {} post-hook validation failure(s)",
            if mode.is_clone() { "clone" } else { "create" },
            state.errors.payload().len()
        );
    }

    if model.options().timestamps {
        let now = now_value();
        state.acc.insert(CREATED_AT.into(), now.clone());
        state.acc.insert(UPDATED_AT.into(), now);
    }

    let record = std::mem::take(&mut state.acc);
    run_success_hooks(model, &record).await;
    debug!("build committed with {} properties", record.len());
    Ok(record)
}

pub(crate) async fn update(
    model: &Model,
    current: &Record,
    changes: &Record,
) -> OperationResult<Record> {
    debug!("update: {} proposed changes", changes.len());
    let registry = model.registry();
    let mut base = Record::new();
    for (key, value) in current {
        if registry.is_visible_property(key) {
            base.insert(key.clone(), value.clone());
        }
    }
    let mut state = ResolutionState::new(model, base);

    // partition the proposed keys; BTreeMap iteration keeps them sorted
    let mut directly_updatable = Vec::new();
    let mut linked_or_side_effects = Vec::new();
    for key in changes.keys() {
        if is_directly_updatable(&state, registry, key).await {
            directly_updatable.push(key.clone());
        }
        if !registry.is_dependent(key)
            && (registry.is_side_effect(key)
                || registry.is_linked(key)
                || !registry.dependents_of(key).is_empty())
        {
            linked_or_side_effects.push(key.clone());
        }
    }

    for property in &directly_updatable {
        let value = changes.get(property).cloned().unwrap_or(Value::Null);
        let invoked = invoker::invoke(registry, state.context(), property, Some(value)).await;
        state.errors.merge(invoked.other_reasons);
        if !invoked.validation.valid {
            state.errors.extend(property.clone(), invoked.validation.reasons);
            continue;
        }
        let validated = invoked.validation.validated.unwrap_or(Value::Null);
        if !is_equal(&state.stored(property), &validated, 1) {
            state.acc.insert(property.clone(), validated);
        }
    }

    for property in &linked_or_side_effects {
        let value = changes.get(property).cloned().unwrap_or(Value::Null);
        resolve_linked(&mut state, property.clone(), value, 0).await?;
    }

    enforce_conditional_requireds(&mut state).await;

    if !state.errors.is_empty() {
        return Err(state.errors.into_validation_error());
    }
    if state.acc.is_empty() {
        debug!("update resolved zero changes");
        return Err(OperationError::nothing_to_update());
    }

    let mut updated = std::mem::take(&mut state.acc);
    if model.options().timestamps {
        updated.insert(UPDATED_AT.into(), now_value());
    }

    let mut committed = state.base.clone();
    committed.extend(updated.clone());
    run_success_hooks(model, &committed).await;
    debug!("update committed {} fields", updated.len());
    Ok(updated)
}

/// Run every registered deletion hook against the record snapshot.
pub(crate) async fn delete(model: &Model, record: &Record) {
    let registry = model.registry();
    let ctx = Context::from_values(record.clone());
    for (property, def) in registry.definitions() {
        for hook in &def.on_delete {
            debug!("delete hook for '{property}'");
            let _ = hook(ctx.clone()).await;
        }
    }
}

/// Keep only input keys the registry knows, visible or side-effect.
fn known_subset(registry: &PropertyRegistry, input: &Record) -> Record {
    let mut base = Record::new();
    for (key, value) in input {
        if registry.is_visible_property(key) || registry.is_side_effect(key) {
            base.insert(key.clone(), value.clone());
        }
    }
    base
}

/// Main value-assembly pass over every visible property, in sorted order.
async fn assemble(
    state: &mut ResolutionState<'_>,
    input: &Record,
    mode: AssembleMode<'_>,
) -> Result<(), OperationError> {
    let model = state.model;
    let registry = model.registry();
    for property in registry.visible_properties() {
        let Some(role) = registry.role_of(property) else {
            continue;
        };
        match role {
            PropertyRole::Constant => {
                let ctx = state.context();
                if let Some(value) = registry.constant_of(property, &ctx).await {
                    state.acc.insert(property.clone(), value);
                }
            }
            PropertyRole::Dependent { .. } => {
                let ctx = state.context();
                let default = registry.default_of(property, &ctx).await;
                let value = match mode {
                    // derived only: caller input is always ignored
                    AssembleMode::Create => default,
                    AssembleMode::Clone { .. } => {
                        let seed = input.get(property).cloned();
                        if mode.resets(property) {
                            default.or(seed)
                        } else {
                            seed.or(default)
                        }
                    }
                };
                if let Some(value) = value {
                    state.acc.insert(property.clone(), value);
                }
            }
            PropertyRole::SideEffect => {}
            _ => assemble_settable(state, input, mode, property, role).await,
        }
    }
    Ok(())
}

/// Decide and stage the value of one settable property.
async fn assemble_settable(
    state: &mut ResolutionState<'_>,
    input: &Record,
    mode: AssembleMode<'_>,
    property: &str,
    role: PropertyRole,
) {
    let model = state.model;
    let registry = model.registry();
    let ctx = state.context();
    let resetting = mode.resets(property);
    let supplied = input.get(property).cloned();
    let default = registry.default_of(property, &ctx).await;

    // clone replays seed values regardless of the init gate; create honors it
    let init_ok = mode.is_clone() || registry.init_allowed(property, &ctx).await;
    let use_supplied = supplied.is_some() && init_ok && !resetting;

    let (candidate, must_validate) = if resetting {
        (default.clone().or(supplied), true)
    } else if use_supplied {
        (supplied, true)
    } else {
        // defaults are trusted as-is
        (default.clone(), false)
    };

    match candidate {
        None if role == PropertyRole::Required => {
            state
                .errors
                .add(property, format!("'{property}' is required!"));
        }
        None => {
            // readonly with neither input nor default: the validator (or
            // the missing-value rule) decides
            let invoked = invoker::invoke(registry, state.context(), property, None).await;
            state.errors.merge(invoked.other_reasons);
            if invoked.validation.valid {
                if let Some(value) = invoked.validation.validated {
                    state.acc.insert(property.to_string(), value);
                }
            } else {
                state
                    .errors
                    .extend(property, invoked.validation.reasons);
            }
        }
        Some(value) if must_validate => {
            let invoked =
                invoker::invoke(registry, state.context(), property, Some(value)).await;
            state.errors.merge(invoked.other_reasons);
            if invoked.validation.valid {
                if let Some(validated) = invoked.validation.validated {
                    state.acc.insert(property.to_string(), validated);
                }
            } else {
                state
                    .errors
                    .extend(property, invoked.validation.reasons);
                if let Some(fallback) = default {
                    state.acc.insert(property.to_string(), fallback);
                }
            }
        }
        Some(value) => {
            state.acc.insert(property.to_string(), value);
        }
    }
}

/// Validate initializable side-effect inputs and enter their listener
/// chains directly.
async fn side_effect_init(
    state: &mut ResolutionState<'_>,
    input: &Record,
) -> Result<(), OperationError> {
    let model = state.model;
    let registry = model.registry();
    for property in registry.side_effect_properties() {
        if !registry.is_side_effect_initializable(property) {
            continue;
        }
        let ctx = state.context();
        if !registry.init_allowed(property, &ctx).await {
            continue;
        }
        let Some(value) = input.get(property).cloned() else {
            continue;
        };
        let invoked = invoker::invoke(registry, state.context(), property, Some(value)).await;
        state.errors.merge(invoked.other_reasons);
        if !invoked.validation.valid {
            state
                .errors
                .extend(property, invoked.validation.reasons);
            continue;
        }
        let validated = invoked.validation.validated.unwrap_or(Value::Null);
        state.overlay.insert(property.to_string(), validated);
        run_listener_chain(state, property, 0).await?;
    }
    Ok(())
}

/// Recompute dependents whose triggers diverged from their defaults during
/// assembly (or whose side-effect trigger was staged).
async fn resolve_initial_dependents(
    state: &mut ResolutionState<'_>,
) -> Result<(), OperationError> {
    let model = state.model;
    let registry = model.registry();
    for trigger in registry.dependents_index().keys() {
        let diverged = if registry.is_side_effect(trigger) {
            state.overlay.contains_key(trigger)
        } else {
            let ctx = state.context();
            let current = ctx.value(trigger);
            let default = registry
                .default_of(trigger, &ctx)
                .await
                .unwrap_or(Value::Null);
            !is_equal(&current, &default, 1)
        };
        if diverged {
            run_dependent_resolvers(state, trigger, 0).await?;
        }
    }
    Ok(())
}

/// Evaluate conditional-required predicates against the live context.
async fn enforce_conditional_requireds(state: &mut ResolutionState<'_>) {
    let model = state.model;
    let registry = model.registry();
    for property in registry.visible_properties() {
        let Some(def) = registry.definition_of(property) else {
            continue;
        };
        let Required::When(predicate) = &def.required else {
            continue;
        };
        let verdict = predicate(state.context()).await;
        if verdict.required {
            let message = verdict
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("'{property}' is required!"));
            state.errors.add(property, message);
        }
    }
}

/// Run creation lifecycle hooks; injected values cascade through the
/// resolution engine and may overwrite visible properties.
async fn run_create_hooks(state: &mut ResolutionState<'_>) -> Result<(), OperationError> {
    let model = state.model;
    let registry = model.registry();
    for property in registry.visible_properties() {
        let Some(def) = registry.definition_of(property) else {
            continue;
        };
        for hook in &def.on_create {
            let partial = hook(state.context()).await;
            for (key, value) in partial {
                if !registry.is_visible_property(&key) {
                    continue;
                }
                state.acc.insert(key.clone(), value.clone());
                resolve_linked(state, key, value, 0).await?;
            }
        }
    }
    Ok(())
}

/// Run success hooks against the committed record. Outputs are ignored.
async fn run_success_hooks(model: &Model, record: &Record) {
    let registry = model.registry();
    let ctx = Context::from_values(record.clone());
    for (_, def) in registry.definitions() {
        for hook in &def.on_success {
            let _ = hook(ctx.clone()).await;
        }
    }
}

/// A key is directly updatable when it is visible, neither constant nor
/// dependent, and, for a readonly property, has never diverged from its
/// default.
async fn is_directly_updatable(
    state: &ResolutionState<'_>,
    registry: &PropertyRegistry,
    property: &str,
) -> bool {
    match registry.role_of(property) {
        None
        | Some(PropertyRole::Constant)
        | Some(PropertyRole::Dependent { .. })
        | Some(PropertyRole::SideEffect) => false,
        Some(PropertyRole::Readonly { .. }) => {
            let ctx = state.context();
            let default = registry
                .default_of(property, &ctx)
                .await
                .unwrap_or(Value::Null);
            is_equal(&default, &state.stored(property), 1)
        }
        Some(PropertyRole::Required | PropertyRole::Lax) => true,
    }
}
