//! Resolution engine: recursive propagation of linked-property cascades.
//!
//! A changed trigger (a side-effect property being set, or a plain property
//! carrying change listeners) fans out through an arbitrary-depth chain of
//! further property updates. Side-effect values act purely as triggers and
//! are staged into the transient context without a has-changed comparison;
//! ordinary properties are diffed against the stored value so chains never
//! re-fire on values that are already current.
//!
//! Listener chains run sequentially in registration order, and the merged
//! context is rebuilt before every invocation so later listeners observe
//! mutations made by earlier ones. Recursion is bounded by
//! `ModelOptions::max_resolve_depth`; a chain that reintroduces its own
//! trigger exhausts the bound and aborts the operation with a
//! configuration error.

use crate::equality::is_equal;
use crate::error::OperationError;
use crate::model::context::ResolutionState;
use crate::model::invoker;
use crate::schema::property::{BoxFuture, Partial};
use log::trace;
use serde_json::Value;

/// Propagate one trigger property's effect through its listener chain.
///
/// No-op for properties that neither carry change listeners, act as a
/// side-effect trigger, nor feed any dependent resolver. Validation
/// failures stop the branch and land in the aggregator; only depth
/// exhaustion aborts the whole operation.
pub(crate) fn resolve_linked<'a, 'm: 'a>(
    state: &'a mut ResolutionState<'m>,
    property: String,
    value: Value,
    depth: usize,
) -> BoxFuture<'a, Result<(), OperationError>> {
    Box::pin(async move {
        let model = state.model;
        let registry = model.registry();
        let is_side_effect = registry.is_side_effect(&property);
        let is_linked = registry.is_linked(&property);
        let feeds_dependents = !registry.dependents_of(&property).is_empty();
        if !is_side_effect && !is_linked && !feeds_dependents {
            return Ok(());
        }

        let limit = model.options().max_resolve_depth;
        if depth >= limit {
            return Err(OperationError::resolve_depth_exceeded(&property, limit));
        }
        trace!("cascade: '{property}' at depth {depth}");

        let invoked = invoker::invoke(registry, state.context(), &property, Some(value)).await;
        state.errors.merge(invoked.other_reasons);
        if !invoked.validation.valid {
            state.errors.extend(property, invoked.validation.reasons);
            return Ok(());
        }
        let validated = invoked.validation.validated.unwrap_or(Value::Null);

        let has_changed = !is_equal(&state.stored(&property), &validated, 1);
        if !is_side_effect && !has_changed {
            return Ok(());
        }
        if is_side_effect {
            state.overlay.insert(property.clone(), validated);
        }

        run_listener_chain(state, &property, depth).await
    })
}

/// Run a property's change listeners and then the resolvers of its
/// dependents, staging and recursing into every contributed value.
///
/// Entered directly (rather than via a changed trigger) by the create
/// pipeline's side-effect initialization pass.
pub(crate) async fn run_listener_chain(
    state: &mut ResolutionState<'_>,
    property: &str,
    depth: usize,
) -> Result<(), OperationError> {
    let model = state.model;
    for listener in model.registry().change_listeners(property) {
        let partial = listener(state.context()).await;
        apply_partial(state, partial, depth).await?;
    }
    run_dependent_resolvers(state, property, depth).await
}

/// Stage a listener's contributed values and recurse into each.
///
/// Side-effect keys bypass the staging diff (they are never compared
/// against previous state); other keys are staged only when they differ
/// from the live context value.
pub(crate) async fn apply_partial(
    state: &mut ResolutionState<'_>,
    partial: Partial,
    depth: usize,
) -> Result<(), OperationError> {
    let model = state.model;
    for (key, value) in partial {
        let is_side_effect = model.registry().is_side_effect(&key);
        if !is_side_effect && !state.updatable_in_context(&key, &value) {
            continue;
        }
        if !is_side_effect {
            state.acc.insert(key.clone(), value.clone());
        }
        resolve_linked(state, key, value, depth + 1).await?;
    }
    Ok(())
}

/// Recompute every dependent property resolving off `trigger`.
pub(crate) async fn run_dependent_resolvers(
    state: &mut ResolutionState<'_>,
    trigger: &str,
    depth: usize,
) -> Result<(), OperationError> {
    let model = state.model;
    let registry = model.registry();
    for dependent in registry.dependents_of(trigger) {
        let Some(resolver) = registry
            .definition_of(dependent)
            .and_then(|d| d.resolver.clone())
        else {
            continue;
        };
        let resolved = resolver(state.context()).await;
        if !state.updatable_in_context(dependent, &resolved) {
            continue;
        }
        trace!("cascade: '{trigger}' resolved dependent '{dependent}'");
        state.acc.insert(dependent.clone(), resolved.clone());
        resolve_linked(state, dependent.clone(), resolved, depth + 1).await?;
    }
    Ok(())
}
