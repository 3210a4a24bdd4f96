//! Validator invocation and result normalization.
//!
//! One entry point, [`invoke`], used by every pipeline and by the public
//! single-property `validate` operation. It selects the right validator for
//! the property, runs it against the live context, and normalizes the
//! closed [`Validity`] verdict into a flat [`Validation`]. Cross-field
//! reasons reported by a validator are returned separately so the caller
//! can merge them into its aggregator.

use crate::error::ErrorPayload;
use crate::model::context::Context;
use crate::schema::property::Validity;
use crate::schema::registry::PropertyRegistry;
use serde::Serialize;
use serde_json::Value;

/// Normalized result of validating one property.
#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated: Option<Value>,
    pub reasons: Vec<String>,
}

impl Validation {
    pub(crate) fn valid(value: Value) -> Self {
        Self {
            valid: true,
            validated: Some(value),
            reasons: Vec::new(),
        }
    }

    pub(crate) fn invalid(reasons: Vec<String>) -> Self {
        Self {
            valid: false,
            validated: None,
            reasons,
        }
    }
}

/// Validation plus any cross-field reasons to merge into the aggregator.
pub(crate) struct Invoked {
    pub validation: Validation,
    pub other_reasons: ErrorPayload,
}

impl Invoked {
    fn plain(validation: Validation) -> Self {
        Self {
            validation,
            other_reasons: ErrorPayload::new(),
        }
    }
}

/// Validate `value` for `property` against the live context.
///
/// `value: None` means the caller supplied nothing; with no validator in
/// play that is rejected as an invalid value, otherwise the validator sees
/// `Null` and decides.
pub(crate) async fn invoke(
    registry: &PropertyRegistry,
    ctx: Context,
    property: &str,
    value: Option<Value>,
) -> Invoked {
    let is_side_effect = registry.is_side_effect(property);
    if !registry.is_visible_property(property) && !is_side_effect {
        return Invoked::plain(Validation::invalid(vec!["Invalid property".into()]));
    }

    let validator = registry
        .definition_of(property)
        .and_then(|d| d.validator.clone());

    let Some(validator) = validator else {
        return match value {
            None => Invoked::plain(Validation::invalid(vec!["Invalid value".into()])),
            Some(v) => Invoked::plain(Validation::valid(v)),
        };
    };

    let supplied = value.clone().unwrap_or(Value::Null);
    match validator(supplied.clone(), ctx).await {
        Validity::Valid { value: adopted } => {
            Invoked::plain(Validation::valid(adopted.unwrap_or(supplied)))
        }
        Validity::Invalid {
            reasons,
            other_reasons,
        } => {
            let reasons = if reasons.is_empty() {
                vec!["validation failed".into()]
            } else {
                reasons
            };
            Invoked {
                validation: Validation::invalid(reasons),
                other_reasons,
            }
        }
    }
}
