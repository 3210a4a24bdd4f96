//! Definition legality checks.
//!
//! Runs once at schema build time and rejects illegal rule combinations
//! before the core engine ever sees them. All violations across the whole
//! map are aggregated into one [`SchemaError`], so a schema author fixes
//! everything in a single pass. The engine itself assumes any map that
//! passed these checks is well-formed.

use super::property::{Property, Readonly, Required};
use super::registry::Definitions;
use crate::error::{ErrorPayload, SchemaError, SchemaResult};

pub(crate) fn check_definitions(definitions: &Definitions) -> SchemaResult<()> {
    let mut payload = ErrorPayload::new();
    let mut add = |prop: &str, reason: &str| {
        payload
            .entry(prop.to_string())
            .or_insert_with(Vec::new)
            .push(reason.to_string());
    };

    let visible_count = definitions.values().filter(|d| !d.side_effect).count();
    if visible_count == 0 {
        add("schema properties", "Insufficient Schema properties");
    }

    for (name, def) in definitions {
        if def.constant.is_some() {
            check_constant(name, def, &mut add);
            continue;
        }
        if def.dependent {
            check_dependent(name, def, definitions, &mut add);
            continue;
        }
        if !def.depends_on.is_empty() || def.resolver.is_some() {
            add(
                name,
                "'dependsOn' and 'resolver' rules can only be used with dependent properties",
            );
        }
        if def.side_effect {
            check_side_effect(name, def, &mut add);
            continue;
        }
        check_plain(name, def, &mut add);
    }

    if payload.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::invalid_schema(payload))
    }
}

/// Constants carry no behavioral rule besides delete/success hooks.
fn check_constant(name: &str, def: &Property, add: &mut impl FnMut(&str, &str)) {
    let has_other_rule = def.has_default()
        || def.dependent
        || !def.depends_on.is_empty()
        || def.resolver.is_some()
        || def.readonly != Readonly::No
        || !matches!(def.required, Required::No)
        || def.side_effect
        || def.should_init.is_set()
        || def.has_validator()
        || !def.on_create.is_empty()
        || !def.on_update.is_empty();
    if has_other_rule {
        add(
            name,
            "Constant properties can only have ('constant' & 'value') or 'onDelete' | 'onSuccess'",
        );
    }
}

fn check_dependent(
    name: &str,
    def: &Property,
    definitions: &Definitions,
    add: &mut impl FnMut(&str, &str),
) {
    if !def.has_default() {
        add(name, "Dependent properties must have a default value");
    }
    match def.required {
        Required::Always => add(name, "Dependent properties cannot be required"),
        Required::When(_) => add(name, "Required properties cannot be dependent"),
        Required::No => {}
    }
    if def.should_init.is_set() {
        add(name, "Dependent properties cannot have shouldInit rule");
    }
    if def.side_effect {
        add(name, "Dependent properties cannot be side effects");
    }
    if !def.depends_on.is_empty() && def.resolver.is_none() {
        add(name, "Dependent properties with dependencies must have a resolver");
    }
    if def.resolver.is_some() && def.depends_on.is_empty() {
        add(name, "A resolver requires at least one dependency");
    }
    for trigger in &def.depends_on {
        if trigger == name {
            add(name, "A property cannot depend on itself");
        } else if !definitions.contains_key(trigger) {
            add(name, &format!("Cannot depend on unknown property '{trigger}'"));
        }
    }
}

fn check_side_effect(name: &str, def: &Property, add: &mut impl FnMut(&str, &str)) {
    if !def.has_validator() {
        add(name, "Invalid validator");
    }
    if !def.has_change_listeners() {
        add(name, "SideEffects must have at least one onChange listener");
    }
    if def.has_default() {
        add(name, "Side effect properties cannot have a default value");
    }
    if def.readonly != Readonly::No {
        add(name, "Side effect properties cannot be readonly");
    }
    if !matches!(def.required, Required::No) {
        add(name, "Side effect properties cannot be required");
    }
}

fn check_plain(name: &str, def: &Property, add: &mut impl FnMut(&str, &str)) {
    match (def.readonly, &def.required) {
        (Readonly::Yes | Readonly::Lax, Required::Always) => {
            add(name, "readonly properties are required by default");
        }
        (Readonly::No, Required::Always) => {
            if def.has_default() {
                add(
                    name,
                    "Strictly required properties cannot have a default value or setter",
                );
            }
            if def.should_init.is_set() {
                add(name, "Required properties cannot have initialization blocked");
            }
            if !def.has_validator() {
                add(name, "Required properties must have a validator");
            }
        }
        (Readonly::Lax, _) => {
            if !def.has_default() {
                add(
                    name,
                    "readonly properties must have a default value or a default setter",
                );
            }
            if def.should_init.is_set() {
                add(name, "lax properties cannot have initialization blocked");
            }
        }
        (Readonly::No, Required::When(_)) => {
            if !def.has_default() {
                add(
                    name,
                    "Callable required properties must have a default value or setter",
                );
            }
            if def.should_init.is_set() {
                add(name, "Required properties cannot have initialization blocked");
            }
        }
        (Readonly::No, Required::No) => {
            // plain lax property
            if !def.has_default() {
                add(name, "Lax properties must have a default value");
            }
            if !def.should_init.is_not_blocked() && !def.has_default() {
                add(
                    name,
                    "A property with initialization blocked must have a default value",
                );
            }
        }
        (Readonly::Yes, Required::When(_)) => {
            if !def.has_default() {
                add(
                    name,
                    "Callable required properties must have a default value or setter",
                );
            }
        }
        (Readonly::Yes, Required::No) => {}
    }
}
