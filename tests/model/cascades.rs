//! Resolution cascades: side-effect chains, dependent resolvers, the
//! diff guard, and the recursion bound.

use crate::common::{partial, record};
use schema_model::{Property, Schema};
use serde_json::json;

/// Minimal crates/quantity schema: a lax quantity plus a virtual crates
/// list whose listener folds coefficient * qty into the quantity.
fn crates_schema() -> Schema {
    Schema::builder()
        .property("quantity", Property::lax(json!(0)))
        .property(
            "crates",
            Property::side_effect()
                .validator(|v, _| v.is_array())
                .on_update(|ctx| {
                    let added: i64 = ctx
                        .get("crates")
                        .and_then(|v| v.as_array())
                        .map(|crates| {
                            crates
                                .iter()
                                .map(|c| {
                                    c["coefficient"].as_i64().unwrap_or(0)
                                        * c["qty"].as_i64().unwrap_or(0)
                                })
                                .sum()
                        })
                        .unwrap_or(0);
                    let quantity = ctx.i64_of("quantity").unwrap_or(0);
                    partial([("quantity", json!(quantity + added))])
                }),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn create_folds_the_virtual_input_into_the_quantity() {
    let model = crates_schema().model();
    let item = model
        .create(record([(
            "crates",
            json!([{ "coefficient": 12, "qty": 2 }]),
        )]))
        .await
        .unwrap();

    assert_eq!(item, record([("quantity", json!(24))]));
}

#[tokio::test]
async fn update_reads_the_stored_quantity() {
    let model = crates_schema().model();
    let current = record([("quantity", json!(24))]);

    let updated = model
        .update(
            &current,
            record([("crates", json!([{ "coefficient": 12, "qty": 2 }]))]),
        )
        .await
        .unwrap();

    assert_eq!(updated, record([("quantity", json!(48))]));
}

#[tokio::test]
async fn pure_listeners_resolve_idempotently() {
    // the listener computes total from context alone, so re-resolving the
    // same trigger against an already-resolved state changes nothing
    let model = Schema::builder()
        .property("price", Property::lax(json!(100)))
        .property("total", Property::lax(json!(100)))
        .property(
            "discount",
            Property::side_effect()
                .validator(|v, _| v.as_f64().is_some_and(|d| (0.0..=1.0).contains(&d)))
                .on_update(|ctx| {
                    let price = ctx.f64_of("price").unwrap_or(0.0);
                    let discount = ctx.f64_of("discount").unwrap_or(0.0);
                    partial([("total", json!(price * (1.0 - discount)))])
                }),
        )
        .build()
        .unwrap()
        .model();

    let current = record([("price", json!(100)), ("total", json!(100))]);
    let updated = model
        .update(&current, record([("discount", json!(0.5))]))
        .await
        .unwrap();
    assert_eq!(updated, record([("total", json!(50.0))]));

    let mut resolved = current.clone();
    resolved.extend(updated);
    let error = model
        .update(&resolved, record([("discount", json!(0.5))]))
        .await
        .unwrap_err();
    assert_eq!(error.message, "Nothing to update");
}

#[tokio::test]
async fn dependent_resolvers_fire_when_their_trigger_changes() {
    let schema = Schema::builder()
        .property("price", Property::lax(json!(0)))
        .property(
            "vat",
            Property::dependent(json!(0.0)).depends_on(["price"], |ctx| {
                json!(ctx.f64_of("price").unwrap_or(0.0) * 0.2)
            }),
        )
        .build()
        .unwrap();
    let model = schema.model();

    // trigger diverged from its default at creation
    let item = model
        .create(record([("price", json!(100))]))
        .await
        .unwrap();
    assert_eq!(item["vat"], json!(20.0));

    let updated = model
        .update(&item, record([("price", json!(200))]))
        .await
        .unwrap();
    assert_eq!(
        updated,
        record([("price", json!(200)), ("vat", json!(40.0))])
    );

    // direct input for the dependent property is ignored everywhere
    let item = model
        .create(record([("vat", json!(99))]))
        .await
        .unwrap();
    assert_eq!(item["vat"], json!(0.0));
}

#[tokio::test]
async fn chained_dependents_cascade_to_arbitrary_depth() {
    let model = Schema::builder()
        .property("net", Property::lax(json!(0.0)))
        .property(
            "vat",
            Property::dependent(json!(0.0)).depends_on(["net"], |ctx| {
                json!(ctx.f64_of("net").unwrap_or(0.0) * 0.2)
            }),
        )
        .property(
            "gross",
            Property::dependent(json!(0.0)).depends_on(["net", "vat"], |ctx| {
                json!(ctx.f64_of("net").unwrap_or(0.0) + ctx.f64_of("vat").unwrap_or(0.0))
            }),
        )
        .build()
        .unwrap()
        .model();

    let current = record([
        ("net", json!(0.0)),
        ("vat", json!(0.0)),
        ("gross", json!(0.0)),
    ]);
    let updated = model
        .update(&current, record([("net", json!(100.0))]))
        .await
        .unwrap();

    assert_eq!(updated["net"], json!(100.0));
    assert_eq!(updated["vat"], json!(20.0));
    assert_eq!(updated["gross"], json!(120.0));
}

#[tokio::test]
async fn self_reintroducing_chains_hit_the_recursion_bound() {
    let model = Schema::builder()
        .property("count", Property::lax(json!(0)))
        .property(
            "ping",
            Property::side_effect()
                .validator(|_, _| true)
                .on_update(|ctx| {
                    partial([
                        ("count", json!(ctx.i64_of("count").unwrap_or(0) + 1)),
                        ("ping", json!("again")),
                    ])
                }),
        )
        .max_resolve_depth(8)
        .build()
        .unwrap()
        .model();

    let error = model
        .update(
            &record([("count", json!(0))]),
            record([("ping", json!("go"))]),
        )
        .await
        .unwrap_err();

    assert_eq!(error.message, "Maximum resolution depth exceeded");
    assert_eq!(error.status, 500);
    assert!(error.payload["ping"][0].contains("8"));
}

#[tokio::test]
async fn virtual_properties_never_appear_in_results() {
    let model = crates_schema().model();
    let item = model
        .create(record([
            ("quantity", json!(1)),
            ("crates", json!([{ "coefficient": 2, "qty": 3 }])),
        ]))
        .await
        .unwrap();
    assert!(!item.contains_key("crates"));

    let updated = model
        .update(
            &item,
            record([("crates", json!([{ "coefficient": 2, "qty": 3 }]))]),
        )
        .await
        .unwrap();
    assert!(!updated.contains_key("crates"));
}

#[tokio::test]
async fn listener_chains_observe_earlier_mutations() {
    // two listeners registered on one trigger: the second must see the
    // first's contribution through the rebuilt context
    let model = Schema::builder()
        .property("a", Property::lax(json!(0)))
        .property("b", Property::lax(json!(0)))
        .property(
            "bump",
            Property::side_effect()
                .validator(|_, _| true)
                .on_update(|ctx| {
                    partial([("a", json!(ctx.i64_of("a").unwrap_or(0) + 1))])
                })
                .on_update(|ctx| {
                    partial([("b", json!(ctx.i64_of("a").unwrap_or(0) * 10))])
                }),
        )
        .build()
        .unwrap()
        .model();

    let updated = model
        .update(
            &record([("a", json!(0)), ("b", json!(0))]),
            record([("bump", json!(true))]),
        )
        .await
        .unwrap();

    assert_eq!(updated, record([("a", json!(1)), ("b", json!(10))]));
}

#[tokio::test]
async fn no_op_listener_contributions_do_not_restage() {
    let model = Schema::builder()
        .property("value", Property::lax(json!(5)))
        .property(
            "touch",
            Property::side_effect()
                .validator(|_, _| true)
                .on_update(|ctx| {
                    // echoes the current value back; nothing actually changes
                    partial([("value", ctx.value("value"))])
                }),
        )
        .build()
        .unwrap()
        .model();

    let error = model
        .update(
            &record([("value", json!(5))]),
            record([("touch", json!(1))]),
        )
        .await
        .unwrap_err();
    assert_eq!(error.message, "Nothing to update");
}
