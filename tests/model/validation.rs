//! Validator normalization and the single-property validate operation.

use crate::common::record;
use schema_model::{Property, Schema, Validity};
use serde_json::json;

fn prop_schema() -> Schema {
    Schema::builder()
        .property(
            "prop",
            Property::lax(json!("")).validator(|v, _| {
                if v == json!("valid") {
                    Validity::pass()
                } else {
                    Validity::invalid("Invalid prop")
                }
            }),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn custom_reasons_surface() {
    let model = prop_schema().model();

    let result = model.validate("prop", Some(json!("yoo"))).await;
    assert!(!result.valid);
    assert_eq!(result.reasons, vec!["Invalid prop"]);

    let result = model.validate("prop", Some(json!("valid"))).await;
    assert!(result.valid);
    assert_eq!(result.validated, Some(json!("valid")));
}

#[tokio::test]
async fn boolean_validators_are_normalized() {
    let model = Schema::builder()
        .property(
            "prop",
            Property::lax(json!("")).validator(|v, _| v == json!("valid")),
        )
        .build()
        .unwrap()
        .model();

    let result = model.validate("prop", Some(json!("yoo"))).await;
    assert_eq!(result.reasons, vec!["validation failed"]);

    let result = model.validate("prop", Some(json!("valid"))).await;
    assert!(result.valid);
    assert_eq!(result.validated, Some(json!("valid")));
}

#[tokio::test]
async fn unknown_properties_are_rejected() {
    let model = prop_schema().model();
    let result = model.validate("unknownProp", Some(json!(1))).await;
    assert_eq!(result.reasons, vec!["Invalid property"]);
}

#[tokio::test]
async fn missing_value_without_validator_is_rejected() {
    let model = Schema::builder()
        .property("plain", Property::lax(json!(0)))
        .build()
        .unwrap()
        .model();

    let result = model.validate("plain", None).await;
    assert_eq!(result.reasons, vec!["Invalid value"]);

    let result = model.validate("plain", Some(json!(7))).await;
    assert!(result.valid);
    assert_eq!(result.validated, Some(json!(7)));
}

#[tokio::test]
async fn validators_may_adopt_a_normalized_value() {
    let model = Schema::builder()
        .property(
            "name",
            Property::lax(json!("")).validator(|v, _| match v.as_str() {
                Some(s) => Validity::valid(s.trim().to_string()),
                None => Validity::invalid("Expected a string"),
            }),
        )
        .build()
        .unwrap()
        .model();

    let result = model.validate("name", Some(json!("  beer  "))).await;
    assert_eq!(result.validated, Some(json!("beer")));
}

#[tokio::test]
async fn cross_field_reasons_land_on_the_sibling_property() {
    let model = Schema::builder()
        .property("prop", Property::lax(json!("")))
        .property(
            "prop2",
            Property::required().validator(|_, _| {
                Validity::invalid("bad").with_other_reason("prop", "Invalid Prop")
            }),
        )
        .build()
        .unwrap()
        .model();

    let error = model
        .create(record([("prop2", json!("anything"))]))
        .await
        .unwrap_err();
    assert_eq!(error.payload["prop2"], vec!["bad"]);
    assert_eq!(error.payload["prop"], vec!["Invalid Prop"]);
}

#[tokio::test]
async fn invalid_input_falls_back_to_the_default_but_still_fails() {
    let model = prop_schema().model();

    let error = model
        .create(record([("prop", json!("nope"))]))
        .await
        .unwrap_err();
    assert_eq!(error.message, "Validation Error");
    assert_eq!(error.payload["prop"], vec!["Invalid prop"]);
}
