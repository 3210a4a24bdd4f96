//! Constant properties: fixed values, generators, and immunity to input.

use crate::common::record;
use schema_model::{CloneOptions, Property, Record, Schema};
use serde_json::json;

fn user_schema() -> Schema {
    Schema::builder()
        .property(
            "asyncConstant",
            Property::computed_constant_async(|_| async { json!(20) }),
        )
        .property(
            "id",
            Property::computed_constant(|ctx| {
                if ctx.str_of("id") == Some("id") {
                    json!("id-2")
                } else {
                    json!("id")
                }
            }),
        )
        .property("parentId", Property::constant(json!("parent id")))
        .property("laxProp", Property::lax(json!(0)))
        .build()
        .unwrap()
}

async fn created_user() -> Record {
    user_schema()
        .model()
        .create(record([
            ("id", json!(2)),
            ("parentId", json!([])),
            ("laxProp", json!(2)),
        ]))
        .await
        .unwrap()
}

#[tokio::test]
async fn constants_are_set_at_creation_and_ignore_input() {
    let user = created_user().await;
    assert_eq!(
        user,
        record([
            ("asyncConstant", json!(20)),
            ("id", json!("id")),
            ("laxProp", json!(2)),
            ("parentId", json!("parent id")),
        ])
    );
}

#[tokio::test]
async fn constant_generators_see_the_seed_during_cloning() {
    let model = user_schema().model();
    let user = created_user().await;

    let clone = model
        .clone_record(&user, CloneOptions::reset(["laxProp"]))
        .await
        .unwrap();
    assert_eq!(
        clone,
        record([
            ("asyncConstant", json!(20)),
            ("id", json!("id-2")),
            ("laxProp", json!(0)),
            ("parentId", json!("parent id")),
        ])
    );
}

#[tokio::test]
async fn constants_are_ignored_during_updates() {
    let model = user_schema().model();
    let user = created_user().await;

    let updated = model
        .update(&user, record([("laxProp", json!("update id"))]))
        .await
        .unwrap();
    assert_eq!(updated, record([("laxProp", json!("update id"))]));

    let error = model
        .update(&user, record([("id", json!(25))]))
        .await
        .unwrap_err();
    assert_eq!(error.message, "Nothing to update");
}
