//! Strict and conditional required properties.

use crate::common::record;
use schema_model::{Context, Property, Record, Schema, Validity};
use serde_json::{Value, json};

fn validate_price(value: Value, _ctx: Context) -> Validity {
    match value.as_f64() {
        Some(_) => Validity::pass(),
        None if value.is_null() => Validity::pass(),
        None => Validity::invalid("Expected a number"),
    }
}

fn book_schema() -> Schema {
    Schema::builder()
        .property("bookId", Property::required().validator(|v, _| !v.is_null()))
        .property("isPublished", Property::lax(json!(false)))
        .property(
            "price",
            Property::lax(json!(null))
                .required_when(|ctx| {
                    let required =
                        ctx.bool_of("isPublished").unwrap_or(false) && ctx.is_missing("price");
                    (required, "A price is required to publish a book!")
                })
                .validator(validate_price),
        )
        .property(
            "priceReadonly",
            Property::readonly_lax(json!(null))
                .required_when(|ctx| {
                    let required = ctx.f64_of("price") == Some(101.0)
                        && ctx.is_missing("priceReadonly");
                    (required, "A priceReadonly is required when price is 101!")
                })
                .validator(validate_price),
        )
        .property(
            "priceRequiredWithoutMessage",
            Property::readonly_lax(json!(null))
                .required_when(|ctx| {
                    ctx.f64_of("price") == Some(101.0) && ctx.is_missing("priceReadonly")
                })
                .validator(validate_price),
        )
        .build()
        .unwrap()
}

async fn created_book() -> Record {
    book_schema()
        .model()
        .create(record([("bookId", json!(1))]))
        .await
        .unwrap()
}

#[tokio::test]
async fn creates_normally_when_not_required() {
    let book = created_book().await;
    assert_eq!(
        book,
        record([
            ("bookId", json!(1)),
            ("isPublished", json!(false)),
            ("price", json!(null)),
            ("priceReadonly", json!(null)),
            ("priceRequiredWithoutMessage", json!(null)),
        ])
    );
}

#[tokio::test]
async fn passes_when_the_condition_is_met_at_creation() {
    let book = book_schema()
        .model()
        .create(record([
            ("bookId", json!(1)),
            ("isPublished", json!(true)),
            ("price", json!(2000)),
        ]))
        .await
        .unwrap();
    assert_eq!(book["price"], json!(2000));
}

#[tokio::test]
async fn rejects_when_the_condition_is_not_met_at_creation() {
    let error = book_schema()
        .model()
        .create(record([("bookId", json!(1)), ("isPublished", json!(true))]))
        .await
        .unwrap_err();
    assert_eq!(error.message, "Validation Error");
    assert_eq!(
        error.payload["price"],
        vec!["A price is required to publish a book!"]
    );
}

#[tokio::test]
async fn conditional_requireds_apply_during_cloning() {
    let model = book_schema().model();

    let seed = record([
        ("bookId", json!(1)),
        ("isPublished", json!(true)),
        ("price", json!(2000)),
    ]);
    let clone = model
        .clone_record(&seed, Default::default())
        .await
        .unwrap();
    assert_eq!(clone["price"], json!(2000));

    let seed = record([("bookId", json!(1)), ("isPublished", json!(true))]);
    let error = model
        .clone_record(&seed, Default::default())
        .await
        .unwrap_err();
    assert_eq!(
        error.payload["price"],
        vec!["A price is required to publish a book!"]
    );
}

#[tokio::test]
async fn conditional_requireds_apply_during_updates() {
    let model = book_schema().model();
    let book = created_book().await;

    let updated = model
        .update(
            &book,
            record([("isPublished", json!(true)), ("price", json!(20))]),
        )
        .await
        .unwrap();
    assert_eq!(
        updated,
        record([("isPublished", json!(true)), ("price", json!(20))])
    );

    let error = model
        .update(&book, record([("isPublished", json!(true))]))
        .await
        .unwrap_err();
    assert_eq!(
        error.payload["price"],
        vec!["A price is required to publish a book!"]
    );
}

#[tokio::test]
async fn readonly_condition_chains_during_updates() {
    let model = book_schema().model();
    let book = created_book().await;

    // both readonly props become required when price lands on 101
    let error = model
        .update(&book, record([("price", json!(101))]))
        .await
        .unwrap_err();
    assert_eq!(
        error.payload["priceReadonly"],
        vec!["A priceReadonly is required when price is 101!"]
    );
    assert_eq!(
        error.payload["priceRequiredWithoutMessage"],
        vec!["'priceRequiredWithoutMessage' is required!"]
    );

    // satisfying the condition lets both through
    let updated = model
        .update(
            &book,
            record([("price", json!(101)), ("priceReadonly", json!(201))]),
        )
        .await
        .unwrap();
    assert_eq!(
        updated,
        record([("price", json!(101)), ("priceReadonly", json!(201))])
    );
}

#[tokio::test]
async fn readonly_conditional_prop_is_settable_only_once() {
    let model = book_schema().model();
    let mut book = created_book().await;
    book.insert("priceReadonly".into(), json!(201));

    let error = model
        .update(&book, record([("priceReadonly", json!(101))]))
        .await
        .unwrap_err();
    assert_eq!(error.message, "Nothing to update");
}

#[tokio::test]
async fn missing_strict_required_gets_the_generic_message() {
    let error = book_schema().model().create(Record::new()).await.unwrap_err();
    assert_eq!(error.payload["bookId"], vec!["'bookId' is required!"]);
}
