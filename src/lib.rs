//! Declarative schema engine for structured records.
//!
//! Given a map of per-property rules (required, readonly, default, constant,
//! dependent, virtual, side-effecting), a [`Schema`] produces a [`Model`]
//! capable of constructing, cloning and updating records while enforcing
//! validation, dependency resolution and lifecycle hooks. The engine is
//! persistence-agnostic and async-first: validators, resolvers and hooks may
//! all suspend, and every step is awaited in deterministic order.
//!
//! # Core Components
//!
//! - [`Schema`] / [`SchemaBuilder`] - checked property definitions
//! - [`Model`] - the create/clone/update/validate operations
//! - [`Property`] - one property's rule set
//! - [`Validity`] - the closed validator result variant
//!
//! # Quick Start
//!
//! ```rust
//! use schema_model::{Partial, Property, Record, Schema};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::builder()
//!     .property("quantity", Property::lax(json!(0)))
//!     .property(
//!         "crates",
//!         Property::side_effect()
//!             .validator(|v, _| v.is_array())
//!             .on_update(|ctx| {
//!                 let added: i64 = ctx
//!                     .get("crates")
//!                     .and_then(|v| v.as_array())
//!                     .map(|crates| {
//!                         crates
//!                             .iter()
//!                             .map(|c| {
//!                                 c["coefficient"].as_i64().unwrap_or(0)
//!                                     * c["qty"].as_i64().unwrap_or(0)
//!                             })
//!                             .sum()
//!                     })
//!                     .unwrap_or(0);
//!                 let quantity = ctx.i64_of("quantity").unwrap_or(0);
//!                 Partial::from([("quantity".to_string(), json!(quantity + added))])
//!             }),
//!     )
//!     .build()?;
//!
//! let model = schema.model();
//! let record = model
//!     .create(Record::from([(
//!         "crates".to_string(),
//!         json!([{ "coefficient": 12, "qty": 2 }]),
//!     )]))
//!     .await?;
//! assert_eq!(record["quantity"], json!(24));
//! # Ok(())
//! # }
//! # tokio_test::block_on(example()).unwrap();
//! ```

pub mod equality;
pub mod error;
pub mod model;
pub mod schema;

// Re-export commonly used types for convenience
pub use error::{
    ErrorBag, ErrorPayload, OperationError, OperationResult, SchemaError, SchemaResult,
};
pub use model::context::{Context, Record};
pub use model::invoker::Validation;
pub use model::{CloneOptions, Model};
pub use schema::property::{
    BoxFuture, Partial, Property, RequiredVerdict, Validity,
};
pub use schema::registry::{Definitions, PropertyRegistry, PropertyRole};
pub use schema::{ExtendOptions, ModelOptions, Schema, SchemaBuilder};
