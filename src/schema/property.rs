//! Property definitions: the per-property rule set a schema is built from.
//!
//! A [`Property`] bundles every rule the engine understands: defaults,
//! required/readonly behavior, constants, dependent resolution, side-effect
//! (virtual) triggers, validators and lifecycle listeners. Constructors
//! produce the legal starting shapes (`Property::lax`, `Property::constant`,
//! `Property::side_effect`, ...) and builder methods layer the rest on; the
//! definition checker rejects illegal combinations at schema build time.
//!
//! All user callbacks are async-capable. Synchronous closures are accepted
//! through the plain builder methods and wrapped in ready futures; `_async`
//! variants take future-returning closures directly.

use crate::model::context::Context;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future alias used by all stored callbacks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Partial record returned by listeners to contribute further property values.
pub type Partial = BTreeMap<String, Value>;

/// Validator callback: `(value, context) -> Validity`.
pub type ValidatorFn = Arc<dyn Fn(Value, Context) -> BoxFuture<'static, Validity> + Send + Sync>;
/// Change/lifecycle listener: `(context) -> Partial` of further values.
pub type ListenerFn = Arc<dyn Fn(Context) -> BoxFuture<'static, Partial> + Send + Sync>;
/// Dependent-property resolver: `(context) -> Value`.
pub type ResolverFn = Arc<dyn Fn(Context) -> BoxFuture<'static, Value> + Send + Sync>;
/// Conditional-required predicate: `(context) -> RequiredVerdict`.
pub type RequiredFn =
    Arc<dyn Fn(Context) -> BoxFuture<'static, RequiredVerdict> + Send + Sync>;
/// Value producer for computed defaults and constants.
pub type ProducerFn = Arc<dyn Fn(Context) -> BoxFuture<'static, Value> + Send + Sync>;
/// Boolean gate for conditional initialization.
pub type GateFn = Arc<dyn Fn(Context) -> BoxFuture<'static, bool> + Send + Sync>;

/// Closed validator result.
///
/// Validators return one of these variants; there is no runtime shape
/// inspection. A bare `bool` converts via `From`: `true` passes the input
/// through, `false` fails with the generic reason.
#[derive(Debug, Clone)]
pub enum Validity {
    /// Accepted. `value: Some(v)` adopts `v` as the validated value;
    /// `None` passes the supplied value through unchanged.
    Valid { value: Option<Value> },
    /// Rejected, with reasons for this property and optionally cross-field
    /// reasons charged against sibling properties.
    Invalid {
        reasons: Vec<String>,
        other_reasons: BTreeMap<String, Vec<String>>,
    },
}

impl Validity {
    /// Accept, adopting the given value as the validated value.
    pub fn valid(value: impl Into<Value>) -> Self {
        Self::Valid {
            value: Some(value.into()),
        }
    }

    /// Accept, keeping the supplied value unchanged.
    pub fn pass() -> Self {
        Self::Valid { value: None }
    }

    /// Reject with a single reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reasons: vec![reason.into()],
            other_reasons: BTreeMap::new(),
        }
    }

    /// Reject with several reasons, preserving order.
    pub fn invalid_many<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Invalid {
            reasons: reasons.into_iter().map(Into::into).collect(),
            other_reasons: BTreeMap::new(),
        }
    }

    /// Reject with the generic reason.
    pub fn fail() -> Self {
        Self::invalid("validation failed")
    }

    /// Charge an additional reason against a sibling property.
    ///
    /// Only meaningful on the `Invalid` variant; a no-op on `Valid`.
    pub fn with_other_reason(
        mut self,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        if let Self::Invalid { other_reasons, .. } = &mut self {
            other_reasons
                .entry(property.into())
                .or_default()
                .push(reason.into());
        }
        self
    }
}

impl From<bool> for Validity {
    fn from(ok: bool) -> Self {
        if ok { Self::pass() } else { Self::fail() }
    }
}

/// Verdict of a conditional-required predicate.
#[derive(Debug, Clone, Default)]
pub struct RequiredVerdict {
    pub required: bool,
    pub message: Option<String>,
}

impl From<bool> for RequiredVerdict {
    fn from(required: bool) -> Self {
        Self {
            required,
            message: None,
        }
    }
}

impl From<(bool, &str)> for RequiredVerdict {
    fn from((required, message): (bool, &str)) -> Self {
        Self {
            required,
            message: Some(message.to_string()),
        }
    }
}

impl From<(bool, String)> for RequiredVerdict {
    fn from((required, message): (bool, String)) -> Self {
        Self {
            required,
            message: Some(message),
        }
    }
}

/// Required rule: absent, strict, or gated on a context predicate.
#[derive(Clone, Default)]
pub enum Required {
    #[default]
    No,
    Always,
    When(RequiredFn),
}

/// Readonly rule. `Lax` is settable once but not required at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readonly {
    #[default]
    No,
    Yes,
    Lax,
}

/// Whether a property participates at creation time.
#[derive(Clone, Default)]
pub enum ShouldInit {
    /// Not specified; treated as participating.
    #[default]
    Unset,
    Always,
    Never,
    When(GateFn),
}

impl ShouldInit {
    /// True unless initialization is explicitly blocked.
    pub(crate) fn is_not_blocked(&self) -> bool {
        !matches!(self, Self::Never)
    }

    pub(crate) fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }
}

/// Default value: a fixed value or a context-consuming producer.
#[derive(Clone)]
pub enum DefaultValue {
    Fixed(Value),
    Computed(ProducerFn),
}

/// Constant value: a fixed value or a context-consuming generator.
#[derive(Clone)]
pub enum ConstantValue {
    Fixed(Value),
    Computed(ProducerFn),
}

/// One property's complete rule set.
#[derive(Clone, Default)]
pub struct Property {
    pub(crate) default: Option<DefaultValue>,
    pub(crate) required: Required,
    pub(crate) readonly: Readonly,
    pub(crate) dependent: bool,
    pub(crate) depends_on: Vec<String>,
    pub(crate) resolver: Option<ResolverFn>,
    pub(crate) constant: Option<ConstantValue>,
    pub(crate) side_effect: bool,
    pub(crate) should_init: ShouldInit,
    pub(crate) validator: Option<ValidatorFn>,
    pub(crate) on_create: Vec<ListenerFn>,
    pub(crate) on_update: Vec<ListenerFn>,
    pub(crate) on_delete: Vec<ListenerFn>,
    pub(crate) on_success: Vec<ListenerFn>,
}

impl Property {
    /// A freely settable property with a default value.
    pub fn lax(default: impl Into<Value>) -> Self {
        Self {
            default: Some(DefaultValue::Fixed(default.into())),
            ..Self::default()
        }
    }

    /// A strictly required property: must be supplied at creation.
    pub fn required() -> Self {
        Self {
            required: Required::Always,
            ..Self::default()
        }
    }

    /// A readonly property: settable at most once across its lifetime.
    pub fn readonly() -> Self {
        Self {
            readonly: Readonly::Yes,
            ..Self::default()
        }
    }

    /// A lax readonly property: settable once, not required at creation.
    pub fn readonly_lax(default: impl Into<Value>) -> Self {
        Self {
            readonly: Readonly::Lax,
            default: Some(DefaultValue::Fixed(default.into())),
            ..Self::default()
        }
    }

    /// A derived property: never directly settable, always has a default.
    pub fn dependent(default: impl Into<Value>) -> Self {
        Self {
            dependent: true,
            default: Some(DefaultValue::Fixed(default.into())),
            ..Self::default()
        }
    }

    /// A constant property with a fixed value.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self {
            constant: Some(ConstantValue::Fixed(value.into())),
            ..Self::default()
        }
    }

    /// A constant property whose value is generated from the context.
    pub fn computed_constant<F>(generator: F) -> Self
    where
        F: Fn(Context) -> Value + Send + Sync + 'static,
    {
        Self {
            constant: Some(ConstantValue::Computed(Arc::new(move |ctx| {
                Box::pin(std::future::ready(generator(ctx)))
            }))),
            ..Self::default()
        }
    }

    /// As [`Property::computed_constant`], with an async generator.
    pub fn computed_constant_async<F, Fut>(generator: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        Self {
            constant: Some(ConstantValue::Computed(Arc::new(move |ctx| {
                Box::pin(generator(ctx))
            }))),
            ..Self::default()
        }
    }

    /// A side-effect (virtual) property: accepted as input, never emitted,
    /// exists only to drive its listener chain.
    pub fn side_effect() -> Self {
        Self {
            side_effect: true,
            ..Self::default()
        }
    }

    /// Attach a default value to an existing shape.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Fixed(default.into()));
        self
    }

    /// Attach a context-computed default.
    pub fn with_default_fn<F>(mut self, producer: F) -> Self
    where
        F: Fn(Context) -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Computed(Arc::new(move |ctx| {
            Box::pin(std::future::ready(producer(ctx)))
        })));
        self
    }

    /// Mark the property readonly (used with [`Property::dependent`]).
    pub fn readonly_too(mut self) -> Self {
        self.readonly = Readonly::Yes;
        self
    }

    /// Gate the property on a conditional-required predicate.
    pub fn required_when<F, V>(mut self, predicate: F) -> Self
    where
        F: Fn(Context) -> V + Send + Sync + 'static,
        V: Into<RequiredVerdict>,
    {
        self.required = Required::When(Arc::new(move |ctx| {
            Box::pin(std::future::ready(predicate(ctx).into()))
        }));
        self
    }

    /// As [`Property::required_when`], with an async predicate.
    pub fn required_when_async<F, Fut, V>(mut self, predicate: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
        V: Into<RequiredVerdict>,
    {
        self.required = Required::When(Arc::new(move |ctx| {
            let fut = predicate(ctx);
            Box::pin(async move { fut.await.into() })
        }));
        self
    }

    /// Explicitly allow or block participation at creation time.
    pub fn should_init(mut self, init: bool) -> Self {
        self.should_init = if init {
            ShouldInit::Always
        } else {
            ShouldInit::Never
        };
        self
    }

    /// Gate creation-time participation on a context predicate.
    pub fn should_init_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(Context) -> bool + Send + Sync + 'static,
    {
        self.should_init = ShouldInit::When(Arc::new(move |ctx| {
            Box::pin(std::future::ready(predicate(ctx)))
        }));
        self
    }

    /// Attach a validator.
    pub fn validator<F, V>(mut self, validator: F) -> Self
    where
        F: Fn(Value, Context) -> V + Send + Sync + 'static,
        V: Into<Validity>,
    {
        self.validator = Some(Arc::new(move |value, ctx| {
            Box::pin(std::future::ready(validator(value, ctx).into()))
        }));
        self
    }

    /// As [`Property::validator`], with an async validator.
    pub fn validator_async<F, Fut, V>(mut self, validator: F) -> Self
    where
        F: Fn(Value, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
        V: Into<Validity>,
    {
        self.validator = Some(Arc::new(move |value, ctx| {
            let fut = validator(value, ctx);
            Box::pin(async move { fut.await.into() })
        }));
        self
    }

    /// Declare the trigger properties and resolver of a dependent property.
    pub fn depends_on<I, S, F>(mut self, triggers: I, resolver: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Context) -> Value + Send + Sync + 'static,
    {
        self.depends_on = triggers.into_iter().map(Into::into).collect();
        self.resolver = Some(Arc::new(move |ctx| {
            Box::pin(std::future::ready(resolver(ctx)))
        }));
        self
    }

    /// As [`Property::depends_on`], with an async resolver.
    pub fn depends_on_async<I, S, F, Fut>(mut self, triggers: I, resolver: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        self.depends_on = triggers.into_iter().map(Into::into).collect();
        self.resolver = Some(Arc::new(move |ctx| Box::pin(resolver(ctx))));
        self
    }

    /// Append a creation lifecycle hook.
    pub fn on_create<F>(self, listener: F) -> Self
    where
        F: Fn(Context) -> Partial + Send + Sync + 'static,
    {
        self.push_listener(Hook::Create, wrap_listener(listener))
    }

    /// Append an async creation lifecycle hook.
    pub fn on_create_async<F, Fut>(self, listener: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Partial> + Send + 'static,
    {
        self.push_listener(Hook::Create, wrap_listener_async(listener))
    }

    /// Append a change listener, fired when this property's value changes.
    pub fn on_update<F>(self, listener: F) -> Self
    where
        F: Fn(Context) -> Partial + Send + Sync + 'static,
    {
        self.push_listener(Hook::Update, wrap_listener(listener))
    }

    /// Append an async change listener.
    pub fn on_update_async<F, Fut>(self, listener: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Partial> + Send + 'static,
    {
        self.push_listener(Hook::Update, wrap_listener_async(listener))
    }

    /// Append a deletion hook.
    pub fn on_delete<F>(self, listener: F) -> Self
    where
        F: Fn(Context) -> Partial + Send + Sync + 'static,
    {
        self.push_listener(Hook::Delete, wrap_listener(listener))
    }

    /// Append an async deletion hook.
    pub fn on_delete_async<F, Fut>(self, listener: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Partial> + Send + 'static,
    {
        self.push_listener(Hook::Delete, wrap_listener_async(listener))
    }

    /// Append a success hook, fired after a committed operation.
    pub fn on_success<F>(self, listener: F) -> Self
    where
        F: Fn(Context) -> Partial + Send + Sync + 'static,
    {
        self.push_listener(Hook::Success, wrap_listener(listener))
    }

    /// Append an async success hook.
    pub fn on_success_async<F, Fut>(self, listener: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Partial> + Send + 'static,
    {
        self.push_listener(Hook::Success, wrap_listener_async(listener))
    }

    fn push_listener(mut self, hook: Hook, listener: ListenerFn) -> Self {
        match hook {
            Hook::Create => self.on_create.push(listener),
            Hook::Update => self.on_update.push(listener),
            Hook::Delete => self.on_delete.push(listener),
            Hook::Success => self.on_success.push(listener),
        }
        self
    }

    pub(crate) fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    pub(crate) fn has_change_listeners(&self) -> bool {
        !self.on_update.is_empty()
    }
}

enum Hook {
    Create,
    Update,
    Delete,
    Success,
}

fn wrap_listener<F>(listener: F) -> ListenerFn
where
    F: Fn(Context) -> Partial + Send + Sync + 'static,
{
    Arc::new(move |ctx| Box::pin(std::future::ready(listener(ctx))))
}

fn wrap_listener_async<F, Fut>(listener: F) -> ListenerFn
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Partial> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(listener(ctx)))
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("default", &self.default.is_some())
            .field("required", &matches!(self.required, Required::Always))
            .field("readonly", &self.readonly)
            .field("dependent", &self.dependent)
            .field("depends_on", &self.depends_on)
            .field("constant", &self.constant.is_some())
            .field("side_effect", &self.side_effect)
            .field("validator", &self.validator.is_some())
            .field("on_create", &self.on_create.len())
            .field("on_update", &self.on_update.len())
            .field("on_delete", &self.on_delete.len())
            .field("on_success", &self.on_success.len())
            .finish()
    }
}
