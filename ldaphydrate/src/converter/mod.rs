//! Attribute converter contract and the registry converters are resolved from.
//!
//! Converters are stateless and shared. Everything that varies per call (options, operation type,
//! connection, DN, batch action) arrives through a [`ConverterContext`].
//!
//! Built-in converters register themselves through `inventory` and are collected by
//! [`ConverterRegistry::with_builtins`]. Additional converters are added with
//! [`ConverterRegistry::register`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::connection::ConnectionContext;
use crate::errors::{ConverterError, HydrateError, HydrateResult};
use crate::filter::MatchingRuleAssertion;
use crate::operation::{BatchAction, Operation};
use crate::value::Value;

pub mod flags;
pub mod membership;
pub mod scalar;

pub use flags::FlagsConverter;
pub use membership::GroupMembershipConverter;
pub use scalar::{
    BoolConverter, EncodeWindowsPasswordConverter, GeneralizedTimeConverter, IntConverter, WindowsTimeConverter,
};

/// Per-converter options from the schema.
pub type ConverterOptions = serde_json::Map<String, serde_json::Value>;

/// What kind of operation a conversion is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Create,
    Modify,
    /// Building a search request.
    SearchToWire,
    /// Reading search results back.
    SearchFromWire,
}

/// Everything a converter may consult for a single call.
#[derive(Clone, Copy)]
pub struct ConverterContext<'a> {
    pub attribute: &'a str,
    pub options: &'a ConverterOptions,
    pub operation_type: OperationType,
    pub connection: Option<&'a dyn ConnectionContext>,
    pub dn: Option<&'a str>,
    /// Action of the batch being converted, when converting a batch-modify operation.
    pub batch_action: Option<BatchAction>,
}

impl<'a> ConverterContext<'a> {
    pub fn option(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.options.get(key)
    }

    pub fn option_str(&self, key: &str) -> Option<&'a str> {
        self.options.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn option_i64(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(serde_json::Value::as_i64)
    }

    pub fn require_dn(&self) -> Result<&'a str, ConverterError> {
        self.dn.filter(|dn| !dn.is_empty()).ok_or_else(|| ConverterError::MissingDn {
            attribute: self.attribute.to_string(),
        })
    }

    pub fn invalid(&self, message: impl Into<String>) -> ConverterError {
        ConverterError::invalid(self.attribute, message)
    }
}

impl fmt::Debug for ConverterContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterContext")
            .field("attribute", &self.attribute)
            .field("options", &self.options)
            .field("operation_type", &self.operation_type)
            .field("has_connection", &self.connection.is_some())
            .field("dn", &self.dn)
            .field("batch_action", &self.batch_action)
            .finish()
    }
}

/// Translates one logical attribute's values to and from their protocol representation.
pub trait AttributeConverter: Send + Sync {
    fn to_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError>;

    fn from_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError>;

    /// Multi-valued converters receive and return the whole value set at once.
    fn is_multi_valued(&self) -> bool {
        false
    }

    fn to_protocol_all(&self, ctx: &ConverterContext<'_>, values: Vec<Value>) -> Result<Vec<Value>, ConverterError> {
        values.into_iter().map(|value| self.to_protocol(ctx, value)).collect()
    }

    fn from_protocol_all(&self, ctx: &ConverterContext<'_>, values: Vec<Value>) -> Result<Vec<Value>, ConverterError> {
        values.into_iter().map(|value| self.from_protocol(ctx, value)).collect()
    }

    /// Whether several logical attributes share one physical attribute through this converter
    /// for operations of `operation_type`.
    fn aggregates(&self, operation_type: OperationType) -> bool {
        let _ = operation_type;
        false
    }

    /// Fold the values of the logical attribute `ctx.attribute` into the physical value built so
    /// far. `accumulated` is empty for the first attribute of a group.
    fn aggregate(
        &self,
        ctx: &ConverterContext<'_>,
        accumulated: Vec<Value>,
        values: Vec<Value>,
    ) -> Result<Vec<Value>, ConverterError> {
        let _ = accumulated;
        self.to_protocol_all(ctx, values)
    }

    /// Assertion replacing an equality comparison on `ctx.attribute` in a search filter. `None`
    /// keeps the comparison and converts its value with [`to_protocol`](Self::to_protocol).
    fn filter_assertion(
        &self,
        ctx: &ConverterContext<'_>,
        value: &Value,
    ) -> Result<Option<MatchingRuleAssertion>, ConverterError> {
        let _ = (ctx, value);
        Ok(None)
    }

    fn generator(&self) -> Option<&dyn OperationGenerator> {
        None
    }
}

/// Converters that emit secondary operations as a side effect of conversion.
pub trait OperationGenerator: Send + Sync {
    /// Operations to queue for the caller, given the logical values being converted.
    fn generate(&self, ctx: &ConverterContext<'_>, values: &[Value]) -> Result<Vec<Operation>, ConverterError>;

    /// Whether the triggering attribute is stripped from the primary operation afterwards.
    fn removes_original_value(&self, ctx: &ConverterContext<'_>) -> bool {
        let _ = ctx;
        true
    }
}

/// Capability summary of a registered converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConverterCapabilities {
    pub multi_valued: bool,
    pub aggregates: bool,
    pub generates_operations: bool,
}

/// Built-in converter registration, collected through `inventory`.
pub struct ConverterRegistration {
    pub name: &'static str,
    pub build: fn() -> Arc<dyn AttributeConverter>,
}

inventory::collect!(ConverterRegistration);

/// Converter identifier → converter. Read-only while hydrating.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: BTreeMap<String, Arc<dyn AttributeConverter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in converter.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for registration in inventory::iter::<ConverterRegistration>() {
            registry
                .converters
                .insert(registration.name.to_string(), (registration.build)());
        }
        registry
    }

    /// Add or replace a converter.
    pub fn register(&mut self, name: impl Into<String>, converter: Arc<dyn AttributeConverter>) -> &mut Self {
        self.converters.insert(name.into(), converter);
        self
    }

    pub fn with(mut self, name: impl Into<String>, converter: Arc<dyn AttributeConverter>) -> Self {
        self.register(name, converter);
        self
    }

    pub fn get(&self, name: &str) -> HydrateResult<Arc<dyn AttributeConverter>> {
        self.converters
            .get(name)
            .cloned()
            .ok_or_else(|| HydrateError::configuration(format!("unknown attribute converter '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.converters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.converters.keys().map(String::as_str)
    }

    pub fn capabilities(&self, name: &str) -> Option<ConverterCapabilities> {
        self.converters.get(name).map(|converter| ConverterCapabilities {
            multi_valued: converter.is_multi_valued(),
            aggregates: converter.aggregates(OperationType::Create) || converter.aggregates(OperationType::Modify),
            generates_operations: converter.generator().is_some(),
        })
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.converters.keys().collect::<Vec<_>>())
            .finish()
    }
}
