//! Value resolvers: convert the values of logical attributes between their logical and protocol
//! forms, folding aggregation groups and collecting generator side operations.
//!
//! One resolver exists per value container shape:
//! - [`AttributeValueResolver`] for an attribute → value(s) map
//! - [`BatchValueResolver`] for the batches of a batch-modify operation
//! - [`OperatorValueResolver`] for the leaves of a filter operator tree
//!
//! They share a [`ResolverCore`], which is created for a single hydration call and never reused.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, trace};

use crate::connection::ConnectionContext;
use crate::converter::{AttributeConverter, ConverterContext, ConverterOptions, ConverterRegistry, OperationType};
use crate::encoding::WireEncoding;
use crate::errors::HydrateResult;
use crate::filter::MatchingRuleAssertion;
use crate::operation::{BatchAction, Operation};
use crate::schema::{DEFAULT_OPTIONS_SCOPE, SchemaLookup};
use crate::value::{AttributeMap, Value, find_key};

mod attributes;
mod batches;
mod operators;

pub use attributes::AttributeValueResolver;
pub use batches::BatchValueResolver;
pub use operators::OperatorValueResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToProtocol,
    FromProtocol,
}

/// Values of one group member, fed to [`AttributeConverter::aggregate`] in order.
#[derive(Debug, Clone)]
pub(crate) struct AggregationInput {
    pub attribute: String,
    pub action: Option<BatchAction>,
    pub values: Vec<Value>,
}

/// State shared by every resolver variant for the duration of one hydration call.
pub struct ResolverCore<'a> {
    registry: &'a ConverterRegistry,
    schema: &'a dyn SchemaLookup,
    operation_type: OperationType,
    connection: Option<&'a dyn ConnectionContext>,
    dn: Option<String>,
    encoding: Option<WireEncoding>,
    /// Lower-cased logical attributes already folded into an aggregated value.
    aggregated: HashSet<String>,
    /// Lower-cased physical attributes already produced by a fold in this pass.
    aggregated_targets: HashSet<String>,
    /// Values the entry holds before the operation, keyed by physical attribute.
    current: AttributeMap,
    /// Lower-cased logical attributes a generator asked to strip from the operation.
    removals: HashSet<String>,
    queued: Vec<Operation>,
}

impl<'a> ResolverCore<'a> {
    pub fn new(
        registry: &'a ConverterRegistry,
        schema: &'a dyn SchemaLookup,
        operation_type: OperationType,
        connection: Option<&'a dyn ConnectionContext>,
    ) -> HydrateResult<Self> {
        let encoding = match connection {
            Some(connection) if operation_type != OperationType::SearchFromWire => {
                let name = connection.encoding();
                if name.trim().is_empty() {
                    None
                } else {
                    Some(name.parse::<WireEncoding>()?)
                }
            }
            _ => None,
        };
        Ok(Self {
            registry,
            schema,
            operation_type,
            connection,
            dn: None,
            encoding,
            aggregated: HashSet::new(),
            aggregated_targets: HashSet::new(),
            current: AttributeMap::new(),
            removals: HashSet::new(),
            queued: Vec::new(),
        })
    }

    pub fn with_dn(mut self, dn: Option<String>) -> Self {
        self.dn = dn;
        self
    }

    /// Current values of the entry, which aggregation folds start from.
    pub fn with_current_values(mut self, current: AttributeMap) -> Self {
        self.current = current;
        self
    }

    pub fn schema(&self) -> &'a dyn SchemaLookup {
        self.schema
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn dn(&self) -> Option<&str> {
        self.dn.as_deref()
    }

    /// Encoding applied to values converted toward the protocol, when a connection declares one.
    pub fn encoding(&self) -> Option<WireEncoding> {
        self.encoding
    }

    pub fn is_removed(&self, attribute: &str) -> bool {
        self.removals.contains(&attribute.to_ascii_lowercase())
    }

    pub fn is_aggregated(&self, attribute: &str) -> bool {
        self.aggregated.contains(&attribute.to_ascii_lowercase())
    }

    /// Whether the physical attribute behind `attribute` has already been folded in this pass.
    pub fn is_target_aggregated(&self, attribute: &str) -> bool {
        let physical = self.schema.physical_name(attribute);
        self.aggregated_targets.contains(&physical.to_ascii_lowercase())
    }

    /// Whether `converter` folds group members for this call's operation type.
    fn aggregates(&self, converter: &dyn AttributeConverter) -> bool {
        self.operation_type != OperationType::SearchFromWire && converter.aggregates(self.operation_type)
    }

    /// Side operations queued by generator converters, in the order they were produced.
    pub fn take_queued_operations(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.queued)
    }

    /// Converter identifier and instance for `attribute`, if the schema assigns one.
    fn converter_for(&self, attribute: &str) -> HydrateResult<Option<(String, Arc<dyn AttributeConverter>)>> {
        match self.schema.converter_name(attribute) {
            Some(name) => {
                let converter = self.registry.get(&name)?;
                Ok(Some((name, converter)))
            }
            None => Ok(None),
        }
    }

    /// `_default` options overlaid with the options scoped to `attribute`.
    fn options(&self, converter: &str, attribute: &str) -> ConverterOptions {
        let mut options = self.schema.converter_options(converter, DEFAULT_OPTIONS_SCOPE);
        options.extend(self.schema.converter_options(converter, attribute));
        options
    }

    fn context<'c>(
        &'c self,
        attribute: &'c str,
        options: &'c ConverterOptions,
        batch_action: Option<BatchAction>,
    ) -> ConverterContext<'c> {
        ConverterContext {
            attribute,
            options,
            operation_type: self.operation_type,
            connection: self.connection,
            dn: self.dn.as_deref(),
            batch_action,
        }
    }

    /// Logical attributes sharing both `converter` and the physical attribute of `attribute`.
    fn aggregation_group(&self, attribute: &str, converter: &str) -> Vec<String> {
        let physical = self.schema.physical_name(attribute);
        let group: Vec<String> = self
            .schema
            .attributes_for_converter(converter)
            .into_iter()
            .filter(|member| self.schema.physical_name(member).eq_ignore_ascii_case(&physical))
            .collect();
        debug!("aggregation group for {attribute} via {converter} onto {physical}: {group:?}");
        group
    }

    /// Fold every input into one physical value and mark the inputs consumed. The fold starts from
    /// the entry's current value of the physical attribute when one is known.
    fn aggregate(
        &mut self,
        converter_name: &str,
        converter: &dyn AttributeConverter,
        inputs: Vec<AggregationInput>,
    ) -> HydrateResult<Vec<Value>> {
        let mut accumulated = Vec::new();
        if let Some(first) = inputs.first() {
            let physical = self.schema.physical_name(&first.attribute);
            if let Some(key) = find_key(&self.current, &physical) {
                accumulated = self.current[key].clone().into_values();
                debug!("folding {physical} on top of its current value {accumulated:?}");
            }
            self.aggregated_targets.insert(physical.to_ascii_lowercase());
        }
        for input in inputs {
            let options = self.options(converter_name, &input.attribute);
            let ctx = self.context(&input.attribute, &options, input.action);
            accumulated = converter.aggregate(&ctx, accumulated, input.values)?;
            trace!("aggregated {} into {accumulated:?}", input.attribute);
            self.aggregated.insert(input.attribute.to_ascii_lowercase());
        }
        Ok(self.encode(accumulated))
    }

    /// Convert the values of one attribute without aggregation.
    fn convert(
        &mut self,
        attribute: &str,
        converter_name: &str,
        converter: &dyn AttributeConverter,
        values: Vec<Value>,
        direction: Direction,
        batch_action: Option<BatchAction>,
    ) -> HydrateResult<Vec<Value>> {
        let options = self.options(converter_name, attribute);
        let ctx = self.context(attribute, &options, batch_action);

        let mut queued = Vec::new();
        let mut remove = false;
        if direction == Direction::ToProtocol
            && let Some(generator) = converter.generator()
        {
            queued = generator.generate(&ctx, &values)?;
            remove = generator.removes_original_value(&ctx);
        }

        let converted = match (direction, converter.is_multi_valued()) {
            (Direction::ToProtocol, true) => converter.to_protocol_all(&ctx, values)?,
            (Direction::FromProtocol, true) => converter.from_protocol_all(&ctx, values)?,
            (Direction::ToProtocol, false) => values
                .into_iter()
                .map(|value| converter.to_protocol(&ctx, value))
                .collect::<Result<Vec<_>, _>>()?,
            (Direction::FromProtocol, false) => values
                .into_iter()
                .map(|value| converter.from_protocol(&ctx, value))
                .collect::<Result<Vec<_>, _>>()?,
        };
        trace!("converted {attribute} via {converter_name} ({direction:?}): {converted:?}");

        if !queued.is_empty() {
            debug!("{attribute} queued {} side operation(s)", queued.len());
            self.queued.extend(queued);
        }
        if remove {
            debug!("{attribute} will be removed from the operation");
            self.removals.insert(attribute.to_ascii_lowercase());
        }

        Ok(match direction {
            Direction::ToProtocol => self.encode(converted),
            Direction::FromProtocol => converted,
        })
    }

    /// Matching-rule assertion a converter substitutes for an equality leaf, with its value encoded.
    fn filter_assertion(
        &self,
        attribute: &str,
        converter_name: &str,
        converter: &dyn AttributeConverter,
        value: &Value,
    ) -> HydrateResult<Option<MatchingRuleAssertion>> {
        let options = self.options(converter_name, attribute);
        let ctx = self.context(attribute, &options, None);
        let Some(mut assertion) = converter.filter_assertion(&ctx, value)? else {
            return Ok(None);
        };
        trace!("{attribute} is tested with matching rule {}", assertion.rule);
        if let Some(encoded) = self.encode(vec![assertion.value.clone()]).pop() {
            assertion.value = encoded;
        }
        Ok(Some(assertion))
    }

    /// Resolve one attribute that takes part in no aggregation. Attributes without a converter
    /// pass through, encoded when heading to the protocol.
    fn resolve_plain(
        &mut self,
        attribute: &str,
        values: Vec<Value>,
        direction: Direction,
        batch_action: Option<BatchAction>,
    ) -> HydrateResult<Vec<Value>> {
        match self.converter_for(attribute)? {
            Some((name, converter)) => {
                self.convert(attribute, &name, converter.as_ref(), values, direction, batch_action)
            }
            None => Ok(match direction {
                Direction::ToProtocol => self.encode(values),
                Direction::FromProtocol => values,
            }),
        }
    }

    fn encode(&self, values: Vec<Value>) -> Vec<Value> {
        match self.encoding {
            Some(encoding) => encoding.encode_values(values),
            None => values,
        }
    }
}
