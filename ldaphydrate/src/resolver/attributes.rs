use log::debug;

use super::{AggregationInput, Direction, ResolverCore};
use crate::errors::HydrateResult;
use crate::operation::Operation;
use crate::value::{AttributeMap, find_key};

/// Resolves a logical attribute → value(s) map, as carried by add operations and search results.
pub struct AttributeValueResolver<'a> {
    core: ResolverCore<'a>,
    values: AttributeMap,
}

impl<'a> AttributeValueResolver<'a> {
    pub fn new(core: ResolverCore<'a>, values: AttributeMap) -> Self {
        Self { core, values }
    }

    /// Convert every value toward the protocol. Keys stay logical; aggregation groups collapse onto
    /// the member that appears first, and generator-consumed attributes are dropped.
    pub fn to_protocol(&mut self) -> HydrateResult<AttributeMap> {
        self.resolve(Direction::ToProtocol)
    }

    pub fn from_protocol(&mut self) -> HydrateResult<AttributeMap> {
        self.resolve(Direction::FromProtocol)
    }

    pub fn core(&self) -> &ResolverCore<'a> {
        &self.core
    }

    pub fn take_queued_operations(&mut self) -> Vec<Operation> {
        self.core.take_queued_operations()
    }

    fn resolve(&mut self, direction: Direction) -> HydrateResult<AttributeMap> {
        let mut resolved = AttributeMap::new();
        for (attribute, value) in &self.values {
            if self.core.is_aggregated(attribute) {
                continue;
            }

            let converter = self.core.converter_for(attribute)?;
            let converted = match converter {
                Some((name, converter))
                    if direction == Direction::ToProtocol && self.core.aggregates(converter.as_ref()) =>
                {
                    let inputs = self.aggregation_inputs(attribute, &name);
                    value.reshaped(self.core.aggregate(&name, converter.as_ref(), inputs)?)
                }
                Some((name, converter)) => value.reshaped(self.core.convert(
                    attribute,
                    &name,
                    converter.as_ref(),
                    value.clone().into_values(),
                    direction,
                    None,
                )?),
                None => value.reshaped(self.core.resolve_plain(attribute, value.clone().into_values(), direction, None)?),
            };
            resolved.insert(attribute.clone(), converted);
        }

        resolved.retain(|attribute, _| {
            let keep = !self.core.is_removed(attribute);
            if !keep {
                debug!("dropping {attribute} consumed by a generator");
            }
            keep
        });
        Ok(resolved)
    }

    /// Values of every group member present in the map. Members missing from the map are skipped.
    fn aggregation_inputs(&self, attribute: &str, converter: &str) -> Vec<AggregationInput> {
        self.core
            .aggregation_group(attribute, converter)
            .iter()
            .filter_map(|member| find_key(&self.values, member))
            .map(|key| AggregationInput {
                attribute: key.to_string(),
                action: None,
                values: self.values[key].clone().into_values(),
            })
            .collect()
    }
}
