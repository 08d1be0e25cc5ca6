use log::debug;

use super::{AggregationInput, Direction, ResolverCore};
use crate::errors::HydrateResult;
use crate::operation::{Batch, BatchAction, Operation};

/// Resolves the batches of a batch-modify operation. Attribute names stay logical.
pub struct BatchValueResolver<'a> {
    core: ResolverCore<'a>,
    batches: Vec<Batch>,
}

impl<'a> BatchValueResolver<'a> {
    pub fn new(core: ResolverCore<'a>, batches: Vec<Batch>) -> Self {
        Self { core, batches }
    }

    /// Convert every batch toward the protocol. Every batch touching an aggregation group is folded
    /// into a single `replace` batch at the position of the first one.
    pub fn to_protocol(&mut self) -> HydrateResult<Vec<Batch>> {
        let mut resolved = Vec::with_capacity(self.batches.len());
        for batch in &self.batches {
            if self.core.is_aggregated(&batch.attribute) {
                continue;
            }

            let converter = self.core.converter_for(&batch.attribute)?;
            let batch = match converter {
                Some((name, converter)) if self.core.aggregates(converter.as_ref()) => {
                    let inputs = self.aggregation_inputs(&batch.attribute, &name);
                    let folded = self.core.aggregate(&name, converter.as_ref(), inputs)?;
                    Batch::new(BatchAction::Replace, batch.attribute.clone(), batch.values.reshaped(folded))
                }
                Some((name, converter)) => {
                    let converted = self.core.convert(
                        &batch.attribute,
                        &name,
                        converter.as_ref(),
                        batch.values.clone().into_values(),
                        Direction::ToProtocol,
                        Some(batch.action),
                    )?;
                    Batch::new(batch.action, batch.attribute.clone(), batch.values.reshaped(converted))
                }
                None => {
                    let converted = self.core.resolve_plain(
                        &batch.attribute,
                        batch.values.clone().into_values(),
                        Direction::ToProtocol,
                        Some(batch.action),
                    )?;
                    Batch::new(batch.action, batch.attribute.clone(), batch.values.reshaped(converted))
                }
            };
            resolved.push(batch);
        }

        resolved.retain(|batch| {
            let keep = !self.core.is_removed(&batch.attribute);
            if !keep {
                debug!("dropping {:?} batch on {} consumed by a generator", batch.action, batch.attribute);
            }
            keep
        });
        Ok(resolved)
    }

    pub fn core(&self) -> &ResolverCore<'a> {
        &self.core
    }

    pub fn take_queued_operations(&mut self) -> Vec<Operation> {
        self.core.take_queued_operations()
    }

    /// Every batch on a group member, in batch order, each carrying its own action.
    fn aggregation_inputs(&self, attribute: &str, converter: &str) -> Vec<AggregationInput> {
        let group = self.core.aggregation_group(attribute, converter);
        self.batches
            .iter()
            .filter(|batch| group.iter().any(|member| member.eq_ignore_ascii_case(&batch.attribute)))
            .map(|batch| AggregationInput {
                attribute: batch.attribute.clone(),
                action: Some(batch.action),
                values: batch.values.clone().into_values(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionConfig, ConnectionContext};
    use crate::converter::{ConverterRegistry, OperationType};
    use crate::resolver::test_support::user_schema;
    use crate::value::{AttributeValue, Value};

    const DN: &str = "cn=jdoe,ou=users,dc=example,dc=com";

    fn resolve(batches: Vec<Batch>, connection: Option<&dyn ConnectionContext>) -> (Vec<Batch>, Vec<Operation>) {
        let registry = ConverterRegistry::with_builtins();
        let schema = user_schema();
        let core = ResolverCore::new(&registry, &schema, OperationType::Modify, connection)
            .unwrap()
            .with_dn(Some(DN.to_string()));
        let mut resolver = BatchValueResolver::new(core, batches);
        let resolved = resolver.to_protocol().unwrap();
        (resolved, resolver.take_queued_operations())
    }

    #[test]
    fn converts_each_batch() {
        let (resolved, _) = resolve(
            vec![
                Batch::new(BatchAction::Replace, "enabled", false),
                Batch::new(BatchAction::Add, "emailAddress", "a@b.com"),
            ],
            None,
        );
        assert_eq!(resolved[0].values, AttributeValue::single("FALSE"));
        assert_eq!(resolved[1].action, BatchAction::Add);
        assert_eq!(resolved[1].values, AttributeValue::single("a@b.com"));
    }

    #[test]
    fn aggregated_batches_fold_into_one_replace() {
        let (resolved, _) = resolve(
            vec![
                Batch::new(BatchAction::Add, "disabled", true),
                Batch::new(BatchAction::Replace, "emailAddress", "a@b.com"),
                Batch::new(BatchAction::Replace, "passwordNeverExpires", true),
            ],
            None,
        );
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].attribute, "disabled");
        assert_eq!(resolved[0].action, BatchAction::Replace);
        assert_eq!(resolved[0].values, AttributeValue::single("66050"));
        assert_eq!(resolved[1].attribute, "emailAddress");
    }

    #[test]
    fn remove_batch_in_group_clears_bit() {
        let (resolved, _) = resolve(vec![Batch::new(BatchAction::Remove, "disabled", true)], None);
        assert_eq!(resolved[0].values, AttributeValue::single("512"));
    }

    #[test]
    fn generator_batches_are_dropped() {
        let (resolved, queued) = resolve(
            vec![
                Batch::new(BatchAction::Remove, "groups", AttributeValue::multi(["cn=ops,dc=example,dc=com"])),
                Batch::new(BatchAction::Replace, "firstName", "John"),
            ],
            None,
        );
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].attribute, "firstName");
        let Operation::BatchModify(op) = &queued[0] else {
            panic!("expected batch modify");
        };
        assert_eq!(op.batches[0].action, BatchAction::Remove);
        assert_eq!(op.batches[0].values, AttributeValue::multi([DN]));
    }

    #[test]
    fn values_are_encoded_for_the_connection() {
        let connection = ConnectionConfig::new("example.com").with_encoding("ISO-8859-1");
        let (resolved, _) = resolve(
            vec![Batch::new(BatchAction::Replace, "firstName", "Zoë")],
            Some(&connection),
        );
        assert_eq!(resolved[0].values, AttributeValue::Single(Value::Binary(vec![b'Z', b'o', 0xeb])));
    }
}
