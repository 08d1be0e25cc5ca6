use std::collections::HashSet;

use log::debug;

use super::{AggregationInput, Direction, ResolverCore};
use crate::errors::{ConverterError, HydrateResult};
use crate::filter::{Comparison, ComparisonKind, MatchingRuleAssertion, Operator, OperatorCollection};
use crate::operation::Operation;
use crate::value::Value;

/// Resolves the comparison leaves of a filter operator tree in place.
///
/// Leaves receive protocol values and physical attribute names. Aggregation only folds equality
/// leaves that are siblings under a conjunction (the collection itself or an `and` node), and each
/// physical attribute is folded at most once per call; group members met later in the tree are
/// converted on their own. A converter may swap an equality leaf for a matching-rule assertion.
/// Leaves qualified with an alias other than the resolver's are left untouched.
pub struct OperatorValueResolver<'a> {
    core: ResolverCore<'a>,
    alias: Option<String>,
}

/// What a leaf becomes once converted.
enum ResolvedLeaf {
    /// Present assertions keep their shape.
    Unchanged,
    Value(Value),
    /// A fold produced several values, each of which must match.
    AllOf(Vec<Value>),
    Assertion(MatchingRuleAssertion),
}

impl<'a> OperatorValueResolver<'a> {
    pub fn new(core: ResolverCore<'a>, alias: Option<&str>) -> Self {
        Self {
            core,
            alias: alias.map(str::to_string),
        }
    }

    pub fn to_protocol(&mut self, collection: &mut OperatorCollection) -> HydrateResult<()> {
        self.resolve_siblings(&mut collection.operators, true)
    }

    pub fn core(&self) -> &ResolverCore<'a> {
        &self.core
    }

    pub fn take_queued_operations(&mut self) -> Vec<Operation> {
        self.core.take_queued_operations()
    }

    fn resolve_siblings(&mut self, operators: &mut Vec<Operator>, conjunctive: bool) -> HydrateResult<()> {
        // Lower-cased attributes whose equality leaves were folded into an earlier sibling.
        let mut folded: HashSet<String> = HashSet::new();
        let mut dropped = vec![false; operators.len()];

        for index in 0..operators.len() {
            let comparison = match &mut operators[index] {
                Operator::And(children) => {
                    self.resolve_siblings(children, true)?;
                    continue;
                }
                Operator::Or(children) => {
                    self.resolve_siblings(children, false)?;
                    continue;
                }
                Operator::Not(inner) => {
                    self.resolve_negated(inner)?;
                    continue;
                }
                Operator::Comparison(comparison) => comparison.clone(),
            };
            if !comparison.in_scope(self.alias.as_deref()) {
                continue;
            }
            if comparison.kind == ComparisonKind::Equals && folded.contains(&comparison.attribute.to_ascii_lowercase()) {
                dropped[index] = true;
                continue;
            }

            let resolved = self.resolve_leaf(&operators[..], index, &comparison, conjunctive, &mut folded)?;
            if self.core.is_removed(&comparison.attribute) {
                dropped[index] = true;
                continue;
            }

            let mut leaf = comparison;
            leaf.attribute = self.core.schema().physical_name(&leaf.attribute);
            operators[index] = match resolved {
                ResolvedLeaf::Unchanged => Operator::Comparison(leaf),
                ResolvedLeaf::Value(value) => {
                    leaf.value = value;
                    Operator::Comparison(leaf)
                }
                ResolvedLeaf::AllOf(values) => Operator::And(
                    values
                        .into_iter()
                        .map(|value| Operator::Comparison(Comparison { value, ..leaf.clone() }))
                        .collect(),
                ),
                ResolvedLeaf::Assertion(assertion) => {
                    leaf.kind = ComparisonKind::Extensible;
                    leaf.rule = Some(assertion.rule);
                    leaf.value = assertion.value;
                    if assertion.negated {
                        Operator::not(Operator::Comparison(leaf))
                    } else {
                        Operator::Comparison(leaf)
                    }
                }
            };
        }

        let mut position = 0;
        operators.retain(|_| {
            let keep = !dropped[position];
            position += 1;
            keep
        });
        Ok(())
    }

    /// Resolve the single child of a `not` node. A removed child leaves an empty `and`, which
    /// renders as nothing.
    fn resolve_negated(&mut self, inner: &mut Box<Operator>) -> HydrateResult<()> {
        let child = std::mem::replace(inner.as_mut(), Operator::And(Vec::new()));
        let mut siblings = vec![child];
        self.resolve_siblings(&mut siblings, false)?;
        if let Some(child) = siblings.pop() {
            **inner = child;
        }
        Ok(())
    }

    fn resolve_leaf(
        &mut self,
        siblings: &[Operator],
        index: usize,
        comparison: &Comparison,
        conjunctive: bool,
        folded: &mut HashSet<String>,
    ) -> HydrateResult<ResolvedLeaf> {
        if !comparison.has_value() {
            return Ok(ResolvedLeaf::Unchanged);
        }
        let attribute = comparison.attribute.as_str();
        let equality = comparison.kind == ComparisonKind::Equals;

        let converted = match self.core.converter_for(attribute)? {
            Some((name, converter))
                if equality
                    && conjunctive
                    && self.core.aggregates(converter.as_ref())
                    && !self.core.is_target_aggregated(attribute) =>
            {
                let group = self.core.aggregation_group(attribute, &name);
                let inputs: Vec<AggregationInput> = siblings[index..]
                    .iter()
                    .filter_map(|operator| match operator {
                        Operator::Comparison(leaf)
                            if leaf.kind == ComparisonKind::Equals
                                && leaf.in_scope(self.alias.as_deref())
                                && group.iter().any(|member| member.eq_ignore_ascii_case(&leaf.attribute)) =>
                        {
                            Some(AggregationInput {
                                attribute: leaf.attribute.clone(),
                                action: None,
                                values: vec![leaf.value.clone()],
                            })
                        }
                        _ => None,
                    })
                    .collect();
                debug!("folding {} sibling comparison(s) for {attribute}", inputs.len());
                folded.extend(inputs.iter().map(|input| input.attribute.to_ascii_lowercase()));
                let values = self.core.aggregate(&name, converter.as_ref(), inputs)?;
                if values.len() > 1 {
                    return Ok(ResolvedLeaf::AllOf(values));
                }
                values
            }
            Some((name, converter)) => {
                if equality
                    && let Some(assertion) =
                        self.core
                            .filter_assertion(attribute, &name, converter.as_ref(), &comparison.value)?
                {
                    return Ok(ResolvedLeaf::Assertion(assertion));
                }
                self.core.convert(
                    attribute,
                    &name,
                    converter.as_ref(),
                    vec![comparison.value.clone()],
                    Direction::ToProtocol,
                    None,
                )?
            }
            None => self
                .core
                .resolve_plain(attribute, vec![comparison.value.clone()], Direction::ToProtocol, None)?,
        };
        single_value(attribute, converted).map(ResolvedLeaf::Value)
    }
}

/// The one value a comparison holds. A converter that turns one filter value into several is
/// rejected rather than silently truncated.
fn single_value(attribute: &str, mut values: Vec<Value>) -> HydrateResult<Value> {
    match values.len() {
        0 => Ok(Value::Null),
        1 => Ok(values.remove(0)),
        count => Err(ConverterError::invalid(
            attribute,
            format!("a filter comparison holds one value, but conversion produced {count}"),
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ConverterRegistry, OperationType};
    use crate::resolver::test_support::user_schema;

    fn resolve(mut collection: OperatorCollection, alias: Option<&str>) -> OperatorCollection {
        let registry = ConverterRegistry::with_builtins();
        let schema = user_schema();
        let core = ResolverCore::new(&registry, &schema, OperationType::SearchToWire, None).unwrap();
        OperatorValueResolver::new(core, alias)
            .to_protocol(&mut collection)
            .unwrap();
        collection
    }

    #[test]
    fn leaves_get_physical_names_and_values() {
        let resolved = resolve(
            OperatorCollection::new([
                Operator::equals("firstName", "John"),
                Operator::or([Operator::equals("enabled", true), Operator::present("emailAddress")]),
            ]),
            None,
        );
        assert_eq!(
            resolved.to_ldap_filter(None),
            "(&(givenName=John)(|(msExchEnabled=TRUE)(mail=*)))"
        );
    }

    #[test]
    fn flags_test_single_bits() {
        let resolved = resolve(
            OperatorCollection::new([
                Operator::equals("disabled", true),
                Operator::equals("firstName", "John"),
                Operator::equals("passwordNeverExpires", true),
            ]),
            None,
        );
        assert_eq!(
            resolved.to_ldap_filter(None),
            "(&(userAccountControl:1.2.840.113556.1.4.803:=2)(givenName=John)\
             (userAccountControl:1.2.840.113556.1.4.803:=65536))"
        );
    }

    #[test]
    fn flags_in_a_disjunction_stay_separate() {
        let resolved = resolve(
            OperatorCollection::new([Operator::or([
                Operator::equals("disabled", true),
                Operator::equals("passwordNeverExpires", true),
            ])]),
            None,
        );
        assert_eq!(
            resolved.to_ldap_filter(None),
            "(|(userAccountControl:1.2.840.113556.1.4.803:=2)(userAccountControl:1.2.840.113556.1.4.803:=65536))"
        );
    }

    #[test]
    fn cleared_flag_is_negated() {
        let resolved = resolve(
            OperatorCollection::new([
                Operator::equals("disabled", false),
                Operator::not(Operator::equals("passwordNeverExpires", false)),
            ]),
            None,
        );
        assert_eq!(
            resolved.to_ldap_filter(None),
            "(&(!(userAccountControl:1.2.840.113556.1.4.803:=2))(!(!(userAccountControl:1.2.840.113556.1.4.803:=65536))))"
        );
    }

    #[test]
    fn other_comparisons_on_a_flag_attribute_are_kept() {
        let resolved = resolve(
            OperatorCollection::new([Operator::equals("disabled", true), Operator::present("passwordNeverExpires")]),
            None,
        );
        assert_eq!(
            resolved.to_ldap_filter(None),
            "(&(userAccountControl:1.2.840.113556.1.4.803:=2)(userAccountControl=*))"
        );
    }

    #[test]
    fn negated_leaf_is_resolved() {
        let resolved = resolve(OperatorCollection::new([Operator::not(Operator::equals("enabled", false))]), None);
        assert_eq!(resolved.to_ldap_filter(None), "(!(msExchEnabled=FALSE))");
    }

    #[test]
    fn other_alias_leaves_untouched() {
        let resolved = resolve(
            OperatorCollection::new([
                Operator::equals("firstName", "John").aliased("u"),
                Operator::equals("firstName", "Ops").aliased("g"),
            ]),
            Some("u"),
        );
        let comparisons = resolved.comparisons();
        assert_eq!(comparisons[0].attribute, "givenName");
        assert_eq!(comparisons[1].attribute, "firstName");
        assert_eq!(resolved.to_ldap_filter(Some("u")), "(givenName=John)");
    }

    #[test]
    fn a_comparison_holds_one_value() {
        assert_eq!(single_value("firstName", Vec::new()).unwrap(), Value::Null);
        assert_eq!(
            single_value("firstName", vec![Value::from("John")]).unwrap(),
            Value::from("John")
        );
        let err = single_value("firstName", vec![Value::from("John"), Value::from("Jon")]).unwrap_err();
        assert!(err.to_string().contains("produced 2"), "{err}");
    }

    #[test]
    fn membership_filters_are_kept() {
        let resolved = resolve(
            OperatorCollection::new([Operator::equals("groups", "cn=admins,dc=example,dc=com")]),
            None,
        );
        assert_eq!(resolved.to_ldap_filter(None), "(memberOf=cn=admins,dc=example,dc=com)");
    }
}
