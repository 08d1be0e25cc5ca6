//! Bitmask converter: several boolean logical attributes folded into one integer attribute.
//!
//! Options:
//! - `flags`: logical attribute → bit value (e.g. `{ disabled = 2, passwordNeverExpires = 65536 }`)
//! - `default_value`: mask the fold starts from when nothing has been accumulated yet
//! - `invert`: logical attributes whose boolean is the negation of their bit (e.g. `enabled`)
//!
//! Creates and modifies fold every flag of a group into one mask, starting from the entry's current
//! mask when the operation carries it. Searches test single bits with the bitwise AND matching
//! rule, so `disabled = true` matches every entry with that bit set whatever its other bits are.

use std::sync::Arc;

use super::scalar::parse_bool;
use super::{AttributeConverter, ConverterContext, ConverterRegistration, OperationType};
use crate::errors::ConverterError;
use crate::filter::MatchingRuleAssertion;
use crate::operation::BatchAction;
use crate::value::Value;

/// `LDAP_MATCHING_RULE_BIT_AND`: matches when every bit of the asserted value is set.
pub const BIT_AND_RULE: &str = "1.2.840.113556.1.4.803";

#[derive(Debug, Default)]
pub struct FlagsConverter;

impl FlagsConverter {
    fn bit(ctx: &ConverterContext<'_>) -> Result<i64, ConverterError> {
        ctx.option("flags")
            .and_then(serde_json::Value::as_object)
            .and_then(|flags| {
                flags
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(ctx.attribute))
                    .and_then(|(_, bit)| bit.as_i64())
            })
            .ok_or_else(|| ConverterError::MissingOption {
                attribute: ctx.attribute.to_string(),
                option: "flags".to_string(),
            })
    }

    fn inverted(ctx: &ConverterContext<'_>) -> bool {
        ctx.option("invert")
            .and_then(serde_json::Value::as_array)
            .is_some_and(|names| {
                names
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .any(|name| name.eq_ignore_ascii_case(ctx.attribute))
            })
    }

    fn parse_mask(ctx: &ConverterContext<'_>, value: &Value) -> Result<i64, ConverterError> {
        match value {
            Value::Int(mask) => Ok(*mask),
            other => {
                let text = other.to_protocol_text();
                text.trim()
                    .parse()
                    .map_err(|_| ctx.invalid(format!("'{text}' is not a bitmask")))
            }
        }
    }

    /// Set or clear this attribute's bit in `mask`.
    fn apply(ctx: &ConverterContext<'_>, mask: i64, value: &Value) -> Result<i64, ConverterError> {
        let bit = Self::bit(ctx)?;
        let mut set = match ctx.batch_action {
            Some(BatchAction::Remove | BatchAction::RemoveAll) => false,
            _ => parse_bool(ctx, value)?,
        };
        if Self::inverted(ctx) {
            set = !set;
        }
        Ok(if set { mask | bit } else { mask & !bit })
    }
}

impl AttributeConverter for FlagsConverter {
    fn to_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        let start = ctx.option_i64("default_value").unwrap_or(0);
        Self::apply(ctx, start, &value).map(|mask| Value::Text(mask.to_string()))
    }

    fn from_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        let mask = Self::parse_mask(ctx, &value)?;
        let set = mask & Self::bit(ctx)? != 0;
        Ok(Value::Bool(set != Self::inverted(ctx)))
    }

    fn aggregates(&self, operation_type: OperationType) -> bool {
        matches!(operation_type, OperationType::Create | OperationType::Modify)
    }

    fn aggregate(
        &self,
        ctx: &ConverterContext<'_>,
        accumulated: Vec<Value>,
        values: Vec<Value>,
    ) -> Result<Vec<Value>, ConverterError> {
        let mut mask = match accumulated.first() {
            Some(current) => Self::parse_mask(ctx, current)?,
            None => ctx.option_i64("default_value").unwrap_or(0),
        };
        // A remove batch carries no values but still clears the bit.
        let value = values.into_iter().next().unwrap_or(Value::Bool(false));
        mask = Self::apply(ctx, mask, &value)?;
        Ok(vec![Value::Text(mask.to_string())])
    }

    fn filter_assertion(
        &self,
        ctx: &ConverterContext<'_>,
        value: &Value,
    ) -> Result<Option<MatchingRuleAssertion>, ConverterError> {
        let bit = Self::bit(ctx)?;
        let set = parse_bool(ctx, value)? != Self::inverted(ctx);
        Ok(Some(MatchingRuleAssertion {
            rule: BIT_AND_RULE.to_string(),
            value: Value::Text(bit.to_string()),
            negated: !set,
        }))
    }
}

inventory::submit! {
    ConverterRegistration { name: "flags", build: || Arc::new(FlagsConverter) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ConverterOptions, OperationType};
    use serde_json::json;

    fn options() -> ConverterOptions {
        let mut options = ConverterOptions::new();
        options.insert(
            "flags".into(),
            json!({"disabled": 2, "enabled": 2, "passwordNeverExpires": 65536}),
        );
        options.insert("default_value".into(), json!(512));
        options.insert("invert".into(), json!(["enabled"]));
        options
    }

    fn ctx<'a>(attribute: &'a str, options: &'a ConverterOptions, action: Option<BatchAction>) -> ConverterContext<'a> {
        ConverterContext {
            attribute,
            options,
            operation_type: if action.is_some() { OperationType::Modify } else { OperationType::Create },
            connection: None,
            dn: None,
            batch_action: action,
        }
    }

    #[test]
    fn folds_several_attributes() {
        let options = options();
        let first = FlagsConverter
            .aggregate(&ctx("disabled", &options, None), vec![], vec![Value::Bool(true)])
            .unwrap();
        assert_eq!(first, vec![Value::text("514")]);
        let second = FlagsConverter
            .aggregate(&ctx("passwordNeverExpires", &options, None), first, vec![Value::Bool(true)])
            .unwrap();
        assert_eq!(second, vec![Value::text("66050")]);
    }

    #[test]
    fn remove_batch_clears_bit() {
        let options = options();
        let mask = FlagsConverter
            .aggregate(
                &ctx("disabled", &options, Some(BatchAction::Remove)),
                vec![Value::text("514")],
                vec![],
            )
            .unwrap();
        assert_eq!(mask, vec![Value::text("512")]);
    }

    #[test]
    fn inverted_attribute() {
        let options = options();
        let ctx = ctx("enabled", &options, None);
        assert_eq!(FlagsConverter.to_protocol(&ctx, Value::Bool(false)).unwrap(), Value::text("514"));
        assert_eq!(FlagsConverter.from_protocol(&ctx, Value::text("512")).unwrap(), Value::Bool(true));
        assert_eq!(FlagsConverter.from_protocol(&ctx, Value::text("514")).unwrap(), Value::Bool(false));
    }

    #[test]
    fn folds_current_mask() {
        let options = options();
        let mask = FlagsConverter
            .aggregate(
                &ctx("disabled", &options, Some(BatchAction::Replace)),
                vec![Value::Int(66048)],
                vec![Value::Bool(true)],
            )
            .unwrap();
        assert_eq!(mask, vec![Value::text("66050")]);
    }

    #[test]
    fn aggregates_only_when_writing() {
        assert!(FlagsConverter.aggregates(OperationType::Create));
        assert!(FlagsConverter.aggregates(OperationType::Modify));
        assert!(!FlagsConverter.aggregates(OperationType::SearchToWire));
        assert!(!FlagsConverter.aggregates(OperationType::SearchFromWire));
    }

    #[test]
    fn search_tests_a_single_bit() {
        let options = options();
        let mut ctx = ctx("disabled", &options, None);
        ctx.operation_type = OperationType::SearchToWire;
        let set = FlagsConverter.filter_assertion(&ctx, &Value::Bool(true)).unwrap().unwrap();
        assert_eq!(set.rule, BIT_AND_RULE);
        assert_eq!(set.value, Value::text("2"));
        assert!(!set.negated);
        let cleared = FlagsConverter.filter_assertion(&ctx, &Value::text("false")).unwrap().unwrap();
        assert!(cleared.negated);
    }

    #[test]
    fn search_on_inverted_attribute_negates() {
        let options = options();
        let mut ctx = ctx("enabled", &options, None);
        ctx.operation_type = OperationType::SearchToWire;
        let enabled = FlagsConverter.filter_assertion(&ctx, &Value::Bool(true)).unwrap().unwrap();
        assert!(enabled.negated);
        let disabled = FlagsConverter.filter_assertion(&ctx, &Value::Bool(false)).unwrap().unwrap();
        assert!(!disabled.negated);
    }

    #[test]
    fn missing_flag_option() {
        let options = ConverterOptions::new();
        let err = FlagsConverter
            .to_protocol(&ctx("disabled", &options, None), Value::Bool(true))
            .unwrap_err();
        assert!(matches!(err, ConverterError::MissingOption { .. }));
    }
}
