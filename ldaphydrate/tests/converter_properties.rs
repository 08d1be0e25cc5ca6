use chrono::{DateTime, Utc};
use ldaphydrate::converter::{
    BoolConverter, FlagsConverter, GeneralizedTimeConverter, IntConverter, WindowsTimeConverter,
};
use ldaphydrate::escape::{escape_dn_value, escape_filter_value};
use ldaphydrate::{AttributeConverter, ConverterContext, ConverterOptions, OperationType, Value};
use proptest::prelude::*;
use serde_json::json;

fn ctx<'a>(attribute: &'a str, options: &'a ConverterOptions) -> ConverterContext<'a> {
    ConverterContext {
        attribute,
        options,
        operation_type: OperationType::Modify,
        connection: None,
        dn: None,
        batch_action: None,
    }
}

fn round_trip(converter: &dyn AttributeConverter, attribute: &str, options: &ConverterOptions, value: Value) -> Value {
    let ctx = ctx(attribute, options);
    let wire = converter.to_protocol(&ctx, value).unwrap();
    converter.from_protocol(&ctx, wire).unwrap()
}

fn flag_options() -> ConverterOptions {
    let mut options = ConverterOptions::new();
    options.insert("flags".into(), json!({"disabled": 2, "enabled": 2}));
    options.insert("default_value".into(), json!(512));
    options.insert("invert".into(), json!(["enabled"]));
    options
}

proptest! {
    #[test]
    fn bool_values_survive(b in any::<bool>()) {
        let options = ConverterOptions::new();
        prop_assert_eq!(round_trip(&BoolConverter, "enabled", &options, Value::Bool(b)), Value::Bool(b));
    }

    #[test]
    fn int_values_survive(i in any::<i64>()) {
        let options = ConverterOptions::new();
        prop_assert_eq!(round_trip(&IntConverter, "count", &options, Value::Int(i)), Value::Int(i));
    }

    #[test]
    fn generalized_times_survive_at_second_precision(secs in 0i64..4_102_444_800) {
        let options = ConverterOptions::new();
        let time = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
        prop_assert_eq!(
            round_trip(&GeneralizedTimeConverter, "created", &options, Value::Time(time)),
            Value::Time(time)
        );
    }

    #[test]
    fn windows_times_survive_at_tick_precision(
        secs in -11_644_473_599i64..253_402_300_799,
        ticks in 0u32..10_000_000,
    ) {
        let options = ConverterOptions::new();
        let time = DateTime::<Utc>::from_timestamp(secs, ticks * 100).unwrap();
        prop_assert_eq!(
            round_trip(&WindowsTimeConverter, "accountExpirationDate", &options, Value::Time(time)),
            Value::Time(time)
        );
    }

    #[test]
    fn flags_read_back_what_was_written(set in any::<bool>(), inverted in any::<bool>()) {
        let options = flag_options();
        let attribute = if inverted { "enabled" } else { "disabled" };
        prop_assert_eq!(round_trip(&FlagsConverter, attribute, &options, Value::Bool(set)), Value::Bool(set));
    }

    #[test]
    fn escaped_filter_values_have_no_bare_specials(raw in ".*") {
        let escaped = escape_filter_value(&raw);
        prop_assert!(!escaped.contains(['*', '(', ')', '\0']));
    }

    #[test]
    fn escaped_rdn_values_have_no_bare_separators(raw in "[a-zA-Z ,+=;]{1,24}") {
        let escaped = escape_dn_value(&raw);
        prop_assert!(!escaped.contains([',', '+', '=', ';']));
        prop_assert!(!escaped.starts_with(' ') && !escaped.ends_with(' '));
    }
}
