//! Single-value converters: booleans, integers, timestamps and password encoding.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use super::{AttributeConverter, ConverterContext, ConverterRegistration, OperationType};
use crate::errors::ConverterError;
use crate::value::{GENERALIZED_TIME_FORMAT, Value};

/// Seconds between 1601-01-01 and the Unix epoch.
const WINDOWS_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;
/// Windows timestamps meaning "never".
const WINDOWS_TIME_NEVER: [&str; 2] = ["0", "9223372036854775807"];

/// Parse the usual textual spellings of a boolean.
pub(crate) fn parse_bool(ctx: &ConverterContext<'_>, value: &Value) -> Result<bool, ConverterError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(0) => Ok(false),
        Value::Int(1) => Ok(true),
        Value::Text(s) if s.eq_ignore_ascii_case("true") || s == "1" => Ok(true),
        Value::Text(s) if s.eq_ignore_ascii_case("false") || s == "0" => Ok(false),
        other => Err(ctx.invalid(format!("expected a boolean, got {} '{other}'", other.kind()))),
    }
}

/// `TRUE`/`FALSE` directory booleans.
#[derive(Debug, Default)]
pub struct BoolConverter;

impl AttributeConverter for BoolConverter {
    fn to_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        let b = parse_bool(ctx, &value)?;
        Ok(Value::text(if b { "TRUE" } else { "FALSE" }))
    }

    fn from_protocol(&self, _ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        Ok(Value::Bool(value.to_protocol_text().eq_ignore_ascii_case("TRUE")))
    }
}

/// Integers carried as decimal strings.
#[derive(Debug, Default)]
pub struct IntConverter;

impl AttributeConverter for IntConverter {
    fn to_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        match value {
            Value::Int(i) => Ok(Value::Text(i.to_string())),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| Value::Text(i.to_string()))
                .map_err(|_| ctx.invalid(format!("'{s}' is not an integer"))),
            other => Err(ctx.invalid(format!("expected an integer, got {}", other.kind()))),
        }
    }

    fn from_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        match value {
            Value::Int(i) => Ok(Value::Int(i)),
            other => {
                let text = other.to_protocol_text();
                text.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| ctx.invalid(format!("'{text}' is not an integer")))
            }
        }
    }
}

/// Generalized time (`20240102030405.0Z`) ↔ UTC timestamp.
#[derive(Debug, Default)]
pub struct GeneralizedTimeConverter;

impl GeneralizedTimeConverter {
    fn parse(ctx: &ConverterContext<'_>, raw: &str) -> Result<DateTime<Utc>, ConverterError> {
        let invalid = || ctx.invalid(format!("'{raw}' is not a generalized time"));
        if raw.len() < 14 || !raw.is_char_boundary(14) {
            return Err(invalid());
        }
        let (stamp, rest) = raw.split_at(14);
        // Fractional seconds are dropped; directories rarely populate them.
        let zone = rest
            .strip_prefix('.')
            .map(|r| r.trim_start_matches(|c: char| c.is_ascii_digit()))
            .unwrap_or(rest);

        let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").map_err(|_| invalid())?;
        match zone {
            "Z" | "" => Ok(naive.and_utc()),
            offset => {
                let with_offset = format!("{stamp}{offset}");
                DateTime::<FixedOffset>::parse_from_str(&with_offset, "%Y%m%d%H%M%S%z")
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|_| invalid())
            }
        }
    }
}

impl AttributeConverter for GeneralizedTimeConverter {
    fn to_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        let time = match value {
            Value::Time(t) => t,
            Value::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .or_else(|_| Self::parse(ctx, &s))?,
            other => return Err(ctx.invalid(format!("expected a timestamp, got {}", other.kind()))),
        };
        Ok(Value::Text(time.format(GENERALIZED_TIME_FORMAT).to_string()))
    }

    fn from_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        match value {
            Value::Time(t) => Ok(Value::Time(t)),
            other => Self::parse(ctx, &other.to_protocol_text()).map(Value::Time),
        }
    }
}

/// Windows file time (100ns intervals since 1601) ↔ UTC timestamp. `0` and `i64::MAX` mean "never",
/// so times at or before 1601-01-01T00:00:00Z cannot be written.
#[derive(Debug, Default)]
pub struct WindowsTimeConverter;

impl AttributeConverter for WindowsTimeConverter {
    fn to_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        match value {
            Value::Null | Value::Bool(false) => Ok(Value::text(WINDOWS_TIME_NEVER[0])),
            Value::Time(t) => {
                let ticks = (t.timestamp() + WINDOWS_EPOCH_OFFSET_SECS)
                    .checked_mul(10_000_000)
                    .and_then(|secs| secs.checked_add(i64::from(t.timestamp_subsec_nanos() / 100)))
                    .ok_or_else(|| ctx.invalid("timestamp is out of range"))?;
                if ticks <= 0 || ticks == i64::MAX {
                    return Err(ctx.invalid(format!("{t} cannot be written as a windows timestamp")));
                }
                Ok(Value::Text(ticks.to_string()))
            }
            other => Err(ctx.invalid(format!("expected a timestamp, got {}", other.kind()))),
        }
    }

    fn from_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        let text = value.to_protocol_text();
        if WINDOWS_TIME_NEVER.contains(&text.as_ref()) {
            return Ok(Value::Null);
        }
        let ticks: i64 = text
            .parse()
            .map_err(|_| ctx.invalid(format!("'{text}' is not a windows timestamp")))?;
        let secs = ticks.div_euclid(10_000_000) - WINDOWS_EPOCH_OFFSET_SECS;
        let nanos = (ticks.rem_euclid(10_000_000) * 100) as u32;
        DateTime::<Utc>::from_timestamp(secs, nanos)
            .map(Value::Time)
            .ok_or_else(|| ctx.invalid(format!("'{text}' is out of range")))
    }
}

/// Active Directory `unicodePwd` encoding: the quoted password as UTF-16LE. Write-only.
#[derive(Debug, Default)]
pub struct EncodeWindowsPasswordConverter;

impl AttributeConverter for EncodeWindowsPasswordConverter {
    fn to_protocol(&self, ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        let Value::Text(password) = value else {
            return Err(ctx.invalid("expected the password as text"));
        };
        if password.is_empty() && ctx.operation_type != OperationType::SearchToWire {
            return Err(ctx.invalid("password cannot be empty"));
        }
        let quoted = format!("\"{password}\"");
        Ok(Value::Binary(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect()))
    }

    fn from_protocol(&self, ctx: &ConverterContext<'_>, _value: Value) -> Result<Value, ConverterError> {
        Err(ctx.invalid("passwords cannot be read back from the directory"))
    }
}

inventory::submit! {
    ConverterRegistration { name: "bool", build: || Arc::new(BoolConverter) }
}

inventory::submit! {
    ConverterRegistration { name: "int", build: || Arc::new(IntConverter) }
}

inventory::submit! {
    ConverterRegistration { name: "generalized_time", build: || Arc::new(GeneralizedTimeConverter) }
}

inventory::submit! {
    ConverterRegistration { name: "windows_time", build: || Arc::new(WindowsTimeConverter) }
}

inventory::submit! {
    ConverterRegistration { name: "encode_windows_password", build: || Arc::new(EncodeWindowsPasswordConverter) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterOptions;
    use chrono::TimeZone;

    fn ctx<'a>(options: &'a ConverterOptions, operation_type: OperationType) -> ConverterContext<'a> {
        ConverterContext {
            attribute: "attr",
            options,
            operation_type,
            connection: None,
            dn: None,
            batch_action: None,
        }
    }

    #[test]
    fn bool_to_protocol() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, OperationType::Create);
        assert_eq!(BoolConverter.to_protocol(&ctx, Value::Bool(true)).unwrap(), Value::text("TRUE"));
        assert_eq!(BoolConverter.to_protocol(&ctx, Value::text("false")).unwrap(), Value::text("FALSE"));
        assert!(BoolConverter.to_protocol(&ctx, Value::text("maybe")).is_err());
        assert_eq!(BoolConverter.from_protocol(&ctx, Value::text("TRUE")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn int_conversion() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, OperationType::Modify);
        assert_eq!(IntConverter.to_protocol(&ctx, Value::Int(42)).unwrap(), Value::text("42"));
        assert_eq!(IntConverter.to_protocol(&ctx, Value::text(" 7 ")).unwrap(), Value::text("7"));
        assert!(IntConverter.to_protocol(&ctx, Value::text("x")).is_err());
        assert_eq!(IntConverter.from_protocol(&ctx, Value::text("-3")).unwrap(), Value::Int(-3));
    }

    #[test]
    fn generalized_time_parsing() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, OperationType::SearchFromWire);
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        for raw in ["20240102030405.0Z", "20240102030405Z", "20240102050405+0200", "20240102030405.123Z"] {
            assert_eq!(
                GeneralizedTimeConverter.from_protocol(&ctx, Value::text(raw)).unwrap(),
                Value::Time(expected),
                "failed for {raw}"
            );
        }
        assert!(GeneralizedTimeConverter.from_protocol(&ctx, Value::text("2024")).is_err());
    }

    #[test]
    fn generalized_time_accepts_rfc3339_text() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, OperationType::Create);
        assert_eq!(
            GeneralizedTimeConverter
                .to_protocol(&ctx, Value::text("2024-01-02T03:04:05Z"))
                .unwrap(),
            Value::text("20240102030405.0Z")
        );
    }

    #[test]
    fn windows_time_conversion() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, OperationType::Modify);
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            WindowsTimeConverter.to_protocol(&ctx, Value::Time(epoch)).unwrap(),
            Value::text("116444736000000000")
        );
        assert_eq!(
            WindowsTimeConverter
                .from_protocol(&ctx, Value::text("116444736000000000"))
                .unwrap(),
            Value::Time(epoch)
        );
        assert_eq!(
            WindowsTimeConverter
                .from_protocol(&ctx, Value::text("9223372036854775807"))
                .unwrap(),
            Value::Null
        );
        assert_eq!(WindowsTimeConverter.to_protocol(&ctx, Value::Null).unwrap(), Value::text("0"));
    }

    #[test]
    fn windows_time_rejects_the_never_sentinels() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, OperationType::Modify);
        let windows_epoch = Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).unwrap();
        let err = WindowsTimeConverter.to_protocol(&ctx, Value::Time(windows_epoch)).unwrap_err();
        assert!(matches!(err, ConverterError::InvalidValue { .. }));
        let earlier = Utc.with_ymd_and_hms(1600, 6, 1, 0, 0, 0).unwrap();
        assert!(WindowsTimeConverter.to_protocol(&ctx, Value::Time(earlier)).is_err());
        let first_tick = windows_epoch + chrono::Duration::microseconds(1);
        assert_eq!(
            WindowsTimeConverter.to_protocol(&ctx, Value::Time(first_tick)).unwrap(),
            Value::text("10")
        );
    }

    #[test]
    fn windows_password_is_quoted_utf16le() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, OperationType::Modify);
        let encoded = EncodeWindowsPasswordConverter
            .to_protocol(&ctx, Value::text("ab"))
            .unwrap();
        assert_eq!(encoded, Value::Binary(vec![0x22, 0, 0x61, 0, 0x62, 0, 0x22, 0]));
        assert!(EncodeWindowsPasswordConverter.to_protocol(&ctx, Value::text("")).is_err());
        assert!(EncodeWindowsPasswordConverter.from_protocol(&ctx, encoded).is_err());
    }
}
