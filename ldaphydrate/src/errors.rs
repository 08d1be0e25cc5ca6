use std::borrow::Cow;

use thiserror::Error;

/// Top-level error type returned by hydration.
#[derive(Debug, Error)]
pub enum HydrateError {
    /// Unknown converter, unknown wire encoding, or an unusable parameter set.
    #[error("configuration error: {message}")]
    Configuration { message: Cow<'static, str> },

    /// A converter rejected a value.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// The operation cannot be hydrated in its current shape (missing schema, undeterminable DN).
    #[error("{message}")]
    Logic { message: Cow<'static, str> },
}

impl HydrateError {
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn logic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Logic {
            message: message.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_logic(&self) -> bool {
        matches!(self, Self::Logic { .. })
    }
}

/// A value for a single attribute that a converter refused.
#[derive(Debug, Clone, Error)]
#[error("invalid value for attribute '{attribute}': {message}")]
pub struct ValueError {
    pub attribute: String,
    pub message: String,
}

impl ValueError {
    pub fn new(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by attribute converters.
#[derive(Debug, Clone, Error)]
pub enum ConverterError {
    #[error("invalid value for '{attribute}': {message}")]
    InvalidValue { attribute: String, message: String },

    #[error("converter option '{option}' is required for '{attribute}'")]
    MissingOption { attribute: String, option: String },

    /// The converter needs the entry DN but none is known for this operation.
    #[error("a DN is required to convert '{attribute}'")]
    MissingDn { attribute: String },
}

impl ConverterError {
    pub fn invalid(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

impl From<ConverterError> for HydrateError {
    fn from(err: ConverterError) -> Self {
        match err {
            ConverterError::InvalidValue { attribute, message } => Self::Value(ValueError::new(attribute, message)),
            ConverterError::MissingOption { .. } => Self::configuration(err.to_string()),
            ConverterError::MissingDn { ref attribute } => {
                Self::Value(ValueError::new(attribute.clone(), "a DN is required for this conversion"))
            }
        }
    }
}

pub type HydrateResult<T> = Result<T, HydrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_becomes_value_error() {
        let err: HydrateError = ConverterError::invalid("enabled", "expected a boolean").into();
        match err {
            HydrateError::Value(value) => {
                assert_eq!(value.attribute, "enabled");
                assert_eq!(value.message, "expected a boolean");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_option_is_configuration() {
        let err: HydrateError = ConverterError::MissingOption {
            attribute: "disabled".into(),
            option: "flags".into(),
        }
        .into();
        assert!(err.is_configuration());
    }
}
