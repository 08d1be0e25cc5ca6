//! Attribute value conversion and operation hydration for directory (LDAP) clients.
//!
//! Callers describe operations in terms of a schema's logical attribute names and values. The
//! [`OperationHydrator`] rewrites them in place into their protocol form: physical attribute
//! names, converted and encoded values, a distinguished name for new entries, schema defaults for
//! searches, and a rendered filter. Converters that need to touch other entries (group
//! membership, for instance) hand back side operations instead of running them.
//!
//! ```
//! use ldaphydrate::{AddOperation, ConverterRegistry, ObjectSchema, Operation, OperationHydrator};
//!
//! let registry = ConverterRegistry::with_builtins();
//! let schema = ObjectSchema::new("user")
//!     .with_attribute("name", "cn")
//!     .with_attribute("firstName", "givenName")
//!     .with_default_container("ou=users,dc=example,dc=com");
//!
//! let mut op = Operation::Add(
//!     AddOperation::new()
//!         .with_attribute("name", "O'Brien")
//!         .with_attribute("firstName", "Pat"),
//! );
//! OperationHydrator::new(&registry)
//!     .with_schema(&schema)
//!     .hydrate_to_protocol(&mut op, None)
//!     .unwrap();
//! assert_eq!(op.dn(), Some("cn=O\\27Brien,ou=users,dc=example,dc=com"));
//! ```

pub mod config;
pub mod connection;
pub mod converter;
pub mod encoding;
pub mod errors;
pub mod escape;
pub mod filter;
pub mod hydrator;
pub mod operation;
pub mod parameters;
pub mod resolver;
pub mod schema;
pub mod value;

pub use config::HydrateConfig;
pub use connection::{ConnectionConfig, ConnectionContext};
pub use converter::{
    AttributeConverter, ConverterCapabilities, ConverterContext, ConverterOptions, ConverterRegistration,
    ConverterRegistry, OperationGenerator, OperationType,
};
pub use encoding::WireEncoding;
pub use errors::*;
pub use filter::{Comparison, ComparisonKind, MatchingRuleAssertion, Operator, OperatorCollection};
pub use hydrator::OperationHydrator;
pub use operation::{
    AddOperation, Batch, BatchAction, BatchModifyOperation, Control, Operation, QueryFilter, QueryOperation, Scope,
};
pub use parameters::ParameterResolver;
pub use schema::{ObjectSchema, SchemaLookup};
pub use value::{AttributeMap, AttributeValue, Value};

// Re-exported so downstream crates can `inventory::submit!` their own converters.
pub use inventory;
