//! Operation hydration: turns logical operations into their protocol form in place.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::connection::ConnectionContext;
use crate::converter::{ConverterRegistry, OperationType};
use crate::encoding::WireEncoding;
use crate::errors::{HydrateError, HydrateResult};
use crate::escape::escape_dn_value;
use crate::filter::Operator;
use crate::operation::{AddOperation, BatchModifyOperation, Operation, QueryFilter, QueryOperation};
use crate::parameters::ParameterResolver;
use crate::resolver::{AttributeValueResolver, BatchValueResolver, OperatorValueResolver, ResolverCore};
use crate::schema::{ObjectSchema, SchemaLookup};
use crate::value::{AttributeMap, find_key};

/// Logical attribute holding the relative name of a new entry.
pub const NAME_ATTRIBUTE: &str = "name";
/// Attribute every query returns.
pub const DN_ATTRIBUTE: &str = "dn";
const SELECT_ALL: &str = "*";

/// Hydrates operations for one object type.
///
/// The registry, schema and connection are borrowed read-only, so one hydrator (or several) can
/// serve concurrent calls. All per-call state lives in the resolvers each call creates.
pub struct OperationHydrator<'a> {
    registry: &'a ConverterRegistry,
    schema: Option<&'a dyn SchemaLookup>,
    connection: Option<&'a dyn ConnectionContext>,
    parameters: BTreeMap<String, String>,
    alias: Option<String>,
}

impl<'a> OperationHydrator<'a> {
    pub fn new(registry: &'a ConverterRegistry) -> Self {
        Self {
            registry,
            schema: None,
            connection: None,
            parameters: BTreeMap::new(),
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: &'a dyn SchemaLookup) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_connection(mut self, connection: &'a dyn ConnectionContext) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Caller-supplied parameter; wins over connection-derived defaults.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_parameters<K: Into<String>, V: Into<String>>(mut self, parameters: impl IntoIterator<Item = (K, V)>) -> Self {
        self.parameters
            .extend(parameters.into_iter().map(|(name, value)| (name.into(), value.into())));
        self
    }

    /// Alias of the object being queried, for filters and selections qualified with aliases.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Hydrate `operation` in place and return the side operations queued by converters, which the
    /// caller runs after the primary operation.
    ///
    /// `dn` identifies the entry for DN-dependent converters when the operation does not carry one
    /// itself. Nothing is modified when hydration fails.
    pub fn hydrate_to_protocol(&self, operation: &mut Operation, dn: Option<&str>) -> HydrateResult<Vec<Operation>> {
        debug!("hydrating {} operation", operation.kind());
        match operation {
            Operation::Add(add) => self.hydrate_add(add, dn),
            Operation::BatchModify(modify) => self.hydrate_batch_modify(modify, dn),
            Operation::Query(query) => self.hydrate_query(query).map(|()| Vec::new()),
        }
    }

    /// Convert a raw entry read from the directory into logical attributes.
    ///
    /// Each physical attribute is expanded to every logical attribute mapped onto it; attributes
    /// the schema does not know keep their raw name and value. Without a schema the entry is
    /// returned unchanged.
    pub fn hydrate_from_protocol(&self, entry: &AttributeMap) -> HydrateResult<AttributeMap> {
        let Some(schema) = self.schema else {
            return Ok(entry.clone());
        };

        let mut logical = AttributeMap::new();
        let mut unmapped = AttributeMap::new();
        for (physical, value) in entry {
            let names = schema.logical_names(physical);
            if names.is_empty() {
                unmapped.insert(physical.clone(), value.clone());
            }
            for name in names {
                logical.insert(name, value.clone());
            }
        }

        let core = self.core(schema, OperationType::SearchFromWire)?;
        let mut hydrated = AttributeValueResolver::new(core, logical).from_protocol()?;
        for (name, value) in unmapped {
            if find_key(&hydrated, &name).is_none() {
                hydrated.insert(name, value);
            }
        }
        Ok(hydrated)
    }

    fn require_schema(&self, kind: &str) -> HydrateResult<&'a dyn SchemaLookup> {
        self.schema
            .ok_or_else(|| HydrateError::logic(format!("{kind} operations cannot be hydrated without a schema")))
    }

    fn core(&self, schema: &'a dyn SchemaLookup, operation_type: OperationType) -> HydrateResult<ResolverCore<'a>> {
        ResolverCore::new(self.registry, schema, operation_type, self.connection)
    }

    fn parameter_resolver(&self) -> ParameterResolver {
        ParameterResolver::for_connection(self.connection, &self.parameters)
    }

    fn hydrate_add(&self, operation: &mut AddOperation, dn: Option<&str>) -> HydrateResult<Vec<Operation>> {
        let schema = self.require_schema("add")?;
        let parameters = self.parameter_resolver();

        let explicit = operation.dn.as_deref().filter(|dn| !dn.is_empty());
        let dn = match explicit.or(dn.filter(|dn| !dn.is_empty())) {
            Some(dn) => dn.to_string(),
            None => self.build_dn(schema, operation, &parameters)?,
        };
        debug!("add operation targets {dn}");

        let core = self.core(schema, OperationType::Create)?.with_dn(Some(dn.clone()));
        let mut resolver = AttributeValueResolver::new(core, operation.attributes.clone());
        let resolved = resolver.to_protocol()?;
        let queued = resolver.take_queued_operations();

        operation.dn = Some(dn);
        operation.attributes = resolved
            .into_iter()
            .filter(|(attribute, value)| {
                let blank = value.is_blank();
                if blank {
                    debug!("dropping empty value for {attribute}");
                }
                !blank
            })
            .map(|(attribute, value)| (schema.physical_name(&attribute), value))
            .collect();
        Ok(queued)
    }

    /// `<physical name attribute>=<escaped name>,<container>`.
    fn build_dn(
        &self,
        schema: &'a dyn SchemaLookup,
        operation: &AddOperation,
        parameters: &ParameterResolver,
    ) -> HydrateResult<String> {
        if !schema.has_attribute(NAME_ATTRIBUTE) {
            return Err(HydrateError::logic(format!(
                "cannot build a DN: the '{}' schema has no '{NAME_ATTRIBUTE}' attribute",
                schema.object_type()
            )));
        }
        let container = operation
            .location
            .clone()
            .or_else(|| schema.default_container())
            .filter(|container| !container.trim().is_empty())
            .ok_or_else(|| {
                HydrateError::logic(format!(
                    "cannot build a DN: no location given and the '{}' schema has no default container",
                    schema.object_type()
                ))
            })?;
        let name_key = find_key(&operation.attributes, NAME_ATTRIBUTE).ok_or_else(|| {
            HydrateError::logic(format!("cannot build a DN: no '{NAME_ATTRIBUTE}' value was given"))
        })?;

        // The name is converted on its own so the DN is known before DN-dependent converters run.
        let mut name_only = AttributeMap::new();
        name_only.insert(name_key.to_string(), operation.attributes[name_key].clone());
        let mut resolver = AttributeValueResolver::new(self.core(schema, OperationType::Create)?, name_only);
        let converted = resolver.to_protocol()?;
        let encoding = resolver.core().encoding().unwrap_or(WireEncoding::Utf8);
        let name = converted
            .get(name_key)
            .and_then(|value| value.first())
            .and_then(|value| encoding.decode_text(value))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| HydrateError::logic(format!("cannot build a DN: the '{NAME_ATTRIBUTE}' value is empty")))?;

        let container = parameters.resolve(&container)?;
        Ok(format!(
            "{}={},{container}",
            schema.physical_name(NAME_ATTRIBUTE),
            escape_dn_value(&name)
        ))
    }

    fn hydrate_batch_modify(
        &self,
        operation: &mut BatchModifyOperation,
        dn: Option<&str>,
    ) -> HydrateResult<Vec<Operation>> {
        let schema = self.require_schema("batch modify")?;
        let dn = Some(operation.dn.as_str())
            .filter(|dn| !dn.is_empty())
            .or(dn)
            .map(str::to_string);

        let core = self
            .core(schema, OperationType::Modify)?
            .with_dn(dn)
            .with_current_values(operation.current.clone());
        let mut resolver = BatchValueResolver::new(core, operation.batches.clone());
        let mut batches = resolver.to_protocol()?;
        for batch in &mut batches {
            batch.attribute = schema.physical_name(&batch.attribute);
        }
        operation.batches = batches;
        Ok(resolver.take_queued_operations())
    }

    fn hydrate_query(&self, operation: &mut QueryOperation) -> HydrateResult<()> {
        let unmapped = ObjectSchema::default();
        let schema: &dyn SchemaLookup = match self.schema {
            Some(schema) => schema,
            None => &unmapped,
        };
        let parameters = self.parameter_resolver();

        let attributes = self.select_attributes(schema, &operation.attributes);

        let base_dn = match operation.base_dn.clone().or_else(|| schema.base_dn()) {
            Some(dn) if ParameterResolver::has_parameters(&dn) => Some(parameters.resolve(&dn)?),
            other => other,
        };

        let filter = match &operation.filter {
            QueryFilter::Operators(collection) => {
                let mut collection = collection.clone();
                let core = ResolverCore::new(self.registry, schema, OperationType::SearchToWire, self.connection)?;
                OperatorValueResolver::new(core, self.alias.as_deref()).to_protocol(&mut collection)?;
                let rendered = collection.to_ldap_filter_with_base(&object_filter(schema), self.alias.as_deref());
                debug!("rendered filter {rendered}");
                QueryFilter::Raw(rendered)
            }
            QueryFilter::Raw(raw) => QueryFilter::Raw(raw.clone()),
        };

        operation.attributes = attributes;
        operation.base_dn = base_dn;
        if operation.use_paging.is_none() {
            operation.use_paging = schema.use_paging();
        }
        if operation.scope.is_none() {
            operation.scope = schema.scope();
        }
        for control in schema.controls() {
            if !operation.controls.contains(&control) {
                operation.controls.push(control);
            }
        }
        operation.filter = filter;
        Ok(())
    }

    /// Physical attributes to request. An empty result means every attribute.
    fn select_attributes(&self, schema: &dyn SchemaLookup, requested: &[String]) -> Vec<String> {
        let requested = if requested.is_empty() {
            schema.attributes_to_select()
        } else {
            requested.to_vec()
        };
        if requested.is_empty() {
            return Vec::new();
        }

        let mut selected = Vec::new();
        for name in requested {
            let name = match split_alias(&name) {
                Some((alias, attribute)) => match &self.alias {
                    Some(own) if own.eq_ignore_ascii_case(alias) => attribute.to_string(),
                    _ => {
                        debug!("skipping {name}: qualified for another alias");
                        continue;
                    }
                },
                None => name,
            };
            if name == SELECT_ALL {
                selected.extend(schema.attribute_names().iter().map(|logical| schema.physical_name(logical)));
            } else {
                if self.schema.is_some() && !schema.has_attribute(&name) && !name.eq_ignore_ascii_case(DN_ATTRIBUTE) {
                    debug!("selecting '{name}', which the '{}' schema does not map", schema.object_type());
                }
                selected.push(schema.physical_name(&name));
            }
        }
        selected.push(DN_ATTRIBUTE.to_string());
        selected.extend(schema.required_attributes());

        let mut seen = HashSet::new();
        selected.retain(|name| seen.insert(name.to_ascii_lowercase()));
        selected
    }
}

/// `alias.attribute` → (`alias`, `attribute`). Numeric OIDs are not qualified names.
fn split_alias(name: &str) -> Option<(&str, &str)> {
    let (alias, attribute) = name.split_once('.')?;
    if alias.is_empty() || attribute.is_empty() || alias.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((alias, attribute))
}

/// Object category and class assertions every filter for the schema starts with.
fn object_filter(schema: &dyn SchemaLookup) -> Vec<Operator> {
    let category = schema
        .object_category()
        .map(|category| Operator::equals("objectCategory", category));
    category
        .into_iter()
        .chain(
            schema
                .object_classes()
                .into_iter()
                .map(|class| Operator::equals("objectClass", class)),
        )
        .collect()
}
