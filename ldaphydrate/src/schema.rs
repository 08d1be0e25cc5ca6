//! Schema lookup: the read-only description of how one object type maps onto the directory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::converter::ConverterOptions;
use crate::operation::{Control, Scope};

/// Scope key for converter options that apply to every attribute using the converter.
pub const DEFAULT_OPTIONS_SCOPE: &str = "_default";

/// Read-only lookup service describing one object type.
///
/// Implementations must not change while a hydration call is running; they are shared between
/// concurrent calls by reference.
pub trait SchemaLookup: Send + Sync {
    /// Name of the object type (e.g. `user`).
    fn object_type(&self) -> &str;

    /// Physical attribute for a logical one. Unmapped names are returned unchanged.
    fn physical_name(&self, logical: &str) -> String;

    /// Every logical attribute mapped onto `physical`, in schema order.
    fn logical_names(&self, physical: &str) -> Vec<String>;

    fn logical_name(&self, physical: &str) -> String {
        self.logical_names(physical)
            .into_iter()
            .next()
            .unwrap_or_else(|| physical.to_string())
    }

    fn has_attribute(&self, logical: &str) -> bool;

    /// Every logical attribute the schema knows.
    fn attribute_names(&self) -> Vec<String>;

    fn converter_name(&self, logical: &str) -> Option<String>;

    /// Logical attributes assigned to `converter`.
    fn attributes_for_converter(&self, converter: &str) -> Vec<String>;

    /// Options for `converter` under `scope` (`_default` or a logical attribute name).
    fn converter_options(&self, converter: &str, scope: &str) -> ConverterOptions;

    fn default_container(&self) -> Option<String>;

    fn base_dn(&self) -> Option<String>;

    fn use_paging(&self) -> Option<bool>;

    fn scope(&self) -> Option<Scope>;

    fn controls(&self) -> Vec<Control>;

    fn object_classes(&self) -> Vec<String> {
        Vec::new()
    }

    fn object_category(&self) -> Option<String> {
        None
    }

    /// Logical attributes returned when a query selects nothing explicitly.
    fn attributes_to_select(&self) -> Vec<String> {
        Vec::new()
    }

    /// Physical attributes every query must return in addition to `dn`.
    fn required_attributes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Schema for one object type, usually loaded from a configuration file.
///
/// ```toml
/// [objects.user]
/// default_container = "ou=users,%_defaultnamingcontext_%"
/// object_class = ["user"]
/// object_category = "person"
///
/// [objects.user.attributes]
/// name = "cn"
/// firstName = "givenName"
/// disabled = "userAccountControl"
///
/// [objects.user.converters]
/// flags = ["disabled", "passwordNeverExpires"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSchema {
    pub object_type: String,
    /// Logical attribute → physical attribute.
    pub attributes: BTreeMap<String, String>,
    /// Converter identifier → logical attributes using it.
    pub converters: BTreeMap<String, Vec<String>>,
    /// Converter identifier → scope (`_default` or logical attribute) → options.
    pub converter_options: BTreeMap<String, BTreeMap<String, ConverterOptions>>,
    pub default_container: Option<String>,
    pub base_dn: Option<String>,
    pub use_paging: Option<bool>,
    pub scope: Option<Scope>,
    pub controls: Vec<Control>,
    pub object_class: Vec<String>,
    pub object_category: Option<String>,
    pub attributes_to_select: Vec<String>,
    pub required_attributes: Vec<String>,
}

impl ObjectSchema {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, logical: impl Into<String>, physical: impl Into<String>) -> Self {
        self.attributes.insert(logical.into(), physical.into());
        self
    }

    pub fn with_converter<S: Into<String>>(
        mut self,
        converter: impl Into<String>,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.converters
            .entry(converter.into())
            .or_default()
            .extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn with_converter_options(
        mut self,
        converter: impl Into<String>,
        scope: impl Into<String>,
        options: ConverterOptions,
    ) -> Self {
        self.converter_options
            .entry(converter.into())
            .or_default()
            .insert(scope.into(), options);
        self
    }

    pub fn with_default_container(mut self, container: impl Into<String>) -> Self {
        self.default_container = Some(container.into());
        self
    }

    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = Some(base_dn.into());
        self
    }

    pub fn with_paging(mut self, use_paging: bool) -> Self {
        self.use_paging = Some(use_paging);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    pub fn with_object_class(mut self, object_class: impl Into<String>) -> Self {
        self.object_class.push(object_class.into());
        self
    }

    pub fn with_object_category(mut self, category: impl Into<String>) -> Self {
        self.object_category = Some(category.into());
        self
    }

    pub fn with_attributes_to_select<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.attributes_to_select = attributes.into_iter().map(Into::into).collect();
        self
    }

    fn mapped(&self, logical: &str) -> Option<(&String, &String)> {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(logical))
    }
}

impl SchemaLookup for ObjectSchema {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn physical_name(&self, logical: &str) -> String {
        self.mapped(logical)
            .map(|(_, physical)| physical.clone())
            .unwrap_or_else(|| logical.to_string())
    }

    fn logical_names(&self, physical: &str) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|(_, mapped)| mapped.eq_ignore_ascii_case(physical))
            .map(|(logical, _)| logical.clone())
            .collect()
    }

    fn has_attribute(&self, logical: &str) -> bool {
        self.mapped(logical).is_some()
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    fn converter_name(&self, logical: &str) -> Option<String> {
        self.converters
            .iter()
            .find(|(_, attributes)| attributes.iter().any(|a| a.eq_ignore_ascii_case(logical)))
            .map(|(converter, _)| converter.clone())
    }

    fn attributes_for_converter(&self, converter: &str) -> Vec<String> {
        self.converters.get(converter).cloned().unwrap_or_default()
    }

    fn converter_options(&self, converter: &str, scope: &str) -> ConverterOptions {
        self.converter_options
            .get(converter)
            .and_then(|scopes| {
                scopes
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(scope))
                    .map(|(_, options)| options.clone())
            })
            .unwrap_or_default()
    }

    fn default_container(&self) -> Option<String> {
        self.default_container.clone()
    }

    fn base_dn(&self) -> Option<String> {
        self.base_dn.clone()
    }

    fn use_paging(&self) -> Option<bool> {
        self.use_paging
    }

    fn scope(&self) -> Option<Scope> {
        self.scope
    }

    fn controls(&self) -> Vec<Control> {
        self.controls.clone()
    }

    fn object_classes(&self) -> Vec<String> {
        self.object_class.clone()
    }

    fn object_category(&self) -> Option<String> {
        self.object_category.clone()
    }

    fn attributes_to_select(&self) -> Vec<String> {
        self.attributes_to_select.clone()
    }

    fn required_attributes(&self) -> Vec<String> {
        self.required_attributes.clone()
    }
}
