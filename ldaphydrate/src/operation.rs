//! Logical directory operations, as built by callers and mutated in place by hydration.

use serde::{Deserialize, Serialize};

use crate::filter::OperatorCollection;
use crate::value::{AttributeMap, AttributeValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Add(AddOperation),
    BatchModify(BatchModifyOperation),
    Query(QueryOperation),
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Add(_) => "add",
            Operation::BatchModify(_) => "batch_modify",
            Operation::Query(_) => "query",
        }
    }

    pub fn dn(&self) -> Option<&str> {
        match self {
            Operation::Add(op) => op.dn.as_deref(),
            Operation::BatchModify(op) => Some(&op.dn),
            Operation::Query(op) => op.base_dn.as_deref(),
        }
    }
}

impl From<AddOperation> for Operation {
    fn from(op: AddOperation) -> Self {
        Operation::Add(op)
    }
}

impl From<BatchModifyOperation> for Operation {
    fn from(op: BatchModifyOperation) -> Self {
        Operation::BatchModify(op)
    }
}

impl From<QueryOperation> for Operation {
    fn from(op: QueryOperation) -> Self {
        Operation::Query(op)
    }
}

/// Create a new entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddOperation {
    /// Explicit DN. When unset the DN is built from the `name` attribute and the location.
    pub dn: Option<String>,
    /// Container the entry is placed in.
    pub location: Option<String>,
    pub attributes: AttributeMap,
}

impl AddOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dn(mut self, dn: impl Into<String>) -> Self {
        self.dn = Some(dn.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchAction {
    Add,
    Remove,
    Replace,
    RemoveAll,
}

/// One named mutation against one attribute of an existing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub action: BatchAction,
    pub attribute: String,
    #[serde(default = "empty_values")]
    pub values: AttributeValue,
}

fn empty_values() -> AttributeValue {
    AttributeValue::Multi(Vec::new())
}

impl Batch {
    pub fn new(action: BatchAction, attribute: impl Into<String>, values: impl Into<AttributeValue>) -> Self {
        Self {
            action,
            attribute: attribute.into(),
            values: values.into(),
        }
    }

    pub fn remove_all(attribute: impl Into<String>) -> Self {
        Self::new(BatchAction::RemoveAll, attribute, empty_values())
    }
}

/// Modify an existing entry with an ordered list of batches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchModifyOperation {
    pub dn: String,
    #[serde(default)]
    pub batches: Vec<Batch>,
    /// Values the entry holds before the batches apply, keyed by physical attribute. Aggregated
    /// attributes such as flag masks are folded on top of them instead of a default.
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub current: AttributeMap,
}

impl BatchModifyOperation {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            batches: Vec::new(),
            current: AttributeMap::new(),
        }
    }

    pub fn with_current_value(mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.current.insert(attribute.into(), value.into());
        self
    }

    pub fn add(self, attribute: impl Into<String>, values: impl Into<AttributeValue>) -> Self {
        self.with_batch(Batch::new(BatchAction::Add, attribute, values))
    }

    pub fn replace(self, attribute: impl Into<String>, values: impl Into<AttributeValue>) -> Self {
        self.with_batch(Batch::new(BatchAction::Replace, attribute, values))
    }

    pub fn remove(self, attribute: impl Into<String>, values: impl Into<AttributeValue>) -> Self {
        self.with_batch(Batch::new(BatchAction::Remove, attribute, values))
    }

    pub fn remove_all(self, attribute: impl Into<String>) -> Self {
        self.with_batch(Batch::remove_all(attribute))
    }

    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batches.push(batch);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Base,
    OneLevel,
    Subtree,
}

/// A protocol control attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub oid: String,
    #[serde(default)]
    pub criticality: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Control {
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            criticality: false,
            value: None,
        }
    }

    pub fn critical(mut self) -> Self {
        self.criticality = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryFilter {
    Raw(String),
    Operators(OperatorCollection),
}

impl Default for QueryFilter {
    fn default() -> Self {
        QueryFilter::Raw("(objectClass=*)".to_string())
    }
}

/// Search request. `None` fields have not been set by the caller and may be defaulted from the
/// schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOperation {
    pub filter: QueryFilter,
    pub attributes: Vec<String>,
    pub base_dn: Option<String>,
    pub scope: Option<Scope>,
    pub use_paging: Option<bool>,
    pub controls: Vec<Control>,
}

impl QueryOperation {
    pub fn new(filter: QueryFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn raw(filter: impl Into<String>) -> Self {
        Self::new(QueryFilter::Raw(filter.into()))
    }

    pub fn with_attributes<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = Some(base_dn.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_paging(mut self, use_paging: bool) -> Self {
        self.use_paging = Some(use_paging);
        self
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    /// Rendered filter text, available once the filter is raw or has been hydrated.
    pub fn filter_text(&self) -> Option<&str> {
        match &self.filter {
            QueryFilter::Raw(raw) => Some(raw),
            QueryFilter::Operators(_) => None,
        }
    }
}
