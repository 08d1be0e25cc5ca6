//! Operator trees awaiting conversion into a textual LDAP search filter.
//!
//! Leaf comparisons name logical attributes and carry logical values; hydration converts the
//! values and rewrites the attribute names in place, then renders the tree with
//! [`OperatorCollection::to_ldap_filter`].
//!
//! ```
//! use ldaphydrate::filter::{Operator, OperatorCollection};
//!
//! let filter = OperatorCollection::new([
//!     Operator::equals("givenName", "John"),
//!     Operator::or([Operator::starts_with("sn", "Sm"), Operator::present("mail")]),
//! ]);
//! assert_eq!(filter.to_ldap_filter(None), "(&(givenName=John)(|(sn=Sm*)(mail=*)))");
//! ```

use serde::{Deserialize, Serialize};

use crate::escape::escape_filter;
use crate::value::Value;

/// Filter returned when a collection renders no clauses at all.
pub const MATCH_ALL_FILTER: &str = "(objectClass=*)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Equals,
    ApproxEquals,
    GreaterOrEqual,
    LessOrEqual,
    Present,
    StartsWith,
    EndsWith,
    Contains,
    /// Extensible match through the comparison's matching rule.
    Extensible,
}

/// Replacement for a plain equality leaf, produced by converters whose values are tested with a
/// matching rule rather than compared whole.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingRuleAssertion {
    pub rule: String,
    pub value: Value,
    /// Whether the assertion must not match for the original comparison to hold.
    pub negated: bool,
}

/// A single attribute assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub attribute: String,
    pub kind: ComparisonKind,
    #[serde(default)]
    pub value: Value,
    /// Alias of the object this comparison targets in a joined query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Matching rule OID of an extensible match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Comparison {
    pub fn new(attribute: impl Into<String>, kind: ComparisonKind, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            kind,
            value: value.into(),
            alias: None,
            rule: None,
        }
    }

    pub fn matching_rule(attribute: impl Into<String>, rule: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            rule: Some(rule.into()),
            ..Self::new(attribute, ComparisonKind::Extensible, value)
        }
    }

    /// Whether this comparison belongs to the object addressed by `alias`.
    pub fn in_scope(&self, alias: Option<&str>) -> bool {
        match (&self.alias, alias) {
            (None, _) => true,
            (Some(own), Some(requested)) => own.eq_ignore_ascii_case(requested),
            (Some(_), None) => false,
        }
    }

    /// Present assertions carry no value to convert.
    pub fn has_value(&self) -> bool {
        self.kind != ComparisonKind::Present
    }

    pub fn to_ldap_filter(&self) -> String {
        let attribute = &self.attribute;
        let value = escape_filter(&self.value);
        match self.kind {
            ComparisonKind::Equals => format!("({attribute}={value})"),
            ComparisonKind::ApproxEquals => format!("({attribute}~={value})"),
            ComparisonKind::GreaterOrEqual => format!("({attribute}>={value})"),
            ComparisonKind::LessOrEqual => format!("({attribute}<={value})"),
            ComparisonKind::Present => format!("({attribute}=*)"),
            ComparisonKind::StartsWith => format!("({attribute}={value}*)"),
            ComparisonKind::EndsWith => format!("({attribute}=*{value})"),
            ComparisonKind::Contains => format!("({attribute}=*{value}*)"),
            ComparisonKind::Extensible => match &self.rule {
                Some(rule) => format!("({attribute}:{rule}:={value})"),
                None => format!("({attribute}:={value})"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    And(Vec<Operator>),
    Or(Vec<Operator>),
    Not(Box<Operator>),
    Comparison(Comparison),
}

impl Operator {
    // ========== Composite Constructors ==========

    pub fn and(operators: impl IntoIterator<Item = Operator>) -> Self {
        Self::And(operators.into_iter().collect())
    }

    pub fn or(operators: impl IntoIterator<Item = Operator>) -> Self {
        Self::Or(operators.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operator: Operator) -> Self {
        Self::Not(Box::new(operator))
    }

    // ========== Leaf Constructors ==========

    pub fn equals(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison::new(attribute, ComparisonKind::Equals, value))
    }

    pub fn approx(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison::new(attribute, ComparisonKind::ApproxEquals, value))
    }

    pub fn gte(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison::new(attribute, ComparisonKind::GreaterOrEqual, value))
    }

    pub fn lte(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison::new(attribute, ComparisonKind::LessOrEqual, value))
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Comparison(Comparison::new(attribute, ComparisonKind::Present, Value::Null))
    }

    pub fn starts_with(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison::new(attribute, ComparisonKind::StartsWith, value))
    }

    pub fn ends_with(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison::new(attribute, ComparisonKind::EndsWith, value))
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison::new(attribute, ComparisonKind::Contains, value))
    }

    pub fn matching_rule(attribute: impl Into<String>, rule: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison::matching_rule(attribute, rule, value))
    }

    /// Qualify a comparison with an alias. Composite operators are returned unchanged.
    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        if let Self::Comparison(comparison) = &mut self {
            comparison.alias = Some(alias.into());
        }
        self
    }

    /// Render this node. Empty composites render as an empty string and drop out of their parent.
    pub fn to_ldap_filter(&self, alias: Option<&str>) -> String {
        match self {
            Self::Comparison(comparison) => {
                if comparison.in_scope(alias) {
                    comparison.to_ldap_filter()
                } else {
                    String::new()
                }
            }
            Self::And(operators) => render_composite('&', operators, alias),
            Self::Or(operators) => render_composite('|', operators, alias),
            Self::Not(operator) => {
                let inner = operator.to_ldap_filter(alias);
                if inner.is_empty() {
                    inner
                } else {
                    format!("(!{inner})")
                }
            }
        }
    }
}

fn render_composite(symbol: char, operators: &[Operator], alias: Option<&str>) -> String {
    let clauses: Vec<String> = operators
        .iter()
        .map(|op| op.to_ldap_filter(alias))
        .filter(|clause| !clause.is_empty())
        .collect();
    match clauses.len() {
        0 => String::new(),
        1 => clauses.into_iter().next().unwrap_or_default(),
        _ => format!("({symbol}{})", clauses.concat()),
    }
}

/// Top-level operators of a query filter, implicitly ANDed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorCollection {
    pub operators: Vec<Operator>,
}

impl OperatorCollection {
    pub fn new(operators: impl IntoIterator<Item = Operator>) -> Self {
        Self {
            operators: operators.into_iter().collect(),
        }
    }

    pub fn push(&mut self, operator: Operator) {
        self.operators.push(operator);
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn to_ldap_filter(&self, alias: Option<&str>) -> String {
        self.to_ldap_filter_with_base(&[], alias)
    }

    /// Render with `base` operators (typically object class/category assertions) ANDed in front.
    pub fn to_ldap_filter_with_base(&self, base: &[Operator], alias: Option<&str>) -> String {
        let operators: Vec<Operator> = base.iter().chain(self.operators.iter()).cloned().collect();
        let rendered = render_composite('&', &operators, alias);
        if rendered.is_empty() {
            MATCH_ALL_FILTER.to_string()
        } else {
            rendered
        }
    }

    /// Visit every comparison in the tree.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        fn walk<'a>(op: &'a Operator, out: &mut Vec<&'a Comparison>) {
            match op {
                Operator::Comparison(c) => out.push(c),
                Operator::And(ops) | Operator::Or(ops) => ops.iter().for_each(|o| walk(o, out)),
                Operator::Not(inner) => walk(inner, out),
            }
        }
        let mut out = Vec::new();
        self.operators.iter().for_each(|op| walk(op, &mut out));
        out
    }
}
