use crate::common::{PathCache, Value};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};

/// Right-hand side of an equality test: a literal value or a pattern
/// matched against the string rendering of the field value.
#[derive(Clone)]
pub enum Matcher {
    Literal(Value),
    Pattern(Regex),
}

impl Matcher {
    /// Literals compare with [`Value::loose_eq`]. An array field matches a
    /// literal when any element equals it.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::Pattern(pattern) => pattern.is_match(&value.to_string()),
            Matcher::Literal(expected) => match value {
                Value::Array(items) => {
                    items.iter().any(|item| item.loose_eq(expected)) || value.loose_eq(expected)
                }
                _ => value.loose_eq(expected),
            },
        }
    }
}

impl Debug for Matcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::Literal(value) => write!(f, "{:?}", value),
            Matcher::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

/// A query operator bound to its operand.
#[derive(Clone, Debug)]
pub enum Predicate {
    Eq(Matcher),
    Ne(Matcher),
    Exists(bool),
    Size(usize),
    Within { lat: f64, lng: f64, radius: f64 },
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
}

impl Predicate {
    /// Evaluates the operator against a field value, `None` meaning the
    /// field is absent.
    pub fn test(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::Eq(matcher) => value.is_some_and(|v| matcher.matches(v)),
            Predicate::Ne(matcher) => value.is_some_and(|v| !matcher.matches(v)),
            Predicate::Exists(expected) => value.is_some() == *expected,
            Predicate::Size(expected) => value.and_then(Value::size) == Some(*expected),
            Predicate::Within { lat, lng, radius } => value
                .and_then(Value::as_document)
                .and_then(|point| {
                    let plat = point.get("lat")?.as_f64()?;
                    let plng = point.get("lng")?.as_f64()?;
                    Some(((plat - lat).powi(2) + (plng - lng).powi(2)).sqrt() <= *radius)
                })
                .unwrap_or(false),
            Predicate::Gt(operand) => compare(value, operand) == Some(Ordering::Greater),
            Predicate::Gte(operand) => {
                matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal))
            }
            Predicate::Lt(operand) => compare(value, operand) == Some(Ordering::Less),
            Predicate::Lte(operand) => {
                matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal))
            }
            Predicate::In(candidates) => contains(candidates, value),
            Predicate::Nin(candidates) => !contains(candidates, value),
        }
    }

    /// True when an index level can evaluate this operator on its keys with
    /// the same outcome as a scan.
    pub fn is_index_resolvable(&self) -> bool {
        match self {
            Predicate::Eq(Matcher::Literal(v)) | Predicate::Ne(Matcher::Literal(v)) => v.is_scalar(),
            Predicate::Eq(Matcher::Pattern(_)) | Predicate::Ne(Matcher::Pattern(_)) => true,
            Predicate::Gt(v) | Predicate::Gte(v) | Predicate::Lt(v) | Predicate::Lte(v) => {
                v.is_scalar()
            }
            _ => false,
        }
    }

    /// The literal for a direct child lookup, when the operator is a plain
    /// scalar equality no key of another kind can loosely equal.
    pub fn exact_key(&self) -> Option<&Value> {
        match self {
            Predicate::Eq(Matcher::Literal(v)) if v.is_scalar() && v.loose_number().is_none() => {
                Some(v)
            }
            _ => None,
        }
    }
}

fn contains(candidates: &[Value], value: Option<&Value>) -> bool {
    value.is_some_and(|v| candidates.iter().any(|candidate| candidate.loose_eq(v)))
}

fn compare(value: Option<&Value>, operand: &Value) -> Option<Ordering> {
    value?.compare_scalar(operand)
}

/// A predicate bound to the field path it reads.
#[derive(Clone, Debug)]
pub struct FieldPredicate {
    field: String,
    predicate: Predicate,
}

impl FieldPredicate {
    pub fn new(field: &str, predicate: Predicate) -> Self {
        FieldPredicate {
            field: field.to_string(),
            predicate,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn test(&self, cache: &mut PathCache<'_>) -> bool {
        self.predicate.test(cache.get(&self.field))
    }
}
