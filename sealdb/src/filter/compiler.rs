use crate::collection::{CollectionData, Document};
use crate::common::{
    PathCache, Value, DOC_ID, OP_EQ, OP_EXISTS, OP_GT, OP_GTE, OP_IN, OP_LT, OP_LTE, OP_NE,
    OP_NIN, OP_OPTIONS, OP_OR, OP_REGEX, OP_SIZE, OP_WITHIN,
};
use crate::errors::{ErrorKind, SealError, SealResult};
use crate::filter::{FieldPredicate, Matcher, Predicate};
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashSet};

/// Compiles filter expressions into [`CompiledQuery`] plans.
///
/// A filter is a document whose keys are field paths (or `$or`) and whose
/// values are either a literal, meaning equality, or a document of
/// operators:
///
/// ```rust,ignore
/// let query = QueryCompiler::compile(&doc! {
///     status: "active",
///     age: { "$gte": 18, "$lt": 65 },
///     name: { "$regex": "^a", "$options": "i" },
///     "$or": { vip: true },
/// })?;
/// ```
pub struct QueryCompiler;

impl QueryCompiler {
    pub fn compile(filter: &Document) -> SealResult<CompiledQuery> {
        let mut query = CompiledQuery::default();
        for (key, value) in filter.iter() {
            if key == OP_OR {
                let alternatives = value.as_document().ok_or_else(|| {
                    filter_error(&format!("{} expects a document, found {}", OP_OR, value))
                })?;
                for (field, operand) in alternatives.iter() {
                    if field == OP_OR {
                        return Err(filter_error("nested $or is not supported"));
                    }
                    compile_field(field, operand, &mut query.or)?;
                }
            } else {
                compile_field(key, value, &mut query.and)?;
            }
        }
        Ok(query)
    }
}

fn filter_error(message: &str) -> SealError {
    log::error!("{}", message);
    SealError::new(message, ErrorKind::FilterError)
}

fn compile_field(field: &str, value: &Value, target: &mut Vec<FieldPredicate>) -> SealResult<()> {
    if field.starts_with('$') && field != DOC_ID {
        return Err(filter_error(&format!("Unknown top-level operator {}", field)));
    }

    let operators = match value {
        Value::Document(doc) if is_pattern(doc) => {
            target.push(FieldPredicate::new(field, Predicate::Eq(Matcher::Pattern(compile_pattern(doc)?))));
            return Ok(());
        }
        Value::Document(doc) if doc.keys().any(|k| k.starts_with('$')) => doc,
        literal => {
            target.push(FieldPredicate::new(field, Predicate::Eq(Matcher::Literal(literal.clone()))));
            return Ok(());
        }
    };

    for (operator, operand) in operators.iter() {
        let predicate = match operator.as_str() {
            OP_EQ => Predicate::Eq(matcher(operand)?),
            OP_NE => Predicate::Ne(matcher(operand)?),
            OP_EXISTS => Predicate::Exists(operand.as_bool().ok_or_else(|| {
                filter_error(&format!("{} on {} expects a boolean", OP_EXISTS, field))
            })?),
            OP_SIZE => Predicate::Size(
                operand
                    .as_i64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        filter_error(&format!("{} on {} expects a non-negative integer", OP_SIZE, field))
                    })?,
            ),
            OP_WITHIN => within(field, operand)?,
            OP_GT => Predicate::Gt(operand.clone()),
            OP_GTE => Predicate::Gte(operand.clone()),
            OP_LT => Predicate::Lt(operand.clone()),
            OP_LTE => Predicate::Lte(operand.clone()),
            OP_IN => Predicate::In(candidates(OP_IN, field, operand)?),
            OP_NIN => Predicate::Nin(candidates(OP_NIN, field, operand)?),
            other => {
                return Err(filter_error(&format!("Unknown operator {} on {}", other, field)));
            }
        };
        target.push(FieldPredicate::new(field, predicate));
    }
    Ok(())
}

fn is_pattern(doc: &Document) -> bool {
    doc.contains_key(OP_REGEX) && doc.keys().all(|k| k == OP_REGEX || k == OP_OPTIONS)
}

fn compile_pattern(doc: &Document) -> SealResult<Regex> {
    let source = doc
        .get(OP_REGEX)
        .and_then(Value::as_str)
        .ok_or_else(|| filter_error(&format!("{} expects a string", OP_REGEX)))?;
    let options = match doc.get(OP_OPTIONS) {
        None => "",
        Some(value) => value
            .as_str()
            .ok_or_else(|| filter_error(&format!("{} expects a string", OP_OPTIONS)))?,
    };

    let mut builder = RegexBuilder::new(source);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => return Err(filter_error(&format!("Unsupported pattern option {}", other))),
        };
    }
    Ok(builder.build()?)
}

fn matcher(operand: &Value) -> SealResult<Matcher> {
    match operand {
        Value::Document(doc) if is_pattern(doc) => Ok(Matcher::Pattern(compile_pattern(doc)?)),
        other => Ok(Matcher::Literal(other.clone())),
    }
}

fn candidates(operator: &str, field: &str, operand: &Value) -> SealResult<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| filter_error(&format!("{} on {} expects an array", operator, field)))
}

fn within(field: &str, operand: &Value) -> SealResult<Predicate> {
    let parsed = operand.as_array().and_then(|parts| match parts.as_slice() {
        [center, radius] => {
            let center = center.as_array()?;
            match center.as_slice() {
                [lat, lng] => Some(Predicate::Within {
                    lat: lat.as_f64()?,
                    lng: lng.as_f64()?,
                    radius: radius.as_f64()?,
                }),
                _ => None,
            }
        }
        _ => None,
    });
    parsed.ok_or_else(|| {
        filter_error(&format!("{} on {} expects [[lat, lng], radius]", OP_WITHIN, field))
    })
}

/// An executable query: ordered AND and OR predicate lists.
///
/// A document matches when every AND predicate holds. When OR predicates
/// exist, a document also matches if any one of them holds; a query with
/// only OR predicates matches documents satisfying at least one of them.
#[derive(Clone, Debug, Default)]
pub struct CompiledQuery {
    and: Vec<FieldPredicate>,
    or: Vec<FieldPredicate>,
}

impl CompiledQuery {
    pub fn and_predicates(&self) -> &[FieldPredicate] {
        &self.and
    }

    pub fn or_predicates(&self) -> &[FieldPredicate] {
        &self.or
    }

    /// Distinct field paths of the AND predicates, sorted.
    pub fn and_fields(&self) -> BTreeSet<&str> {
        self.and.iter().map(FieldPredicate::field).collect()
    }

    pub fn matches(&self, document: &Document) -> bool {
        let mut cache = PathCache::new(document);
        self.matches_cached(&mut cache)
    }

    fn matches_cached(&self, cache: &mut PathCache<'_>) -> bool {
        if self.or.is_empty() {
            return self.and.iter().all(|p| p.test(cache));
        }
        if !self.and.is_empty() && self.and.iter().all(|p| p.test(cache)) {
            return true;
        }
        self.or.iter().any(|p| p.test(cache))
    }

    fn matches_any_or(&self, document: &Document) -> bool {
        let mut cache = PathCache::new(document);
        self.or.iter().any(|p| p.test(&mut cache))
    }

    /// Runs the query against a collection's table.
    ///
    /// When an index covers exactly the AND field set and every AND
    /// predicate can be evaluated on index keys, the index narrows the
    /// candidates. The OR branch is always answered by a full scan.
    pub fn execute<'a>(&self, data: &'a CollectionData) -> Vec<&'a Document> {
        if let Some(results) = self.execute_indexed(data) {
            return results;
        }

        log::debug!(
            "Scanning {} documents in {}",
            data.documents.len(),
            data.name
        );
        data.documents
            .values()
            .filter(|doc| {
                let mut cache = PathCache::new(doc);
                self.matches_cached(&mut cache)
            })
            .collect()
    }

    fn execute_indexed<'a>(&self, data: &'a CollectionData) -> Option<Vec<&'a Document>> {
        if self.and.is_empty() || !self.and.iter().all(|p| p.predicate().is_index_resolvable()) {
            return None;
        }
        let index = data.select_index(&self.and_fields())?;
        log::debug!("Using index {} on {}", index.name(), data.name);

        let conditions: Vec<Vec<&Predicate>> = index
            .definition()
            .fields()
            .iter()
            .map(|field| {
                self.and
                    .iter()
                    .filter(|p| p.field() == field.path())
                    .map(FieldPredicate::predicate)
                    .collect()
            })
            .collect();
        let lookup = index.find(&conditions);

        let mut results: Vec<&Document> = lookup
            .ids
            .iter()
            .filter_map(|id| data.documents.get(id))
            .collect();
        results.extend(
            lookup
                .overflow
                .iter()
                .filter_map(|id| data.documents.get(id))
                .filter(|doc| {
                    let mut cache = PathCache::new(doc);
                    self.and.iter().all(|p| p.test(&mut cache))
                }),
        );

        if !self.or.is_empty() {
            let seen: HashSet<&str> = results.iter().filter_map(|doc| doc.id()).collect();
            let extra: Vec<&Document> = data
                .documents
                .values()
                .filter(|doc| doc.id().is_some_and(|id| !seen.contains(id)))
                .filter(|doc| self.matches_any_or(doc))
                .collect();
            results.extend(extra);
        }
        Some(results)
    }
}
