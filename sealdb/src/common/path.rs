use crate::collection::Document;
use crate::common::{Value, FIELD_SEPARATOR};
use smallvec::SmallVec;
use std::collections::HashMap;

type Segments<'p> = SmallVec<[&'p str; 8]>;

fn segments(path: &str) -> Segments<'_> {
    path.split(FIELD_SEPARATOR).collect()
}

fn step<'d>(value: &'d Value, segment: &str) -> Option<&'d Value> {
    match value {
        Value::Document(doc) => doc.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'d>(value: &'d mut Value, segment: &str) -> Option<&'d mut Value> {
    match value {
        Value::Document(doc) => doc.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Resolves a dotted field path against a document.
///
/// Each `.`-separated segment descends one level: a key into a nested
/// document, or a numeric position into an array. A missing key, an
/// out-of-range position or a scalar in the middle of the path yields
/// `None`.
///
/// ```rust,ignore
/// let doc = doc! { a: { b: [10, 20] } };
/// assert_eq!(resolve("a.b.1", &doc), Some(&Value::I64(20)));
/// assert_eq!(resolve("a.c", &doc), None);
/// ```
pub fn resolve<'d>(path: &str, document: &'d Document) -> Option<&'d Value> {
    let segments = segments(path);
    let (first, rest) = segments.split_first()?;
    let mut current = document.get(first)?;
    for segment in rest {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Resolves the document that owns the last segment of `path`, returning
/// it together with that last segment.
///
/// A path without separators resolves to `document` itself. `None` is
/// returned when any intermediate is missing or the parent is not a
/// document.
pub fn resolve_parent_mut<'d, 'p>(
    path: &'p str,
    document: &'d mut Document,
) -> Option<(&'d mut Document, &'p str)> {
    let (parent, leaf) = match path.rsplit_once(FIELD_SEPARATOR) {
        Some((parent, leaf)) => (parent, leaf),
        None => return Some((document, path)),
    };

    let segments = segments(parent);
    let (first, rest) = segments.split_first()?;
    let mut current = document.get_mut(first)?;
    for segment in rest {
        current = step_mut(current, segment)?;
    }
    current.as_document_mut().map(|doc| (doc, leaf))
}

/// Memoizes path resolutions for a single document.
///
/// A cache is bound to one document for the duration of one evaluation
/// pass (a scan step or an index insert) and must not outlive it, so a
/// stale resolution can never leak across documents.
pub struct PathCache<'d> {
    document: &'d Document,
    resolved: HashMap<String, Option<&'d Value>>,
}

impl<'d> PathCache<'d> {
    pub fn new(document: &'d Document) -> Self {
        PathCache {
            document,
            resolved: HashMap::new(),
        }
    }

    pub fn document(&self) -> &'d Document {
        self.document
    }

    pub fn get(&mut self, path: &str) -> Option<&'d Value> {
        if let Some(value) = self.resolved.get(path) {
            return *value;
        }
        let value = resolve(path, self.document);
        self.resolved.insert(path.to_string(), value);
        value
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
