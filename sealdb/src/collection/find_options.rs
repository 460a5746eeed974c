use crate::collection::Document;
use crate::common::{Value, OPT_LIMIT, OPT_SORT};
use crate::errors::{ErrorKind, SealError, SealResult};
use rand::seq::SliceRandom;
use std::borrow::Borrow;
use std::cmp::Ordering;

/// How a result set is ordered on one field.
///
/// The numeric codes are the ones accepted in the `$sort` document form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// `1`: natural value order
    Ascending,
    /// `-1`: reverse value order
    Descending,
    /// `0`: shuffled
    Random,
    /// `2`: by string rendering
    Alphabetical,
    /// `3`: by string rendering, reversed
    ReverseAlphabetical,
}

impl SortOrder {
    pub fn from_code(code: i64) -> SealResult<SortOrder> {
        match code {
            1 => Ok(SortOrder::Ascending),
            -1 => Ok(SortOrder::Descending),
            0 => Ok(SortOrder::Random),
            2 => Ok(SortOrder::Alphabetical),
            3 => Ok(SortOrder::ReverseAlphabetical),
            other => {
                log::error!("Invalid sort code {}", other);
                Err(SealError::new(
                    &format!("Invalid sort code {}, expected one of -1, 0, 1, 2, 3", other),
                    ErrorKind::FilterError,
                ))
            }
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
            SortOrder::Random => 0,
            SortOrder::Alphabetical => 2,
            SortOrder::ReverseAlphabetical => 3,
        }
    }
}

/// Result conditions applied after filtering: sort, then limit.
///
/// # Examples
///
/// ```rust,ignore
/// let options = order_by("age", SortOrder::Descending).limit(10);
/// let same = FindOptions::from_document(&doc! { "$sort": { age: (-1) }, "$limit": 10 })?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    sort_by: Vec<(String, SortOrder)>,
    limit: Option<usize>,
}

pub fn order_by(field: &str, order: SortOrder) -> FindOptions {
    FindOptions::new().then_order_by(field, order)
}

pub fn limit_to(limit: usize) -> FindOptions {
    FindOptions::new().limit(limit)
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    /// Adds a sort key. Later keys break ties left by earlier ones.
    pub fn then_order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort_by.push((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_by(&self) -> &[(String, SortOrder)] {
        &self.sort_by
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Parses the `{"$sort": {field: code, ..}, "$limit": n}` form.
    pub fn from_document(conditions: &Document) -> SealResult<FindOptions> {
        let mut options = FindOptions::new();
        for (key, value) in conditions.iter() {
            match key.as_str() {
                OPT_SORT => {
                    let sort = value.as_document().ok_or_else(|| {
                        log::error!("$sort expects a document, found {}", value);
                        SealError::new("$sort expects a document", ErrorKind::FilterError)
                    })?;
                    for (field, code) in sort.iter() {
                        let code = code.as_i64().ok_or_else(|| {
                            log::error!("Sort code for {} is not an integer", field);
                            SealError::new(
                                &format!("Sort code for {} is not an integer", field),
                                ErrorKind::FilterError,
                            )
                        })?;
                        options = options.then_order_by(field, SortOrder::from_code(code)?);
                    }
                }
                OPT_LIMIT => {
                    let limit = value
                        .as_i64()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| {
                            log::error!("$limit expects a non-negative integer, found {}", value);
                            SealError::new(
                                "$limit expects a non-negative integer",
                                ErrorKind::FilterError,
                            )
                        })?;
                    options = options.limit(limit);
                }
                other => {
                    log::error!("Unknown result condition {}", other);
                    return Err(SealError::new(
                        &format!("Unknown result condition {}", other),
                        ErrorKind::FilterError,
                    ));
                }
            }
        }
        Ok(options)
    }

    /// Sorts then truncates `documents` in place.
    ///
    /// A `Random` key shuffles the whole set and ignores other keys.
    /// Documents missing a sort field come after those that have it, in
    /// either direction.
    pub fn apply<D: Borrow<Document>>(&self, documents: &mut Vec<D>) {
        if self.sort_by.iter().any(|(_, order)| *order == SortOrder::Random) {
            documents.shuffle(&mut rand::thread_rng());
        } else if !self.sort_by.is_empty() {
            documents.sort_by(|a, b| self.compare(a.borrow(), b.borrow()));
        }

        if let Some(limit) = self.limit {
            documents.truncate(limit);
        }
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, order) in &self.sort_by {
            let ordering = compare_field(a.resolve(field), b.resolve(field), *order);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn compare_field(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match order {
            SortOrder::Ascending => a.cmp(b),
            SortOrder::Descending => b.cmp(a),
            SortOrder::Alphabetical => a.to_string().cmp(&b.to_string()),
            SortOrder::ReverseAlphabetical => b.to_string().cmp(&a.to_string()),
            SortOrder::Random => Ordering::Equal,
        },
    }
}
