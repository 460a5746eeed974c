use crate::collection::Document;
use crate::common::INDEX_NAME_SEPARATOR;
use crate::errors::{ErrorKind, SealError, SealResult};
use itertools::Itertools;

/// Branch iteration order for one index level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexField {
    path: String,
    direction: IndexDirection,
}

impl IndexField {
    pub fn new(path: &str, direction: IndexDirection) -> Self {
        IndexField {
            path: path.to_string(),
            direction,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn direction(&self) -> IndexDirection {
        self.direction
    }
}

/// The fields an index is keyed on, normalized by field name.
///
/// The sorted order fixes the nesting of the tree: the first field is the
/// root level. Two definitions over the same field names describe the same
/// index whatever their directions, and share the canonical name formed by
/// joining the sorted names with `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexDefinition {
    fields: Vec<IndexField>,
}

impl IndexDefinition {
    pub fn new(fields: Vec<IndexField>) -> SealResult<Self> {
        if fields.is_empty() {
            log::error!("Index definition has no field");
            return Err(SealError::new(
                "Index definition must name at least one field",
                ErrorKind::IndexingError,
            ));
        }

        let fields: Vec<IndexField> = fields
            .into_iter()
            .sorted_by(|a, b| a.path.cmp(&b.path))
            .dedup_by(|a, b| a.path == b.path)
            .collect();
        Ok(IndexDefinition { fields })
    }

    /// Parses the `{field: 1 | -1, ..}` form. A negative value means
    /// descending; any other number ascending.
    pub fn from_document(spec: &Document) -> SealResult<Self> {
        let mut fields = Vec::with_capacity(spec.len());
        for (path, direction) in spec.iter() {
            let direction = match direction.as_f64() {
                Some(d) if d < 0.0 => IndexDirection::Descending,
                Some(_) => IndexDirection::Ascending,
                None => {
                    log::error!("Index direction for {} is not a number: {}", path, direction);
                    return Err(SealError::new(
                        &format!("Index direction for {} must be a number", path),
                        ErrorKind::IndexingError,
                    ));
                }
            };
            fields.push(IndexField::new(path, direction));
        }
        IndexDefinition::new(fields)
    }

    pub fn fields(&self) -> &[IndexField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(IndexField::path).collect()
    }

    pub fn name(&self) -> String {
        self.fields.iter().map(IndexField::path).join(INDEX_NAME_SEPARATOR)
    }
}
