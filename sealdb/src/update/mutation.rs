use crate::collection::Document;
use crate::common::{resolve_parent_mut, Value};

/// A field mutation bound to its target path and operand.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Set { path: String, value: Value },
    Unset { path: String },
    Inc { path: String, amount: Value },
}

impl Mutation {
    pub fn path(&self) -> &str {
        match self {
            Mutation::Set { path, .. } | Mutation::Unset { path } | Mutation::Inc { path, .. } => {
                path
            }
        }
    }

    /// Applies the mutation to one document.
    ///
    /// The parent of the target is resolved first; when it is missing or is
    /// not a document nothing happens. `Set` and `Inc` only create a
    /// missing leaf when `upsert` is true.
    pub fn apply(&self, document: &mut Document, upsert: bool) {
        let Some((parent, leaf)) = resolve_parent_mut(self.path(), document) else {
            log::debug!("Skipping {:?}, parent of {} is absent", self, self.path());
            return;
        };

        match self {
            Mutation::Set { value, .. } => {
                if upsert || parent.contains_key(leaf) {
                    parent.put(leaf, value.clone());
                }
            }
            Mutation::Unset { .. } => {
                parent.remove(leaf);
            }
            Mutation::Inc { path, amount } => {
                let updated = match parent.get(leaf) {
                    Some(existing) => match add(existing, amount) {
                        Some(sum) => sum,
                        None => {
                            log::warn!("Cannot increment non-numeric field {} ({})", path, existing);
                            return;
                        }
                    },
                    None if upsert => amount.clone(),
                    None => return,
                };
                parent.put(leaf, updated);
            }
        }
    }
}

/// Integer addition stays integral until it overflows; any other numeric
/// pairing yields a float.
fn add(existing: &Value, amount: &Value) -> Option<Value> {
    match (existing, amount) {
        (Value::I64(a), Value::I64(b)) => Some(
            a.checked_add(*b)
                .map(Value::I64)
                .unwrap_or(Value::F64(*a as f64 + *b as f64)),
        ),
        _ => Some(Value::F64(existing.as_f64()? + amount.as_f64()?)),
    }
}
